use std::time::Duration;

/// Runtime configuration for the session coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Idle time after which a session is evicted.
    pub session_ttl: Duration,
    /// How often the sweeper scans for idle sessions.
    pub sweep_interval: Duration,
    /// How long a finalized battle session stays readable before removal.
    pub battle_grace_period: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            battle_grace_period: Duration::from_secs(5 * 60),
        }
    }
}

impl CoordinatorConfig {
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct CoordinatorConfigBuilder {
    session_ttl: Option<Duration>,
    sweep_interval: Option<Duration>,
    battle_grace_period: Option<Duration>,
}

impl CoordinatorConfigBuilder {
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    pub fn battle_grace_period(mut self, grace: Duration) -> Self {
        self.battle_grace_period = Some(grace);
        self
    }

    pub fn build(self) -> CoordinatorConfig {
        let defaults = CoordinatorConfig::default();
        CoordinatorConfig {
            session_ttl: self.session_ttl.unwrap_or(defaults.session_ttl),
            sweep_interval: self.sweep_interval.unwrap_or(defaults.sweep_interval),
            battle_grace_period: self
                .battle_grace_period
                .unwrap_or(defaults.battle_grace_period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = CoordinatorConfig::builder()
            .session_ttl(Duration::from_secs(10))
            .build();
        assert_eq!(config.session_ttl, Duration::from_secs(10));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.battle_grace_period, Duration::from_secs(300));
    }
}
