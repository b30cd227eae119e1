//! Background eviction of idle sessions.
//!
//! Sessions that see no traffic for the configured TTL are removed so
//! abandoned protocol runs do not accumulate in memory.

use crate::error::{Result, SessionError};
use crate::service::Coordinator;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

/// Periodic idle-session sweeper.
pub struct TtlSweeper {
    coordinator: Arc<Coordinator>,
    shutdown: Arc<RwLock<bool>>,
}

impl TtlSweeper {
    /// Start the sweeper in the background
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Session sweeper started");
            self.run().await;
            info!("Session sweeper stopped");
        })
    }

    /// Main sweep loop
    async fn run(&self) {
        let mut interval = interval(self.coordinator.config().sweep_interval);

        loop {
            // Check shutdown signal
            if *self.shutdown.read().await {
                info!("Shutdown signal received, stopping session sweeper");
                return;
            }

            interval.tick().await;

            let removed = self.coordinator.evict_idle().await;
            if removed > 0 {
                info!(removed, "evicted idle sessions");
            } else {
                debug!("sweep pass found no idle sessions");
            }
        }
    }

    /// Initiate graceful shutdown
    pub async fn shutdown(&self) {
        info!("Initiating session sweeper shutdown");
        *self.shutdown.write().await = true;
    }
}

/// Builder for TtlSweeper
pub struct TtlSweeperBuilder {
    coordinator: Option<Arc<Coordinator>>,
}

impl TtlSweeperBuilder {
    pub fn new() -> Self {
        Self { coordinator: None }
    }

    pub fn with_coordinator(mut self, coordinator: Arc<Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn build(self) -> Result<Arc<TtlSweeper>> {
        let coordinator = self.coordinator.ok_or_else(|| {
            SessionError::InvalidParameters("coordinator is required".to_string())
        })?;

        Ok(Arc::new(TtlSweeper {
            coordinator,
            shutdown: Arc::new(RwLock::new(false)),
        }))
    }
}

impl Default for TtlSweeperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use std::time::Duration;

    #[test]
    fn builder_requires_coordinator() {
        assert!(TtlSweeperBuilder::new().build().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_idle_sessions_until_shutdown() {
        let coordinator = Arc::new(Coordinator::new(
            CoordinatorConfig::builder()
                .session_ttl(Duration::from_secs(60))
                .sweep_interval(Duration::from_secs(10))
                .build(),
        ));
        let id = coordinator.create_keygen_session(2, 2).await.unwrap();

        let sweeper = TtlSweeperBuilder::new()
            .with_coordinator(coordinator.clone())
            .build()
            .unwrap();
        let handle = sweeper.clone().start();

        tokio::time::advance(Duration::from_secs(75)).await;
        tokio::task::yield_now().await;
        assert!(coordinator
            .session_status(crate::service::SessionKind::Keygen, &id)
            .await
            .is_err());

        sweeper.shutdown().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        handle.await.unwrap();
    }
}
