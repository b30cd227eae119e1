use thiserror::Error;

/// Errors surfaced by the relay client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {reason}")]
    Api { status: u16, reason: String },

    #[error("invalid payload encoding: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("signing failed: {0}")]
    Signer(String),
}

impl ClientError {
    /// Whether the server rejected a fetch because the round is still
    /// filling. Pollers retry on this instead of failing. Only a 400 with
    /// the NotReady reason qualifies; other rejections are terminal.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            ClientError::Api { status: 400, reason } if reason.starts_with("not ready")
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_detection() {
        let err = ClientError::Api {
            status: 400,
            reason: "not ready: round 1 has 1 of 3 messages".to_string(),
        };
        assert!(err.is_not_ready());

        let err = ClientError::Api {
            status: 400,
            reason: "message does not match session message".to_string(),
        };
        assert!(!err.is_not_ready());

        // The reason prefix alone is not enough; the status must match too.
        let err = ClientError::Api {
            status: 404,
            reason: "not ready: round 1 has 1 of 3 messages".to_string(),
        };
        assert!(!err.is_not_ready());
    }
}
