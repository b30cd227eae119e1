use thiserror::Error;

/// Errors surfaced by session coordination operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session full: {0}")]
    SessionFull(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not ready: {0}")]
    NotReady(String),

    #[error("message does not match session message")]
    MessageMismatch,

    #[error("invalid signature length: {0}")]
    InvalidSignatureLength(usize),

    #[error("session incomplete")]
    Incomplete,
}

pub type Result<T> = std::result::Result<T, SessionError>;
