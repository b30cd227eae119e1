use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_coordinator::SessionError;
use serde_json::json;
use thiserror::Error;

/// HTTP-facing error type for the relay API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SessionError::SessionFull(_) | SessionError::AlreadyExists(_) => {
                ApiError::Conflict(err.to_string())
            }
            SessionError::InvalidParameters(_)
            | SessionError::NotReady(_)
            | SessionError::MessageMismatch
            | SessionError::InvalidSignatureLength(_)
            | SessionError::Incomplete => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_session_errors_to_status() {
        let cases = [
            (SessionError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (SessionError::SessionFull("x".into()), StatusCode::CONFLICT),
            (SessionError::AlreadyExists("x".into()), StatusCode::CONFLICT),
            (SessionError::NotReady("x".into()), StatusCode::BAD_REQUEST),
            (SessionError::MessageMismatch, StatusCode::BAD_REQUEST),
            (SessionError::InvalidSignatureLength(65), StatusCode::BAD_REQUEST),
            (SessionError::Incomplete, StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
