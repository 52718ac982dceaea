use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Request-terminal failures of the webhook pipeline.
///
/// Collaborator failures (chat, audit store, GitHub API) never surface here;
/// they are logged and swallowed where they happen.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature")]
    SignatureInvalid,

    #[error("payload unparseable: {0}")]
    PayloadUnparseable(#[from] serde_json::Error),
}

impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        let status = match &self {
            HookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            HookError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            HookError::PayloadUnparseable(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}
