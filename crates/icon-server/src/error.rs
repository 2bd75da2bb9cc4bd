use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use icon_core::CoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("metadata store error: {0}")]
    Meta(#[from] icon_meta::MetaError),

    #[error("blob store error: {0}")]
    Vcs(#[from] icon_vcs::VcsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) => match err {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::AlreadyExists(_) => StatusCode::CONFLICT,
                CoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
                CoreError::InvalidFormatOrSize { .. } | CoreError::InvalidName(_) => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::StorageInconsistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CoreError::AdapterUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_)
            | Self::Meta(_)
            | Self::Vcs(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Core(err) => err.kind(),
            Self::AuthFailed(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Config(_) | Self::Meta(_) | Self::Vcs(_) | Self::Io(_) | Self::Internal(_) => {
                "internal"
            }
        }
    }

    /// Text safe to show a client. Server-side failures are described only
    /// in the log.
    fn public_message(&self) -> String {
        match self {
            Self::Core(CoreError::StorageInconsistency(_)) => {
                "the repository could not complete the operation consistently".into()
            }
            Self::Core(CoreError::AdapterUnavailable(_)) => {
                "storage is temporarily unavailable".into()
            }
            Self::Core(err) => err.to_string(),
            Self::AuthFailed(_) | Self::BadRequest(_) => self.to_string(),
            _ => "internal server error".into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}
