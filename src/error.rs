use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ApiResponse;

/// ApiError
///
/// The application-wide error taxonomy. Every business-rule violation is one of
/// the 4xx variants and is rendered at the boundary as the standard
/// `{ code, message, data: null }` envelope with a matching HTTP status.
/// Server-side failures collapse to a generic 500 without leaking internals.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, and business conflicts the API reports as
    /// 400 (duplicate like, duplicate follow, unlike without a like).
    #[error("{0}")]
    Validation(String),

    /// No usable credential on a route that requires one.
    #[error("authentication required")]
    Unauthorized,

    /// The caller is authenticated but lacks the capability or visibility.
    #[error("{0}")]
    Forbidden(String),

    /// Entity absent, soft-deleted, or a precondition no longer matches.
    #[error("{0}")]
    NotFound(String),

    /// Underlying store failure. Surfaced as a generic 500.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything else unexpected. Surfaced as a generic 500.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server errors are logged with detail but reported generically.
        let message = if self.is_server_error() {
            tracing::error!(error = %self, "request failed with server error");
            "internal server error".to_string()
        } else {
            tracing::debug!(error = %self, "request rejected");
            self.to_string()
        };

        let body = Json(ApiResponse::<()> {
            code: status.as_u16(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

/// Convenience alias used by the repository and handlers.
pub type ApiResult<T> = Result<T, ApiError>;
