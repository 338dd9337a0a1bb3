//! Service error taxonomy.
//!
//! Every fallible operation in the core funnels into [`ServiceError`], which
//! carries the HTTP mapping at the transport boundary:
//! Validation 400, InvalidCredential 401, Forbidden 403, NotFound 404,
//! StoreUnavailable 503, everything else 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input. Reported to the caller, never retried.
    #[error("{0}")]
    Validation(String),

    /// The named entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Access check failed. The message deliberately carries no detail about
    /// the task or what would have been permitted.
    #[error("access denied")]
    Forbidden,

    /// The bearer credential could not be verified.
    #[error("{0}")]
    InvalidCredential(String),

    /// The store did not answer within the configured deadline. Retryable for
    /// idempotent reads only.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Store backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Uncategorized internal failure (hashing, token issuance).
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Backend details stay in the logs, not the response.
            Self::Store(e) => {
                tracing::error!(error = %e, "store failure");
                "server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                "server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            ServiceError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::NotFound("task").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::StoreUnavailable("timed out".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn forbidden_message_leaks_no_detail() {
        assert_eq!(ServiceError::Forbidden.to_string(), "access denied");
    }
}
