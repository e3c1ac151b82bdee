//! Error types for the sensor API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pisensor_core::OrchestratorError;
use pisensor_db::DbError;
use pisensor_types::ParseEnumError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was malformed: bad enum string, blank actor, unknown
    /// sensor, or malformed UUID.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store could not be reached or a query failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// A forced transition was not fully persisted.
    #[error("transition error: {0}")]
    Transition(#[from] OrchestratorError),

    /// The store did not answer the health probe.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Transition(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
