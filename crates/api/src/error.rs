//! API error type and its JSON rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hostel_core::ledger::LedgerError;
use serde_json::json;
use tracing::error;

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The request could not be interpreted.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// Stable machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::BadRequest(_) => "VALIDATION_ERROR",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(e) => {
                StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, code = self.error_code(), "request failed");
            match &self {
                Self::Ledger(LedgerError::SequencerUnavailable) => self.to_string(),
                Self::Ledger(LedgerError::PostingFailed(_)) => "Posting failed; nothing was written".to_string(),
                Self::Ledger(LedgerError::ReversalFailed(_)) => "Reversal failed; nothing was written".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.error_code(),
                "message": message
            })),
        )
            .into_response()
    }
}
