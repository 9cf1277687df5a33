//! HTTP error responses
//!
//! Every failure is returned as `{"status": "ERROR", "status_text": ...}`.
//! Client errors carry the error message, server errors are prefixed with
//! `Failed to process request`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use crate::core::error::TtsError;
use crate::server::types::FailureResponse;

impl TtsError {
    /// Text returned in the `status_text` field
    pub fn status_text(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            format!("Failed to process request {}", self)
        }
    }
}

impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Failed to infer: {}", self);
        } else {
            warn!("Rejected request ({}): {}", status.as_u16(), self);
        }

        (status, Json(FailureResponse::new(self.status_text()))).into_response()
    }
}

impl From<JsonRejection> for TtsError {
    fn from(rejection: JsonRejection) -> Self {
        TtsError::Validation {
            message: rejection.body_text(),
            field: None,
        }
    }
}
