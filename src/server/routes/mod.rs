//! HTTP route handlers

pub mod health;
pub mod transliteration;
pub mod tts;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::core::error::Result;

/// Unwrap a JSON body, turning malformed payloads into validation errors
pub(crate) fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    let Json(body) = payload?;
    Ok(body)
}
