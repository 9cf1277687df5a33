//! Speech Synthesis Route

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::info;

use super::parse_body;
use crate::core::error::Result;
use crate::server::server_core::ServerState;
use crate::server::types::{TtsRequest, TtsResponse};

/// `POST /` synthesizes every input of the request
pub async fn tts(
    State(state): State<Arc<ServerState>>,
    payload: std::result::Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Json<TtsResponse>> {
    let request = parse_body(payload)?;
    info!(
        "TTS request: {} input(s), language {}, gender {}",
        request.input.len(),
        request.config.language.source_language,
        request.config.gender
    );

    let response = state.pipeline.infer_tts_request(&request).await?;
    Ok(Json(response))
}
