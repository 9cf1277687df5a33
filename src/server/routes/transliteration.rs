//! Transliteration Route

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::info;

use super::parse_body;
use crate::core::error::Result;
use crate::server::server_core::ServerState;
use crate::server::types::{TranslitResponse, TransliterationRequest};

/// `POST /get_transliteration` transliterates every input into the target script
pub async fn transliteration(
    State(state): State<Arc<ServerState>>,
    payload: std::result::Result<Json<TransliterationRequest>, JsonRejection>,
) -> Result<Json<TranslitResponse>> {
    let request = parse_body(payload)?;
    info!(
        "Transliteration request: {} input(s), {} -> {}",
        request.input.len(),
        request.config.language.source_language,
        request.config.language.target_language
    );

    let response = state.pipeline.infer_transliterate_request(&request).await?;
    Ok(Json(response))
}
