//! Health Check Routes

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::server::middleware::StatsSnapshot;
use crate::server::server_core::ServerState;
use crate::server::types::HealthResponse;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.uptime().as_secs(),
        models: state.pipeline.registry().keys(),
        transliteration_backend: state
            .pipeline
            .transliterator()
            .romanized_backend()
            .map(str::to_string),
    })
}

/// Per-route request statistics
pub async fn stats(State(state): State<Arc<ServerState>>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot().await)
}
