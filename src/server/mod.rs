//! TTS Server Module
//!
//! HTTP API of the service:
//! - `POST /` synthesizes speech and returns base64 WAV files
//! - `POST /get_transliteration` transliterates text into an Indic script
//! - `GET /health` and `GET /stats` report service status

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server_core;
pub mod types;

pub use config::ServerConfig;
pub use middleware::{RequestStats, RouteStats, StatsSnapshot};
pub use server_core::{create_router, ServerState, TtsServer};
pub use types::*;
