//! TTS Server Core
//!
//! Main server implementation with Axum web framework

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::core::error::{Result, TtsError};
use crate::engine::{select_device, ModelRegistry, TtsPipeline};
use crate::server::config::ServerConfig;
use crate::server::middleware::{track_requests, RequestStats};
use crate::server::routes;
use crate::transliteration::{RemoteTransliterator, SentenceTransliterator, Transliterator};

/// Server state shared across handlers
pub struct ServerState {
    /// Server configuration
    pub config: ServerConfig,
    /// Synthesis and transliteration pipeline
    pub pipeline: TtsPipeline,
    /// Per-route request counters
    pub stats: Arc<RequestStats>,
    /// Start time for uptime calculation
    pub start_time: Instant,
}

impl ServerState {
    /// Create state around an already built pipeline
    pub fn new(config: ServerConfig, pipeline: TtsPipeline) -> Self {
        let stats = Arc::new(RequestStats::new(config.logging.access_log));
        Self {
            config,
            pipeline,
            stats,
            start_time: Instant::now(),
        }
    }

    /// Load models and transliteration backends described by `config`
    pub async fn from_config(config: ServerConfig) -> Result<Self> {
        let transliterator = build_transliterator(&config)?;

        let models = config.models.clone();
        let registry = tokio::task::spawn_blocking(move || {
            let device = select_device(&models.device)?;
            info!("Loading models on {:?}", device);
            ModelRegistry::load(&models.entries, models.models_dir.as_deref(), &device, models.load_options())
        })
        .await
        .map_err(|e| TtsError::Internal {
            message: format!("Model loading task failed: {}", e),
            location: Some("ServerState::from_config".to_string()),
        })??;

        if registry.is_empty() {
            tracing::warn!("No TTS models loaded; only transliteration will succeed");
        }

        let pipeline = TtsPipeline::new(Arc::new(registry), transliterator);
        Ok(Self::new(config, pipeline))
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

fn build_transliterator(config: &ServerConfig) -> Result<SentenceTransliterator> {
    let romanized = match config.transliteration.remote() {
        Some(remote) => {
            info!("Romanized transliteration via {}", remote.base_url);
            let backend: Arc<dyn Transliterator> = Arc::new(RemoteTransliterator::new(&remote)?);
            Some(backend)
        }
        None => {
            info!("No romanized transliteration backend configured");
            None
        }
    };
    Ok(SentenceTransliterator::new(romanized))
}

/// Create the router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let stats = state.stats.clone();

    Router::new()
        // Synthesis
        .route("/", post(routes::tts::tts))
        // Transliteration
        .route("/get_transliteration", post(routes::transliteration::transliteration))
        // Health check and stats
        .route("/health", get(routes::health::health_check))
        .route("/stats", get(routes::health::stats))
        .with_state(state)
        .route_layer(middleware::from_fn_with_state(stats, track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// TTS Server
pub struct TtsServer {
    state: Arc<ServerState>,
}

impl TtsServer {
    /// Create a server, loading every configured model
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let state = ServerState::from_config(config).await?;
        Ok(Self::with_state(state))
    }

    /// Create a server around prepared state
    pub fn with_state(state: ServerState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Run the server until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address();
        let router = create_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| TtsError::Config {
            message: format!("Failed to bind {}: {}", addr, e),
            path: None,
        })?;
        info!("Starting TTS server on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Get server state
    pub fn state(&self) -> Arc<ServerState> {
        self.state.clone()
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_without_models() {
        let mut config = ServerConfig::default();
        config.models.models_dir = None;

        let state = ServerState::from_config(config).await.unwrap();
        assert!(state.pipeline.registry().is_empty());
        assert!(state.pipeline.transliterator().romanized_backend().is_none());
        let _ = create_router(Arc::new(state));
    }

    #[tokio::test]
    async fn test_missing_models_dir_is_tolerated() {
        let mut config = ServerConfig::default();
        config.models.models_dir = Some("/nonexistent/models".into());
        let state = ServerState::from_config(config).await.unwrap();
        assert!(state.pipeline.registry().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_device_fails() {
        let mut config = ServerConfig::default();
        config.models.device = "tpu".to_string();
        assert!(ServerState::from_config(config).await.is_err());
    }

    #[tokio::test]
    async fn test_remote_backend_configured() {
        let mut config = ServerConfig::default();
        config.models.models_dir = None;
        config.transliteration.base_url = Some("http://127.0.0.1:4321".to_string());

        let state = ServerState::from_config(config).await.unwrap();
        assert_eq!(state.pipeline.transliterator().romanized_backend(), Some("remote"));
    }
}
