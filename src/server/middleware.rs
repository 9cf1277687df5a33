//! Request statistics behind `GET /stats`
//!
//! Every request to a registered route is timed and counted per route.
//! Client errors (unknown model, empty text, bad body) are kept apart from
//! server errors so a broken model shows up as `server_errors`.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Requests slower than this are logged as warnings
const SLOW_REQUEST_MS: f64 = 5000.0;

/// Counters of a single route
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RouteStats {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub avg_ms: f64,
    pub max_ms: f64,
    #[serde(skip)]
    total_ms: f64,
}

impl RouteStats {
    fn record(&mut self, status: StatusCode, elapsed_ms: f64) {
        self.requests += 1;
        if status.is_client_error() {
            self.client_errors += 1;
        } else if status.is_server_error() {
            self.server_errors += 1;
        }
        self.total_ms += elapsed_ms;
        self.max_ms = self.max_ms.max(elapsed_ms);
        self.avg_ms = self.total_ms / self.requests as f64;
    }

    fn merge(&mut self, other: &RouteStats) {
        self.requests += other.requests;
        self.client_errors += other.client_errors;
        self.server_errors += other.server_errors;
        self.total_ms += other.total_ms;
        self.max_ms = self.max_ms.max(other.max_ms);
        if self.requests > 0 {
            self.avg_ms = self.total_ms / self.requests as f64;
        }
    }
}

/// Body of `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total: RouteStats,
    pub routes: BTreeMap<String, RouteStats>,
}

/// Per-route request counters shared by the middleware and `/stats`
#[derive(Debug, Default)]
pub struct RequestStats {
    routes: RwLock<BTreeMap<String, RouteStats>>,
    access_log: bool,
}

impl RequestStats {
    /// `access_log` enables one `info!` line per request
    pub fn new(access_log: bool) -> Self {
        Self {
            routes: RwLock::new(BTreeMap::new()),
            access_log,
        }
    }

    pub async fn record(&self, route: &str, status: StatusCode, elapsed_ms: f64) {
        let mut routes = self.routes.write().await;
        routes.entry(route.to_string()).or_default().record(status, elapsed_ms);
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let routes = self.routes.read().await.clone();
        let mut total = RouteStats::default();
        for stats in routes.values() {
            total.merge(stats);
        }
        StatsSnapshot { total, routes }
    }
}

/// Time and count a request
///
/// Installed as a route layer, so only requests that hit a registered route
/// are tracked.
pub async fn track_requests(
    State(stats): State<Arc<RequestStats>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let route = req.uri().path().to_string();
    let method = req.method().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();
    stats.record(&route, status, elapsed_ms).await;

    if elapsed_ms > SLOW_REQUEST_MS {
        warn!("Slow request: {} {} took {:.0}ms ({})", method, route, elapsed_ms, status);
    } else if stats.access_log {
        info!("{} {} {} in {:.1}ms", method, route, status.as_u16(), elapsed_ms);
    }

    response
}
