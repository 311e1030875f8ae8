use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::infrastructure::DispatcherHandle;
use crate::presentation::{sse, websocket};

/// Application state shared across handlers
pub struct AppState {
    pub handle: DispatcherHandle,
    /// Per-connection buffer between the engine and the transport
    pub delivery_buffer: usize,
    /// Server-side liveness refresh cadence for SSE connections
    pub sse_heartbeat: Duration,
}

/// Create the service router: WebSocket, SSE and the REST surface
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/sse", get(sse::sse_handler))
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
