//! HTTP server setup and routing

use crate::error::{Error, Result};
use crate::playback::engine::PlaybackEngine;
use crate::state::SharedState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub engine: Arc<PlaybackEngine>,
}

impl AppContext {
    pub fn new(engine: Arc<PlaybackEngine>) -> Self {
        Self {
            state: engine.state(),
            engine,
        }
    }
}

/// Build the router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))

        // Session snapshot
        .route("/playback/state", get(super::handlers::get_playback_state))

        // Playback control
        .route("/playback/feed", post(super::handlers::set_feed))
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/reply", post(super::handlers::play_reply))
        .route("/playback/toggle", post(super::handlers::toggle))
        .route("/playback/skip", post(super::handlers::skip))
        .route("/playback/seek", post(super::handlers::seek))
        .route("/playback/close", post(super::handlers::close))

        // Explicit queue
        .route("/playback/queue", post(super::handlers::enqueue))
        .route("/playback/queue/:index/play", post(super::handlers::play_queue_item))
        .route("/playback/queue/:index", delete(super::handlers::remove_from_queue))

        // Settings and persistence hook
        .route("/playback/settings", post(super::handlers::update_settings))
        .route("/playback/heard/refresh", post(super::handlers::refresh_heard))

        // SSE event stream
        .route("/events", get(super::sse::event_stream))

        // Attach application context
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())

        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run HTTP API server until `shutdown` resolves
pub async fn run(
    addr: SocketAddr,
    engine: Arc<PlaybackEngine>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(AppContext::new(engine));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
