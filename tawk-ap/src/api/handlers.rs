//! HTTP request handlers
//!
//! Commands that may suspend on an intro jingle (play, reply, skip, queue
//! jump) are spawned and answered with `202 Accepted`; observers follow the
//! outcome on `/events` or by polling `/playback/state`. Every other command
//! is awaited and answered with the resulting snapshot.

use crate::api::server::AppContext;
use crate::error::Error;
use crate::playback::session::SessionSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tawk_common::events::SourceContextType;
use tawk_common::PlayableSource;
use tracing::warn;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

impl StatusResponse {
    fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedRequest {
    sources: Vec<PlayableSource>,
    #[serde(default)]
    context_type: SourceContextType,
    #[serde(default)]
    context_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    source: PlayableSource,
    #[serde(default)]
    feed_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    source: PlayableSource,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    percent: f64,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    sources: Vec<PlayableSource>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    added: usize,
    queue_len: usize,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    removed: bool,
    queue_len: usize,
    queue_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    include_replies: Option<bool>,
    #[serde(default)]
    include_autoplay: Option<bool>,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::EngineShutDown => StatusCode::SERVICE_UNAVAILABLE,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(StatusResponse::new(e.to_string())))
}

/// Spawn a command that may suspend on a jingle
fn accept(
    ctx: &AppContext,
    name: &'static str,
    command: impl Future<Output = crate::error::Result<()>> + Send + 'static,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    if ctx.engine.is_shut_down() {
        return Err(error_response(Error::EngineShutDown));
    }
    tokio::spawn(async move {
        if let Err(e) = command.await {
            warn!("{} failed: {}", name, e);
        }
    });
    Ok((StatusCode::ACCEPTED, Json(StatusResponse::new("accepted"))))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "tawk-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /playback/state
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<SessionSnapshot> {
    Json(ctx.state.snapshot().await)
}

/// POST /playback/feed
pub async fn set_feed(
    State(ctx): State<AppContext>,
    Json(req): Json<FeedRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    ctx.engine
        .set_feed(req.sources, req.context_type, req.context_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ctx.state.snapshot().await))
}

fn require_source_id(source: &PlayableSource) -> Result<(), ApiError> {
    if source.id.is_empty() {
        return Err(error_response(Error::BadRequest(
            "source id must not be empty".to_string(),
        )));
    }
    Ok(())
}

/// POST /playback/play
pub async fn play(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    require_source_id(&req.source)?;
    let engine = ctx.engine.clone();
    accept(&ctx, "play", async move {
        engine.play(req.source, req.feed_index).await
    })
}

/// POST /playback/reply
pub async fn play_reply(
    State(ctx): State<AppContext>,
    Json(req): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    require_source_id(&req.source)?;
    let engine = ctx.engine.clone();
    accept(&ctx, "play_reply", async move {
        engine.play_reply(req.source).await
    })
}

/// POST /playback/toggle
pub async fn toggle(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    ctx.engine.toggle_play_pause().await.map_err(error_response)?;
    Ok(Json(ctx.state.snapshot().await))
}

/// POST /playback/skip
pub async fn skip(
    State(ctx): State<AppContext>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let engine = ctx.engine.clone();
    accept(&ctx, "skip", async move { engine.skip().await })
}

/// POST /playback/seek
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    ctx.engine.seek(req.percent).await.map_err(error_response)?;
    Ok(Json(ctx.state.snapshot().await))
}

/// POST /playback/close
pub async fn close(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>, ApiError> {
    ctx.engine.close().await.map_err(error_response)?;
    Ok(Json(ctx.state.snapshot().await))
}

/// POST /playback/queue
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let added = ctx.engine.enqueue(req.sources).await.map_err(error_response)?;
    let queue_len = ctx.state.read(|s| s.queue().len()).await;
    Ok(Json(EnqueueResponse { added, queue_len }))
}

/// POST /playback/queue/:index/play
pub async fn play_queue_item(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let engine = ctx.engine.clone();
    accept(&ctx, "play_queue_item", async move {
        engine.play_queue_item(index).await
    })
}

/// DELETE /playback/queue/:index
pub async fn remove_from_queue(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let removed = ctx
        .engine
        .remove_from_queue(index)
        .await
        .map_err(error_response)?;
    let (queue_len, queue_index) = ctx
        .state
        .read(|s| (s.queue().len(), s.queue_index()))
        .await;
    Ok(Json(RemoveResponse {
        removed,
        queue_len,
        queue_index,
    }))
}

/// POST /playback/settings
pub async fn update_settings(
    State(ctx): State<AppContext>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    if let Some(value) = req.include_replies {
        ctx.engine
            .set_include_replies(value)
            .await
            .map_err(error_response)?;
    }
    if let Some(value) = req.include_autoplay {
        ctx.engine
            .set_include_autoplay(value)
            .await
            .map_err(error_response)?;
    }
    Ok(Json(ctx.state.snapshot().await))
}

/// POST /playback/heard/refresh
pub async fn refresh_heard(State(ctx): State<AppContext>) -> Result<StatusCode, ApiError> {
    ctx.engine.refresh_heard().await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
