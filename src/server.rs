use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};

use crate::{
    addon::{AddonManifest, Stream, StreamResponse, TV_TYPE},
    cache::ChannelCache,
    playlist::ChannelRecord,
};

#[derive(Clone)]
pub struct AppState {
    cache: Arc<ChannelCache>,
    manifest: Arc<AddonManifest>,
    started_at: Instant,
}

impl AppState {
    pub fn new(cache: Arc<ChannelCache>, manifest: AddonManifest) -> Self {
        Self {
            cache,
            manifest: Arc::new(manifest),
            started_at: Instant::now(),
        }
    }
}

/// Builds the addon's HTTP routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/manifest.json", get(manifest))
        .route("/stream/{kind}/{file}", get(stream))
        .route("/channels", get(channels))
        .route("/groups", get(groups))
        .route("/groups/{name}", get(group_channels))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}

/// Serves the addon on `listener` until `ct` is cancelled
///
/// # Errors
/// Errors when accepting connections fails
pub async fn serve(listener: TcpListener, state: AppState, ct: CancellationToken) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .context("Serving HTTP")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn manifest(State(state): State<AppState>) -> Json<AddonManifest> {
    Json(state.manifest.as_ref().clone())
}

async fn stream(
    State(state): State<AppState>,
    Path((kind, file)): Path<(String, String)>,
) -> Response {
    if kind != TV_TYPE {
        return error_response(StatusCode::BAD_REQUEST, "Invalid resource type");
    }

    let id = file.strip_suffix(".json").unwrap_or(&file);
    let Some(channel) = state.cache.lookup_by_id(id).await else {
        info!("No stream found for {id}");
        return Json(StreamResponse::default()).into_response();
    };

    Json(StreamResponse {
        streams: vec![Stream::from(&channel)],
        cache_max_age: Some(state.cache.ttl().as_secs()),
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
struct ChannelsQuery {
    group: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelList {
    count: usize,
    last_updated: DateTime<Utc>,
    channels: Vec<ChannelRecord>,
}

async fn channels(
    State(state): State<AppState>,
    Query(query): Query<ChannelsQuery>,
) -> Json<ChannelList> {
    let snapshot = state.cache.get_snapshot().await;
    let channels = match query.group.as_deref().filter(|g| !g.is_empty()) {
        Some(group) => snapshot.in_group(group).cloned().collect::<Vec<_>>(),
        None => snapshot.channels.clone(),
    };

    Json(ChannelList {
        count: channels.len(),
        last_updated: snapshot.fetched_at,
        channels,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupList {
    count: usize,
    last_updated: DateTime<Utc>,
    groups: Vec<String>,
}

async fn groups(State(state): State<AppState>) -> Json<GroupList> {
    let snapshot = state.cache.get_snapshot().await;
    let groups = snapshot.groups.iter().cloned().collect::<Vec<_>>();

    Json(GroupList {
        count: groups.len(),
        last_updated: snapshot.fetched_at,
        groups,
    })
}

#[derive(Debug, Serialize)]
struct GroupChannels {
    group: String,
    count: usize,
    channels: Vec<ChannelRecord>,
}

async fn group_channels(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<GroupChannels> {
    let channels = state.cache.lookup_by_group(&name).await;

    Json(GroupChannels {
        group: name,
        count: channels.len(),
        channels,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    channels_loaded: usize,
    groups_loaded: usize,
    last_cache_update: Option<DateTime<Utc>>,
    /// Seconds since the server started
    uptime: f64,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let snapshot = state.cache.current().await;

    Json(Health {
        status: "OK",
        channels_loaded: snapshot.as_ref().map_or(0, |s| s.channels.len()),
        groups_loaded: snapshot.as_ref().map_or(0, |s| s.groups.len()),
        last_cache_update: snapshot.map(|s| s.fetched_at),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
