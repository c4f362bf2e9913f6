#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use anyhow::{Context, Result};
use bella_iptv::{
    cache::{ChannelCache, spawn_background_refresh},
    config::Args,
    server::{self, AppState},
    util::{init_http_client, init_tracing, spawn_ct_watcher},
};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let client = init_http_client(args.connect_timeout(), args.request_timeout())?;
    let source = args.playlist_source(client);
    info!("Serving channels from {}", source.location());

    let cache = Arc::new(ChannelCache::new(
        source,
        args.cache_config(),
        args.parse_options(),
    ));

    let ct = CancellationToken::new();
    spawn_ct_watcher(ct.clone());

    let addr = args.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Binding HTTP server on {addr}"))?;

    let state = AppState::new(cache.clone(), args.manifest());
    let server_handle = tokio::spawn(server::serve(listener, state, ct.clone()));

    let base = format!("http://localhost:{}", args.port);
    info!("Addon running at {base}/manifest.json");
    info!("Channels: {base}/channels");
    info!("Groups: {base}/groups");
    info!("Health check: {base}/health");

    let refresh_handle = args.refresh_interval().map(|every| {
        info!("Refreshing playlist in the background every {}s", every.as_secs());
        spawn_background_refresh(cache.clone(), every, ct.clone())
    });

    let warm_handle = tokio::spawn({
        let cache = cache.clone();
        async move {
            if cache.refresh().await.channels.is_empty() {
                warn!("Started without any channel, lookups will come back empty until the next refresh");
            }
        }
    });

    server_handle.await.context("Joining HTTP server task")??;
    ct.cancel();
    warm_handle.abort();
    if let Some(handle) = refresh_handle {
        handle.await.ok();
    }

    info!("All done!");
    Ok(())
}
