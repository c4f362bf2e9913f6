//! Time-to-live cache over the parsed playlist
//!
//! The cache refreshes lazily: a caller that finds the snapshot missing or older
//! than the TTL fetches and parses the playlist again. Only one refresh runs at a
//! time. Callers arriving while a refresh is in flight get the previous snapshot
//! when there is one, and wait for the refresh otherwise.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::{
    sync::{Mutex, MutexGuard, RwLock},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    playlist::{ChannelRecord, ParseOptions, parse_with},
    source::PlaylistSource,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(4 * 60 * 60);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Source of the current time, swappable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a snapshot is served before the next lookup refreshes it
    pub ttl: Duration,
    /// Wait after a failed refresh before trying again, capped at `ttl`
    pub retry_backoff: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// One parsed version of the playlist. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub channels: Vec<ChannelRecord>,
    pub groups: BTreeSet<String>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn new(channels: Vec<ChannelRecord>, fetched_at: DateTime<Utc>) -> Self {
        let groups = channels
            .iter()
            .filter(|c| !c.group.is_empty())
            .map(|c| c.group.clone())
            .collect();

        Self {
            channels,
            groups,
            fetched_at,
        }
    }

    #[must_use]
    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), fetched_at)
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ChannelRecord> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a ChannelRecord> {
        self.channels.iter().filter(move |c| c.group == group)
    }
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    /// Set after a failed refresh of an expired or missing snapshot; replaces
    /// the TTL deadline until the next successful refresh
    retry_at: Option<DateTime<Utc>>,
}

impl CacheState {
    fn fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> Option<Arc<Snapshot>> {
        let snapshot = self.snapshot.as_ref()?;
        let due = match self.retry_at {
            Some(retry_at) => now >= retry_at,
            None => now - snapshot.fetched_at >= ttl,
        };
        (!due).then(|| snapshot.clone())
    }
}

/// Owns the current [`Snapshot`] and decides when to rebuild it
pub struct ChannelCache {
    source: Arc<dyn PlaylistSource>,
    clock: Arc<dyn Clock>,
    options: ParseOptions,
    ttl: TimeDelta,
    retry_backoff: TimeDelta,
    config: CacheConfig,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

impl ChannelCache {
    pub fn new(source: Arc<dyn PlaylistSource>, config: CacheConfig, options: ParseOptions) -> Self {
        let ttl = TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::MAX);
        let retry_backoff = TimeDelta::from_std(config.retry_backoff)
            .unwrap_or(TimeDelta::MAX)
            .min(ttl);

        Self {
            source,
            clock: Arc::new(SystemClock),
            options,
            ttl,
            retry_backoff,
            config,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// The snapshot currently installed, without triggering a refresh
    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.state.read().await.snapshot.clone()
    }

    /// Returns the current snapshot, refreshing it first when it is missing or expired
    pub async fn get_snapshot(&self) -> Arc<Snapshot> {
        let now = self.clock.now();
        let installed = {
            let state = self.state.read().await;
            if let Some(fresh) = state.fresh(now, self.ttl) {
                return fresh;
            }
            state.snapshot.clone()
        };

        match installed {
            Some(stale) => match self.refresh_lock.try_lock() {
                Ok(guard) => self.refresh_locked(guard, false).await,
                Err(_) => {
                    debug!("Refresh already in flight, serving previous snapshot");
                    stale
                }
            },
            None => {
                let guard = self.refresh_lock.lock().await;
                self.refresh_locked(guard, false).await
            }
        }
    }

    /// Refreshes unconditionally, waiting for any refresh already in flight
    pub async fn refresh(&self) -> Arc<Snapshot> {
        let guard = self.refresh_lock.lock().await;
        self.refresh_locked(guard, true).await
    }

    pub async fn lookup_by_id(&self, id: &str) -> Option<ChannelRecord> {
        self.get_snapshot().await.find(id).cloned()
    }

    pub async fn lookup_by_group(&self, group: &str) -> Vec<ChannelRecord> {
        self.get_snapshot()
            .await
            .in_group(group)
            .cloned()
            .collect()
    }

    /// Distinct group labels, sorted
    pub async fn list_groups(&self) -> Vec<String> {
        self.get_snapshot().await.groups.iter().cloned().collect()
    }

    #[instrument(skip(self, _guard), fields(source = %self.source.location()))]
    async fn refresh_locked(&self, _guard: MutexGuard<'_, ()>, force: bool) -> Arc<Snapshot> {
        let now = self.clock.now();

        if !force {
            // Whoever held the lock before us may already have refreshed
            if let Some(fresh) = self.state.read().await.fresh(now, self.ttl) {
                return fresh;
            }
        }

        let started = std::time::Instant::now();
        match self.source.fetch_playlist_text().await {
            Ok(text) => {
                let snapshot = Arc::new(Snapshot::new(parse_with(&text, &self.options), now));
                info!(
                    "Cache refreshed with {} channels and {} groups ({}ms)",
                    snapshot.channels.len(),
                    snapshot.groups.len(),
                    started.elapsed().as_millis()
                );

                let mut state = self.state.write().await;
                state.snapshot = Some(snapshot.clone());
                state.retry_at = None;
                snapshot
            }
            Err(e) => {
                let mut state = self.state.write().await;
                // A snapshot that has not expired yet keeps its deadline
                if state.fresh(now, self.ttl).is_none() {
                    state.retry_at = Some(
                        now.checked_add_signed(self.retry_backoff)
                            .unwrap_or(DateTime::<Utc>::MAX_UTC),
                    );
                }

                if let Some(existing) = &state.snapshot {
                    warn!(
                        "Playlist refresh failed, still serving snapshot from {}: {e}",
                        existing.fetched_at
                    );
                    return existing.clone();
                }

                warn!("Playlist refresh failed with no snapshot to fall back on: {e}");
                let empty = Arc::new(Snapshot::empty(now));
                state.snapshot = Some(empty.clone());
                empty
            }
        }
    }
}

/// Spawns a task refreshing `cache` every `every` until `ct` is cancelled
///
/// The first refresh happens one full period after spawning.
pub fn spawn_background_refresh(
    cache: Arc<ChannelCache>,
    every: Duration,
    ct: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = ct.cancelled() => break,
                _ = ticker.tick() => {
                    debug!("Background refresh tick");
                    cache.refresh().await;
                }
            }
        }

        info!("Background refresh stopped");
    })
}
