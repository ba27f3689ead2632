//! Single-flight coordination of full-game reviews.
//!
//! Every game identity moves through `absent -> pending -> completed` exactly
//! once per cache. The first caller registers a pending entry and spawns the
//! one backend request; later callers attach to the same shared handle. A
//! failed or panicked backend call settles with the synthetic review, so
//! every caller always gets a result.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chess_core::GameIdentity;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::ReviewError;
use crate::review::GameAnalysis;
use crate::synthesis;

/// A game to review. The identity fields also seed the fallback review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub identity: GameIdentity,
    pub pgn: String,
    #[serde(default)]
    pub white: String,
    #[serde(default)]
    pub black: String,
    pub end_time: i64,
}

impl ReviewRequest {
    pub fn new(url: &str, end_time: i64, pgn: impl Into<String>) -> Self {
        Self {
            identity: GameIdentity::new(url, end_time),
            pgn: pgn.into(),
            white: String::new(),
            black: String::new(),
            end_time,
        }
    }

    pub fn with_players(mut self, white: impl Into<String>, black: impl Into<String>) -> Self {
        self.white = white.into();
        self.black = black.into();
        self
    }
}

/// Produces the real full-game review.
pub trait ReviewBackend: Send + Sync + 'static {
    fn review(
        &self,
        request: &ReviewRequest,
    ) -> impl Future<Output = Result<GameAnalysis, ReviewError>> + Send;
}

type SharedAnalysis = Shared<BoxFuture<'static, Arc<GameAnalysis>>>;

/// Handle on a review that has not settled yet.
#[derive(Clone)]
pub struct PendingReview {
    handle: SharedAnalysis,
    progress: Arc<AtomicU8>,
}

impl PendingReview {
    pub fn new(handle: SharedAnalysis, progress: Arc<AtomicU8>) -> Self {
        Self { handle, progress }
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    pub async fn wait(self) -> Arc<GameAnalysis> {
        self.handle.await
    }
}

#[derive(Clone)]
pub enum CacheEntry {
    Pending(PendingReview),
    Completed(Arc<GameAnalysis>),
}

/// Externally visible state of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Absent,
    Pending(u8),
    Completed,
}

impl ReviewState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Pending(_) => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn progress(self) -> Option<u8> {
        match self {
            Self::Absent => None,
            Self::Pending(p) => Some(p),
            Self::Completed => Some(100),
        }
    }
}

/// Pending and completed reviews keyed by game identity. Entries live as
/// long as the cache.
#[derive(Default)]
pub struct AnalysisCache {
    entries: Mutex<HashMap<GameIdentity, CacheEntry>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GameIdentity, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completed review, if any.
    pub fn get(&self, identity: &GameIdentity) -> Option<Arc<GameAnalysis>> {
        match self.lock().get(identity) {
            Some(CacheEntry::Completed(analysis)) => Some(Arc::clone(analysis)),
            _ => None,
        }
    }

    /// Return the existing entry, or register the one built by `create`.
    ///
    /// Lookup and insert happen under one lock with no suspension point in
    /// between, so `create` runs at most once per identity.
    pub fn get_or_create<F>(&self, identity: &GameIdentity, create: F) -> CacheEntry
    where
        F: FnOnce() -> PendingReview,
    {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(identity) {
            return entry.clone();
        }
        let pending = create();
        entries.insert(identity.clone(), CacheEntry::Pending(pending.clone()));
        CacheEntry::Pending(pending)
    }

    /// Settle `identity` with its final review.
    pub fn complete(&self, identity: &GameIdentity, analysis: Arc<GameAnalysis>) {
        self.lock()
            .insert(identity.clone(), CacheEntry::Completed(analysis));
    }

    pub fn state(&self, identity: &GameIdentity) -> ReviewState {
        match self.lock().get(identity) {
            None => ReviewState::Absent,
            Some(CacheEntry::Pending(p)) => ReviewState::Pending(p.progress()),
            Some(CacheEntry::Completed(_)) => ReviewState::Completed,
        }
    }

    pub fn progress(&self, identity: &GameIdentity) -> Option<u8> {
        self.state(identity).progress()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Front door for full-game reviews.
pub struct AnalysisCoordinator<B> {
    backend: Arc<B>,
    cache: Arc<AnalysisCache>,
    config: CoordinatorConfig,
}

impl<B: ReviewBackend> AnalysisCoordinator<B> {
    pub fn new(backend: Arc<B>, cache: Arc<AnalysisCache>, config: CoordinatorConfig) -> Self {
        Self {
            backend,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Review of `request`'s game. A cached review returns immediately;
    /// otherwise this waits on the single in-flight request.
    pub async fn get_analysis(&self, request: ReviewRequest) -> Arc<GameAnalysis> {
        let identity = request.identity.clone();
        let entry = self.cache.get_or_create(&identity, || self.start(request));
        match entry {
            CacheEntry::Completed(analysis) => analysis,
            CacheEntry::Pending(pending) => pending.wait().await,
        }
    }

    pub fn state(&self, identity: &GameIdentity) -> ReviewState {
        self.cache.state(identity)
    }

    pub fn progress(&self, identity: &GameIdentity) -> Option<u8> {
        self.cache.progress(identity)
    }

    /// Spawn the backend request and its progress ticker. The task writes the
    /// completed entry itself, so it settles even if every caller goes away.
    fn start(&self, request: ReviewRequest) -> PendingReview {
        info!(game = %request.identity, "Starting game review");

        let progress = Arc::new(AtomicU8::new(0));
        let backend = Arc::clone(&self.backend);
        let cache = Arc::clone(&self.cache);
        let task_progress = Arc::clone(&progress);
        let task_request = request.clone();

        let task = tokio::spawn(async move {
            let analysis = Arc::new(run_review(backend.as_ref(), &task_request).await);
            cache.complete(&task_request.identity, Arc::clone(&analysis));
            task_progress.store(100, Ordering::Release);
            analysis
        });

        spawn_progress_ticker(Arc::clone(&progress), self.config);

        let cache = Arc::clone(&self.cache);
        let settle_progress = Arc::clone(&progress);
        let handle = async move {
            match task.await {
                Ok(analysis) => analysis,
                Err(e) => {
                    error!(game = %request.identity, error = %e, "Review task did not finish");
                    let analysis = Arc::new(synthesis::synthesize(&request));
                    cache.complete(&request.identity, Arc::clone(&analysis));
                    settle_progress.store(100, Ordering::Release);
                    analysis
                }
            }
        }
        .boxed()
        .shared();

        PendingReview::new(handle, progress)
    }
}

async fn run_review<B: ReviewBackend>(backend: &B, request: &ReviewRequest) -> GameAnalysis {
    match AssertUnwindSafe(backend.review(request)).catch_unwind().await {
        Ok(Ok(analysis)) => {
            info!(game = %request.identity, moves = analysis.total_moves, "Game review complete");
            analysis
        }
        Ok(Err(e)) => {
            warn!(game = %request.identity, error = %e, "Backend review failed, using fallback");
            synthesis::synthesize(request)
        }
        Err(_) => {
            error!(game = %request.identity, "Backend review panicked, using fallback");
            synthesis::synthesize(request)
        }
    }
}

/// Advance `progress` by a fixed step on a fixed interval until it reaches
/// the ceiling or the review settles.
fn spawn_progress_ticker(progress: Arc<AtomicU8>, config: CoordinatorConfig) {
    let CoordinatorConfig {
        progress_interval,
        progress_step,
        progress_ceiling,
    } = config;
    let start = tokio::time::Instant::now() + progress_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(start, progress_interval);
        loop {
            ticker.tick().await;
            let advanced = progress.fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                (p < progress_ceiling).then(|| p.saturating_add(progress_step).min(progress_ceiling))
            });
            if advanced.is_err() {
                break;
            }
        }
    });
}
