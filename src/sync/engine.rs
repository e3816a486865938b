//! Sync cycle orchestration.
//!
//! A cycle fetches the feed, picks the items to publish, publishes them one
//! by one in feed order and finally reconciles the registry with the
//! snapshot. The engine state sits behind an async mutex held for the whole
//! cycle, so scheduled and manual cycles never interleave.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::feed::{FeedItem, FeedSnapshot, FeedSource, FetchError};
use crate::sync::gate::PublishClock;
use crate::sync::publisher::{PublishError, PublishReceipt, Publisher};
use crate::sync::registry::{VisitStatus, VisitedRegistry};

/// Mutable engine state: registry plus publish clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    /// Visited registry.
    pub registry: VisitedRegistry,
    /// Last successful publication.
    pub clock: PublishClock,
    /// Whether the startup baseline has been taken.
    pub bootstrapped: bool,
}

/// Outcome of one publish attempt.
#[derive(Debug)]
pub struct ItemReport {
    /// Item identifier.
    pub id: String,
    /// Item title.
    pub title: String,
    /// Publication result.
    pub result: Result<PublishReceipt, PublishError>,
}

impl ItemReport {
    /// Whether the primary post exists.
    pub fn is_posted(&self) -> bool {
        match &self.result {
            Ok(_) => true,
            Err(e) => e.is_posted(),
        }
    }

    /// Whether both stages succeeded.
    pub fn is_complete(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of a completed cycle.
#[derive(Debug, Default)]
pub struct CycleSummary {
    /// Publish attempts in feed order.
    pub attempts: Vec<ItemReport>,
    /// Identifiers tracked after reconciling.
    pub tracked: usize,
    /// Identifiers evicted while reconciling.
    pub evicted: usize,
}

/// Result of a cycle.
#[derive(Debug)]
pub enum CycleReport {
    /// The first snapshot was taken as the baseline; nothing published.
    Baseline {
        /// Identifiers in the baseline.
        tracked: usize,
    },
    /// The publish interval has not elapsed.
    GateClosed {
        /// When the gate opens.
        opens_at: Option<DateTime<Utc>>,
    },
    /// The feed could not be read; no state changed.
    FetchFailed(FetchError),
    /// The cycle ran to the end.
    Completed(CycleSummary),
}

impl CycleReport {
    /// Publish attempts made during the cycle.
    pub fn attempts(&self) -> &[ItemReport] {
        match self {
            CycleReport::Completed(summary) => &summary.attempts,
            _ => &[],
        }
    }
}

/// Which items a cycle publishes.
#[derive(Debug, Clone, Copy)]
enum Selection {
    /// Every candidate.
    Candidates,
    /// The first feed item, whatever its status.
    Latest,
}

/// Feed synchronization engine.
pub struct SyncEngine {
    source: Arc<dyn FeedSource>,
    publisher: Publisher,
    interval: Duration,
    state: Mutex<EngineState>,
}

impl SyncEngine {
    /// Create an engine that has not taken its baseline yet.
    pub fn new(source: Arc<dyn FeedSource>, publisher: Publisher, interval: Duration) -> Self {
        Self {
            source,
            publisher,
            interval,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Minimum time between automatic publications.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Read-only copy of the current state.
    pub async fn inspect(&self) -> EngineState {
        self.state.lock().await.clone()
    }

    /// Fetch a snapshot without touching the engine state.
    pub async fn peek(&self) -> Result<FeedSnapshot, FetchError> {
        self.source.fetch().await
    }

    /// Take the startup baseline.
    ///
    /// Every item of the first snapshot is marked seen and the clock is
    /// seeded with the newest publish time, so nothing is posted right away.
    pub async fn bootstrap(&self) -> Result<usize, FetchError> {
        let mut state = self.state.lock().await;
        let snapshot = self.source.fetch().await?;
        Ok(Self::take_baseline(&mut state, &snapshot))
    }

    /// Scheduled cycle, subject to the publish gate.
    pub async fn run_automatic(&self, now: DateTime<Utc>) -> CycleReport {
        let mut state = self.state.lock().await;

        if state.bootstrapped && !state.clock.may_auto_publish(now, self.interval) {
            let opens_at = state.clock.opens_at(self.interval);
            info!(?opens_at, "skipped check inside post interval");
            return CycleReport::GateClosed { opens_at };
        }

        self.run_cycle(&mut state, Selection::Candidates).await
    }

    /// Manual cycle publishing every candidate, ignoring the gate.
    pub async fn post_new(&self) -> CycleReport {
        let mut state = self.state.lock().await;
        self.run_cycle(&mut state, Selection::Candidates).await
    }

    /// Manual cycle re-posting the first feed item, ignoring the gate.
    ///
    /// Other new items in the feed are not posted. They are tracked as
    /// [`VisitStatus::Pending`] and stay candidates for the next cycle.
    pub async fn post_latest(&self) -> CycleReport {
        let mut state = self.state.lock().await;
        self.run_cycle(&mut state, Selection::Latest).await
    }

    fn take_baseline(state: &mut EngineState, snapshot: &FeedSnapshot) -> usize {
        state
            .registry
            .reconcile(snapshot, VisitStatus::SeenAtStartup);
        if let Some(newest) = snapshot.newest_published() {
            state.clock.seed(newest);
        }
        state.bootstrapped = true;

        info!(
            tracked = state.registry.len(),
            last_published = %state.clock.last_published(),
            "took feed baseline"
        );
        state.registry.len()
    }

    async fn run_cycle(&self, state: &mut EngineState, selection: Selection) -> CycleReport {
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "failed to fetch feed");
                return CycleReport::FetchFailed(e);
            }
        };

        if !state.bootstrapped {
            let tracked = Self::take_baseline(state, &snapshot);
            return CycleReport::Baseline { tracked };
        }

        let selected: Vec<&FeedItem> = match selection {
            Selection::Candidates => state.registry.classify(&snapshot),
            Selection::Latest => snapshot.items.iter().take(1).collect(),
        };
        debug!(selected = selected.len(), items = snapshot.items.len(), "diffed feed");

        let mut attempts = Vec::with_capacity(selected.len());
        for item in selected {
            let result = self.publisher.publish(item, &mut state.clock).await;
            attempts.push(ItemReport {
                id: item.id.clone(),
                title: item.title.clone(),
                result,
            });
        }

        for attempt in &attempts {
            let status = if attempt.is_posted() {
                VisitStatus::Posted
            } else {
                VisitStatus::Pending
            };
            state.registry.record(&attempt.id, status);
        }
        state.registry.retire_startup_baseline();
        let stats = state.registry.reconcile(&snapshot, VisitStatus::Pending);

        let posted = attempts.iter().filter(|a| a.is_posted()).count();
        info!(
            attempted = attempts.len(),
            posted,
            tracked = state.registry.len(),
            evicted = stats.evicted,
            "sync cycle finished"
        );

        CycleReport::Completed(CycleSummary {
            attempts,
            tracked: state.registry.len(),
            evicted: stats.evicted,
        })
    }
}
