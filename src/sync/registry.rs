//! Visited registry.
//!
//! Tracks the status of every item in the current feed window. Identifiers
//! that drop out of the feed are forgotten, so the registry never grows past
//! the size of the feed itself.

use std::collections::{HashMap, HashSet};

use crate::feed::{FeedItem, FeedSnapshot};

/// Publication status of a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitStatus {
    /// Never observed (no registry entry).
    Unseen,
    /// Part of the startup baseline, never posted.
    SeenAtStartup,
    /// Observed in an earlier cycle and not eligible for posting.
    SeenNotNew,
    /// Not posted yet; eligible in the next cycle.
    Pending,
    /// Primary post succeeded at least once.
    Posted,
}

impl VisitStatus {
    /// Whether an item with this status should be published.
    pub fn is_candidate(self) -> bool {
        matches!(self, VisitStatus::Unseen | VisitStatus::Pending)
    }

    /// Short lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            VisitStatus::Unseen => "unseen",
            VisitStatus::SeenAtStartup => "seen_at_startup",
            VisitStatus::SeenNotNew => "seen_not_new",
            VisitStatus::Pending => "pending",
            VisitStatus::Posted => "posted",
        }
    }
}

/// Result of a [`VisitedRegistry::reconcile`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Identifiers inserted.
    pub added: usize,
    /// Identifiers evicted.
    pub evicted: usize,
}

/// In-memory map from item identifier to [`VisitStatus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedRegistry {
    entries: HashMap<String, VisitStatus>,
}

impl VisitedRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of an identifier; [`VisitStatus::Unseen`] when absent.
    pub fn status(&self, id: &str) -> VisitStatus {
        self.entries
            .get(id)
            .copied()
            .unwrap_or(VisitStatus::Unseen)
    }

    /// Items of the snapshot that should be published, in snapshot order.
    ///
    /// An identifier listed more than once yields only its first item.
    pub fn classify<'a>(&self, snapshot: &'a FeedSnapshot) -> Vec<&'a FeedItem> {
        let mut seen = HashSet::new();
        snapshot
            .items
            .iter()
            .filter(|item| seen.insert(item.id.as_str()))
            .filter(|item| self.status(&item.id).is_candidate())
            .collect()
    }

    /// Align the registry with a snapshot.
    ///
    /// Identifiers new to the registry are inserted with `status_for_new`;
    /// identifiers missing from the snapshot are removed. Existing entries
    /// keep their status.
    pub fn reconcile(
        &mut self,
        snapshot: &FeedSnapshot,
        status_for_new: VisitStatus,
    ) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

        for id in snapshot.ids() {
            if !self.entries.contains_key(id) {
                self.entries.insert(id.to_string(), status_for_new);
                stats.added += 1;
            }
        }

        let current: HashSet<&str> = snapshot.ids().collect();
        let before = self.entries.len();
        self.entries.retain(|id, _| current.contains(id.as_str()));
        stats.evicted = before - self.entries.len();

        stats
    }

    /// Set the status of an item that was attempted in this cycle.
    pub fn record(&mut self, id: &str, status: VisitStatus) {
        self.entries.insert(id.to_string(), status);
    }

    /// Demote the startup baseline to [`VisitStatus::SeenNotNew`].
    ///
    /// Returns the number of entries changed.
    pub fn retire_startup_baseline(&mut self) -> usize {
        let mut retired = 0;
        for status in self.entries.values_mut() {
            if *status == VisitStatus::SeenAtStartup {
                *status = VisitStatus::SeenNotNew;
                retired += 1;
            }
        }
        retired
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over tracked entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, VisitStatus)> {
        self.entries.iter().map(|(id, status)| (id.as_str(), *status))
    }
}
