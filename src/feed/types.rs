//! Feed snapshot types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Maximum feed size in bytes (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// A single item read from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Stable identifier (RSS guid or Atom id).
    pub id: String,
    /// Item title.
    pub title: String,
    /// Outbound links, in feed order.
    pub links: Vec<String>,
    /// Plain-text description (HTML stripped).
    pub description: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
}

impl FeedItem {
    /// Create an item with no links or description.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            links: Vec::new(),
            description: String::new(),
            published_at,
        }
    }

    /// Add a link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One point-in-time read of the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Feed title.
    pub title: String,
    /// Items in the order the source delivered them.
    pub items: Vec<FeedItem>,
    /// Response headers of the poll, sorted by name.
    pub headers: BTreeMap<String, String>,
}

impl FeedSnapshot {
    /// Create a snapshot from items.
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            title: String::new(),
            items,
            headers: BTreeMap::new(),
        }
    }

    /// Whether the snapshot has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over item identifiers in feed order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }

    /// Newest publish timestamp in the snapshot.
    pub fn newest_published(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|item| item.published_at).max()
    }
}
