//! Test helpers for integration tests.
//!
//! Provides scripted fakes for the feed source and the messaging client.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use herald::config::DiscordConfig;
use herald::feed::{FeedItem, FeedSnapshot, FeedSource, FetchError};
use herald::messaging::{MessagingClient, MessagingError, PostHandle, PrimaryPost};
use herald::sync::{Publisher, SyncEngine};

/// Interval used by engines built with [`engine`].
pub const INTERVAL_HOURS: i64 = 24;

/// Publish time of test items: hour `hour` of 2024-05-01.
pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

/// A moment long after every test item, with the gate open.
pub fn far_future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

/// Item `id` titled "Title <id>" published at `at(hour)`.
pub fn item(id: &str, hour: u32) -> FeedItem {
    FeedItem::new(id, format!("Title {id}"), at(hour))
}

/// Snapshot from items, in the given order.
pub fn snapshot(items: Vec<FeedItem>) -> FeedSnapshot {
    FeedSnapshot::new(items)
}

/// Feed source returning whatever snapshot was last set.
#[derive(Default)]
pub struct FakeFeed {
    current: Mutex<Option<FeedSnapshot>>,
    fetches: AtomicUsize,
}

impl FakeFeed {
    /// Feed serving `snapshot`.
    pub fn new(snapshot: FeedSnapshot) -> Arc<Self> {
        let feed = Self::default();
        feed.set(snapshot);
        Arc::new(feed)
    }

    /// Serve `snapshot` from now on.
    pub fn set(&self, snapshot: FeedSnapshot) {
        *self.current.lock().unwrap() = Some(snapshot);
    }

    /// Fail every fetch from now on.
    pub fn fail(&self) {
        *self.current.lock().unwrap() = None;
    }

    /// Number of fetch calls so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch(&self) -> Result<FeedSnapshot, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or(FetchError::Status(503))
    }
}

/// Messaging client recording every call.
///
/// Posts whose title ends with a name in `fail_primary` and notifications
/// whose body contains a name in `fail_notification` are rejected.
#[derive(Default)]
pub struct FakeMessenger {
    pub posts: Mutex<Vec<PrimaryPost>>,
    pub notifications: Mutex<Vec<(String, String)>>,
    fail_primary: Mutex<HashSet<String>>,
    fail_notification: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
    delay_ms: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject the primary post of the item titled `title`.
    pub fn fail_primary(&self, title: &str) {
        self.fail_primary.lock().unwrap().insert(title.to_string());
    }

    /// Reject the notification for the item titled `title`.
    pub fn fail_notification(&self, title: &str) {
        self.fail_notification
            .lock()
            .unwrap()
            .insert(title.to_string());
    }

    /// Hold every call for `ms` milliseconds.
    pub fn set_delay_ms(&self, ms: usize) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Accept everything again.
    pub fn heal(&self) {
        self.fail_primary.lock().unwrap().clear();
        self.fail_notification.lock().unwrap().clear();
    }

    /// Titles of the created posts, in call order.
    pub fn posted_titles(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|post| post.title.clone())
            .collect()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    async fn enter(&self) {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let ms = self.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 100).to_string()
    }
}

fn rejected() -> MessagingError {
    MessagingError::Status {
        status: 500,
        body: "rejected".to_string(),
    }
}

#[async_trait]
impl MessagingClient for FakeMessenger {
    async fn create_primary_post(&self, post: &PrimaryPost) -> Result<PostHandle, MessagingError> {
        self.enter().await;
        let result = self.record_post(post);
        self.leave();
        result
    }

    async fn send_notification(&self, channel_id: &str, body: &str) -> Result<String, MessagingError> {
        self.enter().await;
        let result = self.record_notification(channel_id, body);
        self.leave();
        result
    }
}

impl FakeMessenger {
    fn record_post(&self, post: &PrimaryPost) -> Result<PostHandle, MessagingError> {
        let failing = self
            .fail_primary
            .lock()
            .unwrap()
            .iter()
            .any(|title| post.title.ends_with(title.as_str()));
        if failing {
            return Err(rejected());
        }

        self.posts.lock().unwrap().push(post.clone());
        Ok(PostHandle {
            post_id: self.id(),
            parent_id: post.container_id.clone(),
        })
    }

    fn record_notification(&self, channel_id: &str, body: &str) -> Result<String, MessagingError> {
        let failing = self
            .fail_notification
            .lock()
            .unwrap()
            .iter()
            .any(|title| body.contains(title.as_str()));
        if failing {
            return Err(rejected());
        }

        self.notifications
            .lock()
            .unwrap()
            .push((channel_id.to_string(), body.to_string()));
        Ok(self.id())
    }
}

/// Discord settings used by test publishers.
pub fn discord_config() -> DiscordConfig {
    DiscordConfig {
        token: "test-token".to_string(),
        guild_id: "1".to_string(),
        post_channel_id: "2".to_string(),
        notify_channel_id: "3".to_string(),
        notify_prefix: "New:".to_string(),
        ..DiscordConfig::default()
    }
}

/// Engine over the fakes with a 24 hour interval.
pub fn engine(feed: Arc<FakeFeed>, messenger: Arc<FakeMessenger>) -> SyncEngine {
    let publisher = Publisher::new(messenger, &discord_config());
    SyncEngine::new(feed, publisher, Duration::hours(INTERVAL_HOURS))
}
