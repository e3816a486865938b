//! Two-stage publication of a feed item.
//!
//! Stage one creates the forum post. It is the durability boundary: once it
//! succeeds the item counts as published and the clock moves, whatever
//! happens to the announcement in stage two.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::DiscordConfig;
use crate::datetime::format_utc_datetime;
use crate::feed::FeedItem;
use crate::messaging::{post_link, MessagingClient, MessagingError, PostHandle, PrimaryPost};
use crate::sync::gate::PublishClock;

/// Appended to truncated text.
pub const TRUNCATION_SUFFIX: &str = "...";

/// Shorten `text` to at most `max` characters, ending in [`TRUNCATION_SUFFIX`]
/// when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(TRUNCATION_SUFFIX.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_SUFFIX);
    out
}

/// Successful two-stage publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// The created post.
    pub post: PostHandle,
    /// ID of the announcement message.
    pub notification_id: String,
}

/// Publication failure.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The post was not created; nothing was published.
    #[error("primary post failed: {0}")]
    PrimaryPost(#[source] MessagingError),

    /// The post exists but its announcement could not be sent.
    #[error("post {post_id} created but notification failed: {source}", post_id = .post.post_id)]
    Notification {
        /// The created post.
        post: PostHandle,
        /// Why the announcement failed.
        source: MessagingError,
    },
}

impl PublishError {
    /// Whether the primary post went through.
    pub fn is_posted(&self) -> bool {
        matches!(self, PublishError::Notification { .. })
    }
}

/// Formats and publishes feed items.
pub struct Publisher {
    client: Arc<dyn MessagingClient>,
    guild_id: String,
    post_channel_id: String,
    notify_channel_id: String,
    notify_prefix: String,
    time_format: String,
    timezone: String,
    archive_duration_minutes: u32,
    max_title_length: usize,
    max_message_length: usize,
}

impl Publisher {
    /// Create a publisher from the Discord configuration.
    pub fn new(client: Arc<dyn MessagingClient>, config: &DiscordConfig) -> Self {
        Self {
            client,
            guild_id: config.guild_id.clone(),
            post_channel_id: config.post_channel_id.clone(),
            notify_channel_id: config.notify_channel_id.clone(),
            notify_prefix: config.notify_prefix.clone(),
            time_format: config.time_format.clone(),
            timezone: config.timezone.clone(),
            archive_duration_minutes: config.archive_duration_minutes,
            max_title_length: config.max_title_length,
            max_message_length: config.max_message_length,
        }
    }

    /// Post title: `"<publish time> - <title>"`.
    pub fn compose_title(&self, item: &FeedItem) -> String {
        let published = format_utc_datetime(&item.published_at, &self.timezone, &self.time_format);
        truncate(
            &format!("{} - {}", published, item.title),
            self.max_title_length,
        )
    }

    /// Post body: one link per line, then the description.
    pub fn compose_body(&self, item: &FeedItem) -> String {
        let mut body = String::new();
        for link in &item.links {
            body.push_str(link);
            body.push('\n');
        }
        body.push_str(&item.description);
        body.push('\n');
        truncate(&body, self.max_message_length)
    }

    /// Announcement linking to the created post.
    pub fn compose_notification(&self, item: &FeedItem, post: &PostHandle) -> String {
        truncate(
            &format!(
                "{} {}\n{}",
                self.notify_prefix,
                post_link(&self.guild_id, &post.parent_id, &post.post_id),
                item.title
            ),
            self.max_message_length,
        )
    }

    /// Publish one item.
    ///
    /// `clock` is set to the item's publish time as soon as the post exists.
    pub async fn publish(
        &self,
        item: &FeedItem,
        clock: &mut PublishClock,
    ) -> Result<PublishReceipt, PublishError> {
        info!(id = %item.id, title = %item.title, "posting feed item");

        let post = PrimaryPost {
            container_id: self.post_channel_id.clone(),
            title: self.compose_title(item),
            body: self.compose_body(item),
            archive_duration_minutes: self.archive_duration_minutes,
        };

        let handle = match self.client.create_primary_post(&post).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(id = %item.id, title = %post.title, error = %e, "failed to create post");
                return Err(PublishError::PrimaryPost(e));
            }
        };
        info!(id = %item.id, post_id = %handle.post_id, title = %post.title, "created post");

        clock.record_publish(item.published_at);

        let body = self.compose_notification(item, &handle);
        match self
            .client
            .send_notification(&self.notify_channel_id, &body)
            .await
        {
            Ok(notification_id) => {
                info!(id = %item.id, message_id = %notification_id, "sent notification");
                Ok(PublishReceipt {
                    post: handle,
                    notification_id,
                })
            }
            Err(e) => {
                warn!(id = %item.id, post_id = %handle.post_id, error = %e, "failed to send notification");
                Err(PublishError::Notification {
                    post: handle,
                    source: e,
                })
            }
        }
    }
}
