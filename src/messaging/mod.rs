//! Messaging destination for published feed items.
//!
//! The sync engine only talks to a [`MessagingClient`]. [`DiscordClient`]
//! implements it over the Discord REST API.

pub mod discord;

use async_trait::async_trait;
use thiserror::Error;

pub use discord::{channel_link, post_link, DiscordClient};

/// Errors returned by a messaging client.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform rejected the request.
    #[error("request rejected with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the platform.
        body: String,
    },

    /// The platform answered with something we could not read.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A primary post to create on the destination's content surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryPost {
    /// Container (forum channel) receiving the post.
    pub container_id: String,
    /// Post title.
    pub title: String,
    /// Post body.
    pub body: String,
    /// Minutes of inactivity before the post is archived.
    pub archive_duration_minutes: u32,
}

/// Identifiers of a created primary post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHandle {
    /// ID of the post itself.
    pub post_id: String,
    /// ID of the container the post lives in.
    pub parent_id: String,
}

/// Client for the messaging destination.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Create a primary post.
    async fn create_primary_post(&self, post: &PrimaryPost) -> Result<PostHandle, MessagingError>;

    /// Send a plain message to a channel, returning the message ID.
    async fn send_notification(&self, channel_id: &str, body: &str)
        -> Result<String, MessagingError>;
}
