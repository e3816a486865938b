//! Discord REST client.
//!
//! Forum posts are created with `POST /channels/{forum}/threads` and
//! announcements with `POST /channels/{channel}/messages`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{MessagingClient, MessagingError, PostHandle, PrimaryPost};
use crate::config::DiscordConfig;

/// Base of user-facing Discord links.
const WEB_BASE: &str = "https://discord.com/channels";

/// Link to a channel.
pub fn channel_link(guild_id: &str, channel_id: &str) -> String {
    format!("{WEB_BASE}/{guild_id}/{channel_id}")
}

/// Link to a post (thread) inside a forum channel.
pub fn post_link(guild_id: &str, parent_id: &str, post_id: &str) -> String {
    format!("{WEB_BASE}/{guild_id}/{parent_id}/{post_id}")
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

/// Discord bot client using the REST API.
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordClient {
    /// Create a client from the Discord configuration.
    pub fn new(config: &DiscordConfig) -> Result<Self, MessagingError> {
        if config.token.is_empty() {
            return Err(MessagingError::InvalidConfig("bot token is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// The REST API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<T, MessagingError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .json(payload)
            .send()
            .await?;

        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, MessagingError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(MessagingError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| MessagingError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl MessagingClient for DiscordClient {
    async fn create_primary_post(&self, post: &PrimaryPost) -> Result<PostHandle, MessagingError> {
        let payload = serde_json::json!({
            "name": post.title,
            "auto_archive_duration": post.archive_duration_minutes,
            "message": { "content": post.body },
        });

        let channel: ChannelResponse = self
            .post_json(&format!("/channels/{}/threads", post.container_id), &payload)
            .await?;
        debug!(post_id = %channel.id, "created forum post");

        Ok(PostHandle {
            parent_id: channel
                .parent_id
                .unwrap_or_else(|| post.container_id.clone()),
            post_id: channel.id,
        })
    }

    async fn send_notification(
        &self,
        channel_id: &str,
        body: &str,
    ) -> Result<String, MessagingError> {
        let payload = serde_json::json!({ "content": body });

        let message: MessageResponse = self
            .post_json(&format!("/channels/{channel_id}/messages"), &payload)
            .await?;
        debug!(message_id = %message.id, "sent notification");

        Ok(message.id)
    }
}
