//! Feed source backed by HTTP.
//!
//! Fetches an RSS/Atom document with `reqwest`, parses it with `feed-rs` and
//! turns the entries into a [`FeedSnapshot`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::header::{HeaderMap, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::FeedConfig;
use crate::feed::types::{FeedItem, FeedSnapshot, MAX_FEED_SIZE};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Errors raised while fetching or parsing the feed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// Transport failure.
    #[error("failed to fetch feed: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP error: {0}")]
    Status(u16),

    /// Response exceeded [`MAX_FEED_SIZE`].
    #[error("feed too large: {0} bytes (max {max} bytes)", max = MAX_FEED_SIZE)]
    TooLarge(u64),

    /// Document is not a valid RSS/Atom feed.
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// Source of feed snapshots.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Read the feed once.
    async fn fetch(&self) -> Result<FeedSnapshot, FetchError>;
}

/// Feed source reading a single URL over HTTP.
pub struct HttpFeedSource {
    client: Client,
    url: String,
    no_cache: bool,
}

impl HttpFeedSource {
    /// Create a source from the feed configuration.
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            no_cache: config.no_cache,
        })
    }

    /// The feed URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<FeedSnapshot, FetchError> {
        let mut request = self.client.get(&self.url);
        if self.no_cache {
            request = request
                .header(PRAGMA, "no-cache")
                .header(CACHE_CONTROL, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_FEED_SIZE {
                return Err(FetchError::TooLarge(content_length));
            }
        }

        let headers = collect_headers(response.headers());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("failed to read response: {e}")))?;

        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(FetchError::TooLarge(bytes.len() as u64));
        }

        let mut snapshot = parse_feed(&bytes)?;
        snapshot.headers = headers;
        debug!(url = %self.url, items = snapshot.items.len(), "fetched feed");
        Ok(snapshot)
    }
}

/// Flatten response headers into a sorted map, joining repeated names.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}

/// Parse feed bytes into a snapshot.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedSnapshot, FetchError> {
    let feed = parser::parse(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    let title = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled Feed".to_string());

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let description = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|d| html_to_text(&d))
                .unwrap_or_default();

            FeedItem {
                id: entry.id,
                title: entry
                    .title
                    .map(|t| t.content)
                    .unwrap_or_else(|| "Untitled".to_string()),
                links: entry.links.into_iter().map(|l| l.href).collect(),
                description,
                published_at: entry
                    .published
                    .or(entry.updated)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            }
        })
        .collect();

    Ok(FeedSnapshot {
        title,
        items,
        headers: BTreeMap::new(),
    })
}

/// Longest entity name looked at after an `&`.
const MAX_ENTITY_LEN: usize = 12;

/// Elements whose end starts a new line of text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "tr", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Plain text of an item description.
///
/// Markup is dropped, `<br>` and closing block elements become line breaks
/// and entities are decoded. An `&` that starts no known entity is kept as
/// is. Whitespace inside a line collapses to one space; blank lines go.
fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(pos) = rest.find(|c: char| c == '<' || c == '&') {
        text.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('<') {
            let Some(end) = rest.find('>') else {
                // unterminated tag
                rest = "";
                break;
            };
            if breaks_line(&rest[1..end]) {
                text.push('\n');
            }
            rest = &rest[end + 1..];
        } else {
            let entity = rest[1..]
                .char_indices()
                .take(MAX_ENTITY_LEN + 1)
                .find(|&(_, c)| c == ';')
                .and_then(|(end, _)| decode_entity(&rest[1..end + 1]).map(|c| (c, end + 2)));
            match entity {
                Some((c, len)) => {
                    text.push(c);
                    rest = &rest[len..];
                }
                None => {
                    text.push('&');
                    rest = &rest[1..];
                }
            }
        }
    }
    text.push_str(rest);

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether the tag body (text between `<` and `>`) ends a line.
fn breaks_line(tag: &str) -> bool {
    let tag = tag.trim();
    let (closing, tag) = match tag.strip_prefix('/') {
        Some(name) => (true, name),
        None => (false, tag),
    };
    let name: String = tag
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    name == "br" || (closing && BLOCK_TAGS.contains(&name.as_str()))
}

/// Character for an entity name such as `amp`, `#39` or `#x27`.
fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
