//! Configuration module for herald.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::sync::TRUNCATION_SUFFIX;
use crate::{HeraldError, Result};

/// Environment variable that overrides `discord.token`.
pub const TOKEN_ENV_VAR: &str = "HERALD_DISCORD_TOKEN";

/// Feed polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// URL of the RSS/Atom feed.
    #[serde(default)]
    pub url: String,
    /// Six-field cron expression (seconds first) for automatic checks.
    #[serde(default = "default_cron_schedule")]
    pub cron_schedule: String,
    /// Minimum number of hours between automatic publications.
    #[serde(default = "default_post_interval_hours")]
    pub post_interval_hours: u64,
    /// Ask intermediate caches for a fresh copy of the feed.
    #[serde(default)]
    pub no_cache: bool,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// User agent sent with feed requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_cron_schedule() -> String {
    "0 0 * * * *".to_string()
}

fn default_post_interval_hours() -> u64 {
    24
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("herald/{} (feed relay)", env!("CARGO_PKG_VERSION"))
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cron_schedule: default_cron_schedule(),
            post_interval_hours: default_post_interval_hours(),
            no_cache: false,
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl FeedConfig {
    /// Post interval as a chrono duration.
    ///
    /// Fails when the hour count does not fit a `chrono::Duration`.
    pub fn post_interval(&self) -> Result<chrono::Duration> {
        i64::try_from(self.post_interval_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .ok_or_else(|| {
                HeraldError::Validation(format!(
                    "post_interval_hours out of range: {}",
                    self.post_interval_hours
                ))
            })
    }
}

/// Discord destination configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token.
    #[serde(default)]
    pub token: String,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Guild (server) ID, used to build message links.
    #[serde(default)]
    pub guild_id: String,
    /// Forum channel receiving one post per feed item.
    #[serde(default)]
    pub post_channel_id: String,
    /// Text channel receiving the announcement for each post.
    #[serde(default)]
    pub notify_channel_id: String,
    /// Auto-archive duration of forum posts in minutes.
    #[serde(default = "default_archive_duration")]
    pub archive_duration_minutes: u32,
    /// Text placed before the post link in announcements.
    #[serde(default)]
    pub notify_prefix: String,
    /// strftime format for the publish date in post titles.
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Timezone used when formatting publish dates (e.g., "UTC", "Europe/Berlin").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Maximum post title length in characters.
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    /// Maximum message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Request timeout in seconds.
    #[serde(default = "default_discord_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_archive_duration() -> u32 {
    1440 // 24 hours
}

fn default_time_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_max_title_length() -> usize {
    100
}

fn default_max_message_length() -> usize {
    2000
}

fn default_discord_timeout() -> u64 {
    15
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            guild_id: String::new(),
            post_channel_id: String::new(),
            notify_channel_id: String::new(),
            archive_duration_minutes: default_archive_duration(),
            notify_prefix: String::new(),
            time_format: default_time_format(),
            timezone: default_timezone(),
            max_title_length: default_max_title_length(),
            max_message_length: default_max_message_length(),
            timeout_secs: default_discord_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/herald.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Discord configuration.
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HeraldError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| HeraldError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `HERALD_DISCORD_TOKEN`: Override the bot token
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.is_empty() {
                self.discord.token = token;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let feed_url = url::Url::parse(&self.feed.url)
            .map_err(|e| HeraldError::Validation(format!("invalid feed url: {e}")))?;
        if !matches!(feed_url.scheme(), "http" | "https") {
            return Err(HeraldError::Validation(format!(
                "unsupported feed url scheme: {}",
                feed_url.scheme()
            )));
        }

        cron::Schedule::from_str(&self.feed.cron_schedule).map_err(|e| {
            HeraldError::Validation(format!(
                "invalid cron schedule '{}': {e}",
                self.feed.cron_schedule
            ))
        })?;

        self.feed.post_interval()?;

        let required = [
            ("discord.token", &self.discord.token),
            ("discord.guild_id", &self.discord.guild_id),
            ("discord.post_channel_id", &self.discord.post_channel_id),
            ("discord.notify_channel_id", &self.discord.notify_channel_id),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(HeraldError::Validation(format!("{name} is not set")));
            }
        }

        let suffix_len = TRUNCATION_SUFFIX.chars().count();
        if self.discord.max_title_length <= suffix_len
            || self.discord.max_message_length <= suffix_len
        {
            return Err(HeraldError::Validation(format!(
                "length limits must be greater than {suffix_len}"
            )));
        }

        self.discord
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| {
                HeraldError::Validation(format!("unknown timezone: {}", self.discord.timezone))
            })?;

        if !crate::datetime::is_valid_format(&self.discord.time_format) {
            return Err(HeraldError::Validation(format!(
                "invalid time format: {}",
                self.discord.time_format
            )));
        }

        Ok(())
    }
}
