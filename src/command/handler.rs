//! Operator command execution.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::parser::{format_help, Command};
use crate::config::Config;
use crate::datetime::{format_rfc822z, format_utc_datetime, hours_between};
use crate::error::Result;
use crate::feed::FeedSnapshot;
use crate::messaging::channel_link;
use crate::scheduler::CronScheduler;
use crate::sync::{CycleReport, PublishClock, SyncEngine, VisitStatus, VisitedRegistry};

/// Reply when a cycle found nothing to post.
pub const NOTHING_TO_POST: &str = "No new items in feed to post.";

const CRON_LEGEND: &str = "\
* * * * * *
| | | | | +----- day of the week (1 - 7) (Sunday is 1, or SUN-SAT)
| | | | +------- month (1 - 12)
| | | +--------- day of the month (1 - 31)
| | +----------- hour (0 - 23)
| +------------- minute (0 - 59)
+--------------- second (0 - 59)
";

/// Marker shown in front of a feed item by `checkfeed`.
pub fn status_marker(status: VisitStatus) -> &'static str {
    match status {
        VisitStatus::Posted => "✅",
        VisitStatus::Unseen => "⭕",
        VisitStatus::SeenAtStartup => "🔷",
        VisitStatus::SeenNotNew | VisitStatus::Pending => "🔴",
    }
}

/// Render the gate and schedule status.
pub fn format_status(
    now: DateTime<Utc>,
    clock: &PublishClock,
    interval: Duration,
    last_run: Option<DateTime<Utc>>,
    next_run: Option<DateTime<Utc>>,
) -> String {
    let mut out = String::new();
    let last_published = clock.last_published();

    match clock.opens_at(interval) {
        Some(until) if now > until => {
            let _ = writeln!(
                out,
                "⏳ Waiting for new posts since `{}`, `{:.2}` hours ago.",
                format_rfc822z(&until),
                hours_between(&until, &now)
            );
        }
        Some(until) => {
            let _ = writeln!(
                out,
                "⏰ Sleeping until `{}` in `{:.2}` hours.",
                format_rfc822z(&until),
                hours_between(&now, &until)
            );
        }
        None => out.push_str("⏰ Sleeping indefinitely.\n"),
    }

    let _ = writeln!(
        out,
        "🗓️ Last Published on `{}`, `{:.2}` hours ago.",
        format_rfc822z(&last_published),
        hours_between(&last_published, &now)
    );

    let fmt_opt = |at: Option<DateTime<Utc>>| at.map_or_else(|| "never".to_string(), |t| format_rfc822z(&t));
    let _ = writeln!(out, "⏮️ Previous check ran at `{}`.", fmt_opt(last_run));
    let _ = writeln!(out, "⏭️ Next check scheduled for `{}`.", fmt_opt(next_run));

    out
}

/// Render a manual cycle result.
pub fn format_cycle(report: &CycleReport, feed_url: &str) -> String {
    match report {
        CycleReport::FetchFailed(_) => format!("Can't query feed '{feed_url}'."),
        CycleReport::Baseline { tracked } => {
            format!("Took a baseline of {tracked} items; nothing posted.")
        }
        CycleReport::GateClosed { .. } => "Skipped: inside the post interval.".to_string(),
        CycleReport::Completed(summary) if summary.attempts.is_empty() => NOTHING_TO_POST.to_string(),
        CycleReport::Completed(summary) => summary
            .attempts
            .iter()
            .map(|attempt| {
                if attempt.is_complete() {
                    format!("Posted '{}'.", attempt.title)
                } else if attempt.is_posted() {
                    format!("Posted '{}' (notification failed).", attempt.title)
                } else {
                    format!("Failed '{}'.", attempt.title)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Executes operator commands against the running engine.
pub struct CommandHandler {
    engine: Arc<SyncEngine>,
    scheduler: Arc<CronScheduler>,
    config: Config,
}

impl CommandHandler {
    /// Create a handler.
    pub fn new(engine: Arc<SyncEngine>, scheduler: Arc<CronScheduler>, config: Config) -> Self {
        Self {
            engine,
            scheduler,
            config,
        }
    }

    /// Parse and execute one input line on behalf of `user`.
    pub async fn handle_line(&self, user: &str, line: &str) -> Result<String> {
        let command = Command::parse(line)?;
        Ok(self.execute(user, &command).await)
    }

    /// Execute a parsed command.
    pub async fn execute(&self, user: &str, command: &Command) -> String {
        info!("{} ran ./{}", user, command.name());

        match command {
            Command::Ping => format!("Pong! `Version {}`", env!("CARGO_PKG_VERSION")),
            Command::Status => self.status().await,
            Command::CheckFeed { count, header } => self.check_feed(*count as usize, *header).await,
            Command::CheckConfig => self.check_config(),
            Command::PostLatest => {
                let report = self.engine.post_latest().await;
                format_cycle(&report, &self.config.feed.url)
            }
            Command::PostNew => {
                let report = self.engine.post_new().await;
                format_cycle(&report, &self.config.feed.url)
            }
            Command::Help => format_help(),
        }
    }

    async fn status(&self) -> String {
        let state = self.engine.inspect().await;
        format_status(
            Utc::now(),
            &state.clock,
            self.engine.interval(),
            self.scheduler.last_run().await,
            self.scheduler.next_run(),
        )
    }

    async fn check_feed(&self, count: usize, header: bool) -> String {
        let snapshot = match self.engine.peek().await {
            Ok(snapshot) => snapshot,
            Err(_) => return format!("Can't query feed '{}'.", self.config.feed.url),
        };
        let state = self.engine.inspect().await;
        self.format_feed(&snapshot, &state.registry, count, header)
    }

    fn format_feed(
        &self,
        snapshot: &FeedSnapshot,
        registry: &VisitedRegistry,
        count: usize,
        header: bool,
    ) -> String {
        if snapshot.is_empty() {
            return "No items in feed.".to_string();
        }

        let mut out = String::new();
        if header {
            out.push_str("```\n");
            for (name, value) in &snapshot.headers {
                let _ = writeln!(out, "{name}: {value}");
            }
            out.push_str("```\n");
        }

        let discord = &self.config.discord;
        for (i, item) in snapshot.items.iter().take(count).enumerate() {
            let _ = writeln!(
                out,
                "{}. {} - {} - **{}**. *({})*",
                i,
                status_marker(registry.status(&item.id)),
                format_utc_datetime(&item.published_at, &discord.timezone, &discord.time_format),
                item.title,
                item.id
            );
        }
        if snapshot.items.len() > count {
            let _ = write!(out, "*{} more...*", snapshot.items.len() - count);
        }
        out
    }

    fn check_config(&self) -> String {
        let feed = &self.config.feed;
        let discord = &self.config.discord;

        let mut out = String::from("```\n");
        let _ = writeln!(
            out,
            "Post to {}",
            channel_link(&discord.guild_id, &discord.post_channel_id)
        );
        let _ = writeln!(
            out,
            "Notify to {}",
            channel_link(&discord.guild_id, &discord.notify_channel_id)
        );
        let _ = writeln!(out, "Feed Source `{}`", feed.url);
        let _ = writeln!(out, "Notify Prefix `{}`", discord.notify_prefix);
        let _ = writeln!(out, "TimeFormat `{}`", discord.time_format);
        let _ = writeln!(out, "Post Interval every `{}` hours", feed.post_interval_hours);
        out.push_str("Cron Job Schedule\n");
        let _ = writeln!(out, "{}", feed.cron_schedule);
        out.push_str(CRON_LEGEND);
        out.push_str("```\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FetchError;
    use crate::messaging::{MessagingError, PostHandle};
    use crate::sync::{CycleSummary, ItemReport, PublishError, PublishReceipt};
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, min, 0).unwrap()
    }

    fn handle() -> PostHandle {
        PostHandle {
            post_id: "3".to_string(),
            parent_id: "2".to_string(),
        }
    }

    fn report(title: &str, result: std::result::Result<PublishReceipt, PublishError>) -> ItemReport {
        ItemReport {
            id: title.to_lowercase(),
            title: title.to_string(),
            result,
        }
    }

    #[test]
    fn test_status_markers() {
        assert_eq!(status_marker(VisitStatus::Posted), "✅");
        assert_eq!(status_marker(VisitStatus::Unseen), "⭕");
        assert_eq!(status_marker(VisitStatus::SeenAtStartup), "🔷");
        assert_eq!(status_marker(VisitStatus::SeenNotNew), "🔴");
        assert_eq!(status_marker(VisitStatus::Pending), "🔴");
    }

    #[test]
    fn test_format_status_sleeping() {
        let mut clock = PublishClock::new();
        clock.record_publish(at(0, 0));

        let text = format_status(at(4, 30), &clock, Duration::hours(6), None, Some(at(5, 0)));
        assert!(text.starts_with("⏰ Sleeping until `01 May 24 06:00 +0000` in `1.50` hours."));
        assert!(text.contains("Last Published on `01 May 24 00:00 +0000`, `4.50` hours ago."));
        assert!(text.contains("Previous check ran at `never`."));
        assert!(text.contains("Next check scheduled for `01 May 24 05:00 +0000`."));
    }

    #[test]
    fn test_format_status_waiting() {
        let mut clock = PublishClock::new();
        clock.record_publish(at(0, 0));

        let text = format_status(at(7, 0), &clock, Duration::hours(6), Some(at(7, 0)), None);
        assert!(text.starts_with("⏳ Waiting for new posts since `01 May 24 06:00 +0000`, `1.00` hours ago."));
        assert!(text.contains("Previous check ran at `01 May 24 07:00 +0000`."));
    }

    #[test]
    fn test_format_cycle_fetch_failed() {
        let report = CycleReport::FetchFailed(FetchError::Status(500));
        assert_eq!(
            format_cycle(&report, "https://example.com/feed"),
            "Can't query feed 'https://example.com/feed'."
        );
    }

    #[test]
    fn test_format_cycle_nothing_to_post() {
        let report = CycleReport::Completed(CycleSummary::default());
        assert_eq!(format_cycle(&report, ""), NOTHING_TO_POST);
    }

    #[test]
    fn test_format_cycle_outcomes() {
        let summary = CycleSummary {
            attempts: vec![
                report(
                    "One",
                    Ok(PublishReceipt {
                        post: handle(),
                        notification_id: "9".to_string(),
                    }),
                ),
                report(
                    "Two",
                    Err(PublishError::Notification {
                        post: handle(),
                        source: MessagingError::InvalidResponse("x".to_string()),
                    }),
                ),
                report(
                    "Three",
                    Err(PublishError::PrimaryPost(MessagingError::InvalidResponse(
                        "x".to_string(),
                    ))),
                ),
            ],
            tracked: 3,
            evicted: 0,
        };
        assert_eq!(
            format_cycle(&CycleReport::Completed(summary), ""),
            "Posted 'One'.\nPosted 'Two' (notification failed).\nFailed 'Three'."
        );
    }
}
