//! herald - feed to Discord forum relay
//!
//! Polls an RSS/Atom feed on a cron schedule and publishes new items as
//! Discord forum posts, each followed by an announcement in a notify channel.

pub mod command;
pub mod config;
pub mod datetime;
pub mod error;
pub mod feed;
pub mod logging;
pub mod messaging;
pub mod scheduler;
pub mod sync;

pub use command::{Command, CommandError, CommandHandler};
pub use config::Config;
pub use error::{HeraldError, Result};
pub use feed::{FeedItem, FeedSnapshot, FeedSource, FetchError, HttpFeedSource};
pub use messaging::{DiscordClient, MessagingClient, MessagingError, PostHandle, PrimaryPost};
pub use scheduler::CronScheduler;
pub use sync::{
    CycleReport, PublishClock, PublishError, Publisher, SyncEngine, VisitStatus, VisitedRegistry,
};
