//! Feed reading for herald.
//!
//! A [`FeedSource`] produces [`FeedSnapshot`]s; [`HttpFeedSource`] is the
//! production implementation.

pub mod fetcher;
pub mod types;

pub use fetcher::{parse_feed, FeedSource, FetchError, HttpFeedSource};
pub use types::{FeedItem, FeedSnapshot, MAX_FEED_SIZE};
