//! Date/time utilities for herald.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// RFC 822 layout with a numeric zone, e.g. `15 Jan 24 10:30 +0000`.
pub const RFC822Z: &str = "%d %b %y %H:%M %z";

/// Check whether a strftime format string only contains known specifiers.
pub fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Format a DateTime<Utc> in the given timezone.
///
/// Unknown timezones fall back to UTC. An invalid format string yields
/// RFC 3339 instead of panicking.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let mut out = String::new();
    let written = match timezone.parse::<Tz>() {
        Ok(tz) => write!(out, "{}", dt.with_timezone(&tz).format(format)),
        Err(_) => write!(out, "{}", dt.format(format)),
    };
    if written.is_err() {
        return dt.to_rfc3339();
    }
    out
}

/// Format a DateTime<Utc> as RFC 822 with numeric zone.
pub fn format_rfc822z(dt: &DateTime<Utc>) -> String {
    dt.format(RFC822Z).to_string()
}

/// Signed number of hours from `from` to `to`, with fractional part.
pub fn hours_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    to.signed_duration_since(*from).num_seconds() as f64 / 3600.0
}
