//! Publish gate.

use chrono::{DateTime, Duration, Utc};

/// Whether an automatic cycle may publish.
///
/// Open strictly after `last_published + interval`. An interval too large to
/// represent keeps the gate closed.
pub fn may_auto_publish(now: DateTime<Utc>, last_published: DateTime<Utc>, interval: Duration) -> bool {
    last_published
        .checked_add_signed(interval)
        .is_some_and(|opens_at| now > opens_at)
}

/// Timestamp of the last successful primary post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishClock {
    last_published: DateTime<Utc>,
}

impl Default for PublishClock {
    fn default() -> Self {
        Self {
            last_published: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl PublishClock {
    /// Clock that has never seen a publication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded publication time.
    pub fn last_published(&self) -> DateTime<Utc> {
        self.last_published
    }

    /// Move the clock forward to `at` if it is newer.
    pub fn seed(&mut self, at: DateTime<Utc>) {
        if at > self.last_published {
            self.last_published = at;
        }
    }

    /// Record a publication. Last write wins, even when `at` is older.
    pub fn record_publish(&mut self, at: DateTime<Utc>) {
        self.last_published = at;
    }

    /// Moment after which the gate opens.
    pub fn opens_at(&self, interval: Duration) -> Option<DateTime<Utc>> {
        self.last_published.checked_add_signed(interval)
    }

    /// Gate check against this clock.
    pub fn may_auto_publish(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        may_auto_publish(now, self.last_published, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, sec).unwrap()
    }

    #[test]
    fn test_gate_boundary() {
        let last = at(0, 0);
        let interval = Duration::hours(6);

        assert!(!may_auto_publish(at(6, 0), last, interval));
        assert!(may_auto_publish(at(6, 1), last, interval));
        assert!(!may_auto_publish(at(3, 0), last, interval));
    }

    #[test]
    fn test_gate_zero_interval() {
        let last = at(1, 0);
        assert!(!may_auto_publish(last, last, Duration::zero()));
        assert!(may_auto_publish(at(1, 1), last, Duration::zero()));
    }

    #[test]
    fn test_gate_overflow_stays_closed() {
        assert!(!may_auto_publish(at(1, 0), DateTime::<Utc>::MAX_UTC, Duration::hours(1)));
    }

    #[test]
    fn test_fresh_clock_is_open() {
        let clock = PublishClock::new();
        assert_eq!(clock.last_published(), DateTime::<Utc>::UNIX_EPOCH);
        assert!(clock.may_auto_publish(at(0, 0), Duration::hours(24)));
    }

    #[test]
    fn test_seed_only_moves_forward() {
        let mut clock = PublishClock::new();
        clock.seed(at(5, 0));
        clock.seed(at(2, 0));
        assert_eq!(clock.last_published(), at(5, 0));
    }

    #[test]
    fn test_record_publish_last_write_wins() {
        let mut clock = PublishClock::new();
        clock.record_publish(at(5, 0));
        clock.record_publish(at(2, 0));
        assert_eq!(clock.last_published(), at(2, 0));
        assert_eq!(clock.opens_at(Duration::hours(1)), Some(at(3, 0)));
    }
}
