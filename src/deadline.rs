//! Monotonic wake-up points for the sequencer loops

use embassy_time::{Duration, Instant};

/// "Act no later than this instant", or never.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Deadline {
    Never,
    At(Instant),
}

impl Deadline {
    /// Deadline `after` from `now`; saturates to [`Deadline::Never`] on overflow
    pub fn after(now: Instant, after: Duration) -> Self {
        now.checked_add(after).map_or(Deadline::Never, Deadline::At)
    }

    /// Whether the deadline has been reached at `now` (inclusive)
    pub fn expired(&self, now: Instant) -> bool {
        match self {
            Deadline::Never => false,
            Deadline::At(at) => now >= *at,
        }
    }

    /// Wait time from `now`. `None` means wait without bound.
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        match self {
            Deadline::Never => None,
            Deadline::At(at) => Some(at.saturating_duration_since(now)),
        }
    }
}
