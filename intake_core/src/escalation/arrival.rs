//! Arrival estimate - the promised time until the physician arrives.

use chrono::{DateTime, Duration, Utc};
use intake_protocol::ArrivalWindow;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A committed arrival estimate. Never re-rolled while it is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalEstimate {
    pub committed_at: DateTime<Utc>,
    /// Minutes promised at commit time.
    pub minutes: u32,
    pub expected_at: DateTime<Utc>,
}

impl ArrivalEstimate {
    /// Create an estimate committed at `committed_at`.
    pub fn new(committed_at: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            committed_at,
            minutes,
            expected_at: committed_at + Duration::minutes(i64::from(minutes)),
        }
    }

    /// Draw a uniform estimate from the window.
    pub fn sample<R: Rng + ?Sized>(
        window: &ArrivalWindow,
        committed_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let minutes = rng.gen_range(window.min_minutes..=window.max_minutes);
        Self::new(committed_at, minutes)
    }

    /// True once `expected_at` has passed; the promise is no longer in flight.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expected_at
    }

    /// Whole minutes left, rounded up and never below one.
    pub fn minutes_remaining(&self, now: DateTime<Utc>) -> u32 {
        let seconds = (self.expected_at - now).num_seconds();
        if seconds <= 60 {
            return 1;
        }
        u32::try_from((seconds + 59) / 60).unwrap_or(u32::MAX)
    }
}
