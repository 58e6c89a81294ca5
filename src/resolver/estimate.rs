use chrono::{DateTime, Utc};

use crate::config::{DRAW_EPOCH_RFC3339, WEEK_MS};

/// Wall-clock guess of the current round from the weekly draw cadence.
#[derive(Debug, Clone, Copy)]
pub struct RoundEstimator {
    epoch: DateTime<Utc>,
    week_ms: i64,
}

impl RoundEstimator {
    pub fn new(epoch: DateTime<Utc>, week_ms: i64) -> Self {
        Self { epoch, week_ms }
    }

    /// `floor((now - epoch) / week) + 1`, never below 1.
    pub fn estimate_at(&self, now: DateTime<Utc>) -> u32 {
        let elapsed_ms = now.signed_duration_since(self.epoch).num_milliseconds();
        if elapsed_ms < 0 || self.week_ms <= 0 {
            return 1;
        }
        u32::try_from(elapsed_ms / self.week_ms + 1).unwrap_or(u32::MAX)
    }

    pub fn estimate_now(&self) -> u32 {
        self.estimate_at(Utc::now())
    }
}

impl Default for RoundEstimator {
    fn default() -> Self {
        let epoch = DateTime::parse_from_rfc3339(DRAW_EPOCH_RFC3339)
            .expect("valid draw epoch")
            .with_timezone(&Utc);
        Self::new(epoch, WEEK_MS)
    }
}
