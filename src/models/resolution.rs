use chrono::Duration;
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Upper bound (exclusive) on `days_back` paired with the periods per day used
/// below it. Ranges at or past the last bound fall back to one period per day.
pub const RESOLUTION_THRESHOLDS: [(u32, u32); 5] = [
    (4, 96),
    (7, 48),
    (31, 24),
    (91, 12),
    (365, 6),
];

const COARSEST_PERIODS_PER_DAY: u32 = 1;

/// Number of decimation periods a calendar day is divided into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resolution(u32);

impl Resolution {
    /// Picks the resolution for a requested range so the rendered point count
    /// stays near 2 x 96 no matter how many days are requested.
    pub fn for_days_back(days_back: u32) -> Self {
        let periods = RESOLUTION_THRESHOLDS
            .iter()
            .find(|(limit, _)| days_back < *limit)
            .map(|(_, periods)| *periods)
            .unwrap_or(COARSEST_PERIODS_PER_DAY);
        Resolution(periods)
    }

    pub fn periods_per_day(self) -> u32 {
        self.0
    }

    pub fn period_width(self) -> Duration {
        Duration::seconds(SECONDS_PER_DAY / i64::from(self.0.max(1)))
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
