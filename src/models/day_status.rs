use chrono::NaiveDate;
use serde::Serialize;

/// How one day of a history request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOutcome {
    /// Served from the day cache without touching the source.
    Cached,
    /// Decimated from source readings.
    Computed,
    /// The source had no valid readings for the day.
    Empty,
    /// The source query failed or the unit did not finish.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub outcome: DayOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayTally {
    pub cached: usize,
    pub computed: usize,
    pub empty: usize,
    pub failed: usize,
}

impl DayTally {
    pub fn from_statuses(statuses: &[DayStatus]) -> Self {
        statuses.iter().fold(Self::default(), |mut tally, status| {
            match status.outcome {
                DayOutcome::Cached => tally.cached += 1,
                DayOutcome::Computed => tally.computed += 1,
                DayOutcome::Empty => tally.empty += 1,
                DayOutcome::Failed => tally.failed += 1,
            }
            tally
        })
    }
}
