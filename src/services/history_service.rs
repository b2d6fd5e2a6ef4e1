//! Sensor History Service
//!
//! Builds the chart dataset for one sensor over the last `days_back` days
//! (today included, so `days_back + 1` calendar days in UTC).
//!
//! # Request flow
//!
//! 1. Capture "now" once; every decision in the request uses that snapshot.
//! 2. Pick the resolution from `days_back` (see `Resolution::for_days_back`).
//! 3. Spawn one unit per day into a `JoinSet` scoped to the request. A
//!    semaphore of `pool_width` permits bounds how many run at once.
//! 4. Each unit checks the day cache (closed days only), otherwise queries the
//!    source and decimates, writing closed days back to the cache.
//! 5. Results land in a slot per day position, so the merge is chronological
//!    whatever order the units finish in.
//! 6. Days without data or with a failed query are left out. If nothing is
//!    left, the result is `Dataset::NoData`.
//! 7. Timestamps are converted to the display timezone last.
//!
//! A failing unit never fails the request; it is logged and recorded as
//! `DayOutcome::Failed` in the per-request status list.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::HistoryConfig;
use crate::errors::HistoryError;
use crate::external::cache_store::CacheStore;
use crate::external::time_series_source::TimeSeriesSource;
use crate::models::{
    DayOutcome, DayResult, DayStatus, DayTally, Dataset, DecimatedPoint, Resolution,
    RESOLUTION_THRESHOLDS,
};
use crate::services::day_cache::DayCache;
use crate::services::period_decimator::{day_end, day_start, decimate_day};

/// Longest range served in one request; larger requests are clamped.
pub const MAX_DAYS_BACK: u32 = 10 * 366;

/// Outcome of one history request, with the per-day bookkeeping kept.
#[derive(Debug, Clone)]
pub struct HistoryReport {
    pub dataset: Dataset,
    pub resolution: Resolution,
    /// One entry per requested day, oldest first.
    pub days: Vec<DayStatus>,
}

impl HistoryReport {
    pub fn tally(&self) -> DayTally {
        DayTally::from_statuses(&self.days)
    }
}

pub struct HistoryService {
    source: Arc<dyn TimeSeriesSource>,
    cache: DayCache,
    config: HistoryConfig,
}

impl HistoryService {
    pub fn new(
        source: Arc<dyn TimeSeriesSource>,
        cache_store: Arc<dyn CacheStore>,
        config: HistoryConfig,
    ) -> Result<Self, HistoryError> {
        config.validate()?;
        let cache = DayCache::new(cache_store).with_ttl(config.cache_ttl);
        Ok(Self {
            source,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub async fn get_history(&self, sensor_id: &str, days_back: u32) -> Dataset {
        self.get_history_at(sensor_id, days_back, Utc::now()).await
    }

    /// Same as `get_history` with an explicit snapshot of "now".
    pub async fn get_history_at(&self, sensor_id: &str, days_back: u32, now: DateTime<Utc>) -> Dataset {
        self.get_history_report(sensor_id, days_back, now).await.dataset
    }

    /// Histories for several sensors against one shared "now", in input order.
    pub async fn get_histories(&self, sensor_ids: &[&str], days_back: u32) -> Vec<Dataset> {
        self.get_histories_at(sensor_ids, days_back, Utc::now()).await
    }

    pub async fn get_histories_at(
        &self,
        sensor_ids: &[&str],
        days_back: u32,
        now: DateTime<Utc>,
    ) -> Vec<Dataset> {
        let mut datasets = Vec::with_capacity(sensor_ids.len());
        for sensor_id in sensor_ids {
            datasets.push(self.get_history_at(sensor_id, days_back, now).await);
        }
        datasets
    }

    pub async fn get_history_report(
        &self,
        sensor_id: &str,
        days_back: u32,
        now: DateTime<Utc>,
    ) -> HistoryReport {
        let started = std::time::Instant::now();

        let days_back = if days_back > MAX_DAYS_BACK {
            warn!("Clamping history for {} from {} to {} days back", sensor_id, days_back, MAX_DAYS_BACK);
            MAX_DAYS_BACK
        } else {
            days_back
        };

        let resolution = Resolution::for_days_back(days_back);
        let dates = range_dates(now, days_back);

        let (results, days) = self.run_day_units(sensor_id, &dates, resolution, now).await;

        let points: Vec<DecimatedPoint> = results
            .into_iter()
            .flatten()
            .flat_map(DayResult::into_points)
            .collect();

        let dataset = Dataset::from_points(sensor_id, points, self.config.display_timezone);
        let report = HistoryReport {
            dataset,
            resolution,
            days,
        };

        let tally = report.tally();
        if report.dataset.is_empty() {
            warn!("No data for {} over the last {} days", sensor_id, days_back);
        }
        info!(
            "History for {} ({} days back, {} periods/day): {} points, {} cached, {} computed, {} empty, {} failed in {} ms",
            sensor_id,
            days_back,
            resolution,
            report.dataset.points().len(),
            tally.cached,
            tally.computed,
            tally.empty,
            tally.failed,
            started.elapsed().as_millis()
        );

        report
    }

    /// Drop the cached entries of one day at every resolution.
    pub async fn invalidate_day(&self, sensor_id: &str, date: NaiveDate) -> Result<(), HistoryError> {
        let resolutions = RESOLUTION_THRESHOLDS
            .iter()
            .map(|(limit, _)| Resolution::for_days_back(limit - 1))
            .chain(std::iter::once(Resolution::for_days_back(MAX_DAYS_BACK)));

        for resolution in resolutions {
            self.cache.invalidate(sensor_id, date, resolution).await?;
        }
        info!("Invalidated cached history for {} on {}", sensor_id, date);
        Ok(())
    }

    async fn run_day_units(
        &self,
        sensor_id: &str,
        dates: &[NaiveDate],
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> (Vec<Option<DayResult>>, Vec<DayStatus>) {
        let sensor_id: Arc<str> = Arc::from(sensor_id);
        let permits = Arc::new(Semaphore::new(self.config.pool_width));

        // Dropping the set aborts whatever is still running, so no unit
        // outlives the request.
        let mut units = JoinSet::new();
        for (index, date) in dates.iter().copied().enumerate() {
            let permits = permits.clone();
            let source = self.source.clone();
            let cache = self.cache.clone();
            let sensor_id = sensor_id.clone();

            units.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (index, None, DayOutcome::Failed);
                };
                let (day, outcome) =
                    resolve_day(source.as_ref(), &cache, &sensor_id, date, resolution, now).await;
                (index, day, outcome)
            });
        }

        let mut results: Vec<Option<DayResult>> = vec![None; dates.len()];
        let mut statuses: Vec<DayStatus> = dates
            .iter()
            .map(|&date| DayStatus {
                date,
                outcome: DayOutcome::Failed,
            })
            .collect();

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((index, day, outcome)) => {
                    results[index] = day;
                    statuses[index].outcome = outcome;
                }
                Err(e) => {
                    error!("Day unit for {} did not complete: {}", sensor_id, e);
                }
            }
        }

        (results, statuses)
    }
}

/// Calendar days from `days_back` days before `now` through `now`'s day, oldest first.
pub fn range_dates(now: DateTime<Utc>, days_back: u32) -> Vec<NaiveDate> {
    let today = now.date_naive();
    (0..=days_back)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .collect()
}

async fn resolve_day(
    source: &dyn TimeSeriesSource,
    cache: &DayCache,
    sensor_id: &str,
    date: NaiveDate,
    resolution: Resolution,
    now: DateTime<Utc>,
) -> (Option<DayResult>, DayOutcome) {
    // The current day is still filling up and is never cached.
    let closed = DayCache::is_closed(date, now);
    let mut write_back = closed;

    if closed {
        match cache.get(sensor_id, date, resolution).await {
            Ok(Some(day)) => return (Some(day), DayOutcome::Cached),
            Ok(None) => {}
            Err(HistoryError::Decode(e)) => {
                warn!("Discarding unreadable cache entry for {} on {}: {}", sensor_id, date, e);
            }
            Err(e) => {
                warn!("Cache read failed for {} on {}, computing without cache: {}", sensor_id, date, e);
                write_back = false;
            }
        }
    }

    let readings = match source.query(sensor_id, day_start(date), day_end(date)).await {
        Ok(readings) => readings,
        Err(e) => {
            error!("Failed to fetch readings for {} on {}: {}", sensor_id, date, e);
            return (None, DayOutcome::Failed);
        }
    };

    let Some(day) = decimate_day(sensor_id, date, &readings, resolution) else {
        return (None, DayOutcome::Empty);
    };

    if write_back {
        if let Err(e) = cache.put(sensor_id, date, resolution, &day).await {
            warn!("Failed to cache {} on {}: {}", sensor_id, date, e);
        }
    }

    (Some(day), DayOutcome::Computed)
}
