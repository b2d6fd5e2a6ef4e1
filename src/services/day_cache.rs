//! Day-level cache of decimated results.
//!
//! Only closed days are stored: once a UTC calendar day lies entirely before
//! the request's "now", its decimation can no longer change, so an entry is
//! valid until someone invalidates it. The optional TTL only keeps the
//! backing store tidy.
//!
//! Entries are keyed by sensor, date and resolution, so the same day decimated
//! at 24 and at 96 periods are separate entries. Values are the JSON list of
//! `{timestamp, value}` pairs with second-precision timestamps.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::errors::HistoryError;
use crate::external::cache_store::CacheStore;
use crate::models::{DayResult, Resolution};
use crate::services::period_decimator::day_start;

const KEY_PREFIX: &str = "history";

#[derive(Clone)]
pub struct DayCache {
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
}

impl DayCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store, ttl: None }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key(sensor_id: &str, date: NaiveDate, resolution: Resolution) -> String {
        format!(
            "{}:{}:{}:{}",
            KEY_PREFIX,
            sensor_id,
            date.format("%Y-%m-%d"),
            resolution
        )
    }

    /// A day is closed once all 24 hours of it lie at or before `now`.
    pub fn is_closed(date: NaiveDate, now: DateTime<Utc>) -> bool {
        now - day_start(date) >= Duration::days(1)
    }

    pub async fn get(
        &self,
        sensor_id: &str,
        date: NaiveDate,
        resolution: Resolution,
    ) -> Result<Option<DayResult>, HistoryError> {
        let key = Self::key(sensor_id, date, resolution);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let day: DayResult = serde_json::from_slice(&bytes)?;
        if day.is_empty() {
            return Err(HistoryError::Decode(format!("empty day result under {}", key)));
        }
        debug!("Cache hit for {}", key);
        Ok(Some(day))
    }

    pub async fn put(
        &self,
        sensor_id: &str,
        date: NaiveDate,
        resolution: Resolution,
        day: &DayResult,
    ) -> Result<(), HistoryError> {
        let key = Self::key(sensor_id, date, resolution);
        let bytes = serde_json::to_vec(day)?;
        self.store.set(&key, bytes, self.ttl).await?;
        debug!("Cached {} points under {}", day.len(), key);
        Ok(())
    }

    /// Remove a cached day, e.g. after readings for it were corrected upstream.
    pub async fn invalidate(
        &self,
        sensor_id: &str,
        date: NaiveDate,
        resolution: Resolution,
    ) -> Result<(), HistoryError> {
        let key = Self::key(sensor_id, date, resolution);
        self.store.delete(&key).await?;
        Ok(())
    }
}
