use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use crate::models::Reading;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),
}

/// Read-only access to stored sensor readings.
#[async_trait]
pub trait TimeSeriesSource: Send + Sync {
    /// Readings for `sensor_id` with `start <= timestamp <= end`, ascending by timestamp.
    async fn query(
        &self,
        sensor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, SourceError>;
}

/// In-process reading store, kept sorted per sensor on insert.
#[derive(Default)]
pub struct MemorySource {
    readings: RwLock<HashMap<String, Vec<Reading>>>,
    queries: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reading: Reading) {
        let mut guard = self.readings.write();
        let series = guard.entry(reading.sensor_id.clone()).or_default();
        // Readings without a timestamp sort first; queries never return them.
        let at = series.partition_point(|r| r.timestamp <= reading.timestamp);
        series.insert(at, reading);
    }

    pub fn extend(&self, readings: impl IntoIterator<Item = Reading>) {
        for reading in readings {
            self.insert(reading);
        }
    }

    /// Number of `query` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TimeSeriesSource for MemorySource {
    async fn query(
        &self,
        sensor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, SourceError> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let guard = self.readings.read();
        let Some(series) = guard.get(sensor_id) else {
            return Ok(Vec::new());
        };

        Ok(series
            .iter()
            .filter(|r| matches!(r.timestamp, Some(ts) if ts >= start && ts <= end))
            .cloned()
            .collect())
    }
}
