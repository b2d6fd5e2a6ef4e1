//! Decimated, cached sensor history for charting.
//!
//! `HistoryService::get_history` turns dense per-sensor readings into a small
//! dataset that keeps every period's minimum and maximum, caching the result
//! for every day that can no longer change.

pub mod config;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod services;

pub use config::HistoryConfig;
pub use errors::HistoryError;
pub use external::cache_store::{CacheStore, CacheStoreError, MemoryCacheStore};
pub use external::time_series_source::{MemorySource, SourceError, TimeSeriesSource};
pub use models::{combined_extrema, Dataset, DayOutcome, DayResult, DecimatedPoint, Reading, Resolution};
pub use services::day_cache::DayCache;
pub use services::history_service::{HistoryReport, HistoryService};
