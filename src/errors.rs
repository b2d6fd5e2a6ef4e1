use thiserror::Error;

use crate::external::cache_store::CacheStoreError;
use crate::external::time_series_source::SourceError;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SourceError> for HistoryError {
    fn from(value: SourceError) -> Self {
        HistoryError::SourceUnavailable(value.to_string())
    }
}

impl From<CacheStoreError> for HistoryError {
    fn from(value: CacheStoreError) -> Self {
        HistoryError::CacheUnavailable(value.to_string())
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(value: serde_json::Error) -> Self {
        HistoryError::Decode(value.to_string())
    }
}
