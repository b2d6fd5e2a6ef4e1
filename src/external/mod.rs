pub mod cache_store;
pub mod time_series_source;
