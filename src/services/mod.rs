pub mod day_cache;
pub mod history_service;
pub mod period_decimator;
