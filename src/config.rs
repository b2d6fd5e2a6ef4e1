use chrono::Duration;
use chrono_tz::Tz;

use crate::errors::HistoryError;

pub const DEFAULT_DISPLAY_TIMEZONE: Tz = chrono_tz::America::Chicago;
pub const DEFAULT_POOL_WIDTH: usize = 10;

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Timezone the output timestamps are rendered in.
    pub display_timezone: Tz,
    /// Number of days decimated concurrently within one request.
    pub pool_width: usize,
    /// Optional expiry for cached days. Cached days never go stale, this only
    /// bounds how long the store holds them.
    pub cache_ttl: Option<Duration>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            display_timezone: DEFAULT_DISPLAY_TIMEZONE,
            pool_width: DEFAULT_POOL_WIDTH,
            cache_ttl: None,
        }
    }
}

impl HistoryConfig {
    /// Reads `HISTORY_DISPLAY_TZ`, `HISTORY_POOL_WIDTH` and `HISTORY_CACHE_TTL_DAYS`,
    /// falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self, HistoryError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HistoryError> {
        let defaults = Self::default();

        let display_timezone = match lookup("HISTORY_DISPLAY_TZ") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| HistoryError::Config(format!("HISTORY_DISPLAY_TZ: {}", e)))?,
            None => defaults.display_timezone,
        };

        let pool_width = match lookup("HISTORY_POOL_WIDTH") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| HistoryError::Config(format!("HISTORY_POOL_WIDTH: {}", e)))?,
            None => defaults.pool_width,
        };

        let cache_ttl = match lookup("HISTORY_CACHE_TTL_DAYS") {
            Some(raw) => {
                let days = raw
                    .parse::<i64>()
                    .map_err(|e| HistoryError::Config(format!("HISTORY_CACHE_TTL_DAYS: {}", e)))?;
                let ttl = Duration::try_days(days).ok_or_else(|| {
                    HistoryError::Config(format!("HISTORY_CACHE_TTL_DAYS: {} days is out of range", days))
                })?;
                Some(ttl)
            }
            None => defaults.cache_ttl,
        };

        let config = Self {
            display_timezone,
            pool_width,
            cache_ttl,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.pool_width == 0 {
            return Err(HistoryError::Config("pool width must be at least 1".to_string()));
        }
        if let Some(ttl) = self.cache_ttl {
            if ttl <= Duration::zero() {
                return Err(HistoryError::Config("cache TTL must be positive".to_string()));
            }
        }
        Ok(())
    }
}
