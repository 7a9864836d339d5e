use std::time::Duration;

use crate::error::{AppError, Result};

/// Miles per degree of latitude; longitude degrees shrink by cos(latitude).
pub const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// Mean earth radius used by the exact radius post-filter.
pub const EARTH_RADIUS_MILES: f64 = 3_958.8;

/// Listing types that are never for sale and are excluded from every query.
pub const NON_SALE_PROPERTY_TYPES: &[&str] =
    &["Rental", "Lease", "ResidentialLease", "CommercialLease"];

/// Status a closed record must carry to count as a completed sale.
pub const CLOSED_STATUS: &str = "Closed";

/// Default page size when the caller does not pass a limit.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest "years back" a caller may ask for.
pub const MAX_YEARS_BACK: u32 = 100;

/// Default "years back" window for closed-sale queries.
pub const DEFAULT_YEARS_BACK: u32 = 5;

/// Moving-average window used when a caller asks for price trends.
pub const DEFAULT_TREND_WINDOW_MONTHS: usize = 3;

/// Days-on-market thresholds.
pub mod dom_thresholds {
    /// Listings below this many days are "fresh".
    pub const FRESH_DAYS: f64 = 7.0;
    /// Listings above this many days are "stale".
    pub const STALE_DAYS: f64 = 90.0;
    pub const FAST_MEDIAN: f64 = 30.0;
    pub const MODERATE_MEDIAN: f64 = 60.0;
    /// Insight materiality: only mention fresh/stale counts above these.
    pub const FRESH_INSIGHT_MIN: usize = 10;
    pub const STALE_INSIGHT_MIN: usize = 5;
    /// max - min spread that triggers a high-variance note.
    pub const HIGH_VARIANCE_SPAN: f64 = 180.0;
}

/// Appreciation confidence buckets, in average sales per year.
pub mod confidence_thresholds {
    pub const HIGH_SALES_PER_YEAR: f64 = 50.0;
    pub const MEDIUM_SALES_PER_YEAR: f64 = 20.0;
}

/// Materiality thresholds for comparison insights.
pub mod comparison_thresholds {
    pub const PRICE_PCT: f64 = 10.0;
    pub const PRICE_PER_SQFT_PCT: f64 = 10.0;
    pub const INVENTORY_PCT: f64 = 25.0;
    pub const DOM_DAYS: f64 = 10.0;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Per store round-trip timeout (QUERY_TIMEOUT_MS)
    pub query_timeout: Duration,
    /// Page size when the caller gives none (DEFAULT_LIMIT)
    pub default_limit: u32,
    /// Hard cap on any requested page size (MAX_LIMIT)
    pub max_limit: u32,
    /// Result cache entry lifetime (CACHE_TTL_SECS)
    pub cache_ttl: Duration,
    /// Number of recent queries kept by the monitor (MONITOR_CAPACITY)
    pub monitor_capacity: usize,
    /// Queries slower than this are flagged (SLOW_QUERY_MS)
    pub slow_query_ms: f64,
    /// Max concurrent stats computations in batch mode (BATCH_CONCURRENCY)
    pub batch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            db_path: "listings.db".to_string(),
            api_port: 3000,
            query_timeout: Duration::from_millis(5_000),
            default_limit: DEFAULT_LIMIT,
            max_limit: 1_000,
            cache_ttl: Duration::from_secs(300),
            monitor_capacity: 100,
            slow_query_ms: 1_000.0,
            batch_concurrency: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            db_path: std::env::var("DB_PATH").unwrap_or(defaults.db_path),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            query_timeout: Duration::from_millis(
                std::env::var("QUERY_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse::<u64>()
                    .map_err(|_| {
                        AppError::Config("QUERY_TIMEOUT_MS must be an integer".to_string())
                    })?,
            ),
            default_limit: std::env::var("DEFAULT_LIMIT")
                .unwrap_or_else(|_| DEFAULT_LIMIT.to_string())
                .parse::<u32>()
                .unwrap_or(DEFAULT_LIMIT),
            max_limit: std::env::var("MAX_LIMIT")
                .unwrap_or_else(|_| "1000".to_string())
                .parse::<u32>()
                .unwrap_or(defaults.max_limit),
            cache_ttl: Duration::from_secs(
                std::env::var("CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse::<u64>()
                    .unwrap_or(300),
            ),
            monitor_capacity: std::env::var("MONITOR_CAPACITY")
                .unwrap_or_else(|_| "100".to_string())
                .parse::<usize>()
                .unwrap_or(defaults.monitor_capacity),
            slow_query_ms: std::env::var("SLOW_QUERY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse::<f64>()
                .unwrap_or(defaults.slow_query_ms),
            batch_concurrency: std::env::var("BATCH_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .map(|n| n.max(1))
                .unwrap_or(defaults.batch_concurrency),
        })
    }

    /// Resolve a caller-supplied page size against the configured default and cap.
    pub fn effective_limit(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}
