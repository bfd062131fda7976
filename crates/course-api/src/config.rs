use std::path::PathBuf;

use tracing::warn;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the scraped JSON tree (contains `courses/`, `schools/`, ...).
    pub data_dir: PathBuf,
    /// Listen address, e.g. "0.0.0.0:8080".
    pub bind_addr: String,
    /// Redis connection URL. `None` disables caching entirely.
    pub redis_url: Option<String>,
    /// TTL for cached snapshots and rankings.
    pub cache_ttl_secs: u64,
}

impl Config {
    /// Required:
    /// - `COURSE_DATA_DIR`: path to the scraped data tree
    ///
    /// Optional:
    /// - `BIND_ADDR` (default "0.0.0.0:8080")
    /// - `REDIS_URL`
    /// - `COURSE_CACHE_TTL_SECS` (default 300)
    pub fn from_env() -> Result<Self, AppError> {
        let data_dir = std::env::var("COURSE_DATA_DIR").map_err(|_| {
            AppError::Config("COURSE_DATA_DIR environment variable is required".to_string())
        })?;
        let data_dir = PathBuf::from(data_dir);

        // A missing tree is not fatal: the store degrades to empty results
        // with diagnostics, and the scraper may not have run yet.
        if !data_dir.join("courses").is_dir() {
            warn!(
                dir = %data_dir.display(),
                "no courses directory under COURSE_DATA_DIR, requests will return empty results"
            );
        }

        let cache_ttl_secs = std::env::var("COURSE_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);

        Ok(Self {
            data_dir,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            redis_url: std::env::var("REDIS_URL").ok(),
            cache_ttl_secs,
        })
    }
}
