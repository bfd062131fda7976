//! Optional Redis caching for the course snapshot and ranked search results.
//!
//! Without `REDIS_URL` every operation here is a no-op and each request
//! reloads the JSON tree from disk. Keys are namespaced under a versioned
//! prefix so the enrichment pass can invalidate everything with one SCAN.
//!
//! Key schema:
//! - `courses:v1:snapshot`: JSON-serialized deduplicated LoadOutcome (TTL)
//! - `courses:v1:ranked:{sha256(interests|year)}`: JSON-serialized ranked list (TTL)

use sha2::{Digest, Sha256};
use tracing::warn;

use catalogue_common::redis::RedisCache;

use crate::rank::RankedCourse;
use crate::store::LoadOutcome;

pub const KEY_PREFIX: &str = "courses:v1:";

pub struct CourseCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl CourseCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn get_snapshot(&self) -> Option<LoadOutcome> {
        let key = format!("{KEY_PREFIX}snapshot");
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_snapshot(&self, outcome: &LoadOutcome) {
        let key = format!("{KEY_PREFIX}snapshot");
        if let Ok(json) = serde_json::to_string(outcome) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }

    pub async fn get_ranked(&self, interests: &str, year: Option<u8>) -> Option<Vec<RankedCourse>> {
        let key = ranked_key(interests, year);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_ranked(&self, interests: &str, year: Option<u8>, ranked: &[RankedCourse]) {
        let key = ranked_key(interests, year);
        if let Ok(json) = serde_json::to_string(ranked) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }
}

/// Deterministic key for a ranking query.
fn ranked_key(interests: &str, year: Option<u8>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(interests.as_bytes());
    hasher.update(b"|");
    if let Some(year) = year {
        hasher.update([year]);
    }
    let hash = hasher.finalize();
    format!("{KEY_PREFIX}ranked:{hash:x}")
}
