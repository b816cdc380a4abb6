use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::models::{
    DetectedBook, RecommendationOptions, RecommendationResponse, UserPreferences,
};

/// A detected book reduced to the fields that matter for caching.
/// Confidence is detection noise: two scans of the same shelf must hit
/// the same entry.
#[derive(Serialize)]
struct ReducedBook<'a> {
    title: &'a str,
    author: Option<&'a str>,
    genre: Option<&'a str>,
}

/// Content-addressed cache key over the semantically relevant inputs
pub fn cache_key(
    books: &[DetectedBook],
    preferences: &UserPreferences,
    options: &RecommendationOptions,
) -> String {
    let reduced: Vec<ReducedBook> = books
        .iter()
        .map(|b| ReducedBook {
            title: &b.title,
            author: b.author.as_deref(),
            genre: b.genre.as_deref(),
        })
        .collect();

    let mut hasher = Sha256::new();
    // Serialization of these types is deterministic: Vec order is the
    // request order, preference maps are BTreeMaps
    hasher.update(serde_json::to_vec(&reduced).unwrap_or_default());
    hasher.update(serde_json::to_vec(preferences).unwrap_or_default());
    hasher.update(serde_json::to_vec(options).unwrap_or_default());
    format!("{:x}", hasher.finalize())
}

struct CacheEntry {
    value: RecommendationResponse,
    created_at: DateTime<Utc>,
}

/// Time-boxed memoization of full pipeline results.
///
/// Expiry is lazy: a stale hit is evicted and reported as a miss. No
/// background sweep; an explicit `clear` is exposed to the admin surface.
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<RecommendationResponse> {
        self.get_at(key, Utc::now()).await
    }

    async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<RecommendationResponse> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if now - entry.created_at < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                tracing::debug!(key = %key, "Evicted stale cache entry");
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: String, value: RecommendationResponse) {
        self.insert_at(key, value, Utc::now()).await;
    }

    async fn insert_at(&self, key: String, value: RecommendationResponse, created_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        entries.insert(key, CacheEntry { value, created_at });
    }

    /// Evicts everything; returns the number of entries removed
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let evicted = entries.len();
        entries.clear();
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
