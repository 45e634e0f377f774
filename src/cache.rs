// cache.rs - Summary cache keyed by URL and the settings that shape a summary
// Lives on top of any KeyValueStore; only keys with the summary_ prefix are
// ever touched, so the store can be shared with settings.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::prompts::{SummaryFormat, SummaryLength};
use crate::settings::Settings;
use crate::storage::{Entries, KeyValueStore};

pub const CACHE_KEY_PREFIX: &str = "summary_";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The settings that change a summary's content. The API key is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    pub provider: String,
    pub model: String,
    pub summary_length: SummaryLength,
    pub summary_format: SummaryFormat,
}

impl From<&Settings> for CacheSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            summary_length: settings.summary_length,
            summary_format: settings.summary_format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub summary: String,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
    pub url: String,
    pub settings: CacheSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: usize,
    pub cache_ttl_hours: i64,
}

/// `summary_{sha256(url)}_{base64(provider-model-length-format)}`
pub fn cache_key(url: &str, settings: &Settings) -> String {
    let url_hash = format!("{:x}", Sha256::digest(url.as_bytes()));
    let settings_tag = format!(
        "{}-{}-{}-{}",
        settings.provider,
        settings.model,
        settings.summary_length.as_str(),
        settings.summary_format.as_str()
    );
    format!(
        "{}{}_{}",
        CACHE_KEY_PREFIX,
        url_hash,
        general_purpose::STANDARD.encode(settings_tag)
    )
}

pub struct SummaryCache {
    store: Arc<dyn KeyValueStore>,
    ttl_hours: i64,
    clock: Clock,
}

impl SummaryCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_hours: i64) -> Self {
        Self {
            store,
            ttl_hours,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn ttl_ms(&self) -> i64 {
        self.ttl_hours.saturating_mul(60 * 60 * 1000)
    }

    fn now_ms(&self) -> i64 {
        (self.clock)().timestamp_millis()
    }

    fn is_fresh(&self, entry_timestamp: i64, now_ms: i64) -> bool {
        now_ms - entry_timestamp < self.ttl_ms()
    }

    async fn summary_entries(&self) -> Option<Entries> {
        match self.store.get_all().await {
            Ok(items) => Some(
                items
                    .into_iter()
                    .filter(|(key, _)| key.starts_with(CACHE_KEY_PREFIX))
                    .collect(),
            ),
            Err(e) => {
                warn!("🗄️ Cache scan failed: {}", e);
                None
            }
        }
    }

    /// The cached summary, if one exists and is younger than the TTL.
    /// A stale entry is evicted on the way out.
    pub async fn get(&self, url: &str, settings: &Settings) -> Option<String> {
        let key = cache_key(url, settings);
        let mut found = match self.store.get(std::slice::from_ref(&key)).await {
            Ok(found) => found,
            Err(e) => {
                warn!("🗄️ Cache read failed: {}", e);
                return None;
            }
        };

        let entry: CacheEntry = match found.remove(&key).map(serde_json::from_value) {
            Some(Ok(entry)) => entry,
            Some(Err(e)) => {
                debug!("🗄️ Dropping unreadable cache entry: {}", e);
                self.evict(&key).await;
                return None;
            }
            None => {
                trace!("[TRACE][CACHE] miss {}", key);
                return None;
            }
        };

        if !self.is_fresh(entry.timestamp, self.now_ms()) {
            debug!("🗄️ Cache entry expired for {}", key);
            self.evict(&key).await;
            return None;
        }

        info!("🗄️ Cache hit for {}", key);
        Some(entry.summary)
    }

    pub async fn set(&self, url: &str, settings: &Settings, summary: &str) {
        let key = cache_key(url, settings);
        let entry = CacheEntry {
            summary: summary.to_string(),
            timestamp: self.now_ms(),
            url: url.to_string(),
            settings: CacheSettings::from(settings),
        };
        let value = match serde_json::to_value(&entry) {
            Ok(value) => value,
            Err(e) => {
                warn!("🗄️ Could not serialize cache entry: {}", e);
                return;
            }
        };

        let mut entries = Entries::new();
        entries.insert(key.clone(), value);
        match self.store.set(entries).await {
            Ok(()) => debug!("🗄️ Cached summary under {}", key),
            Err(e) => warn!("🗄️ Cache write failed: {}", e),
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove(&[key.to_string()]).await {
            warn!("🗄️ Cache eviction failed: {}", e);
        }
    }

    /// Evict every entry at or past the TTL; returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let entries = match self.summary_entries().await {
            Some(entries) => entries,
            None => return 0,
        };
        let now = self.now_ms();
        let expired: Vec<String> = entries
            .into_iter()
            .filter_map(|(key, value)| {
                // Entries without a readable timestamp can never be served, so they go too
                match value.get("timestamp").and_then(Value::as_i64) {
                    Some(timestamp) if self.is_fresh(timestamp, now) => None,
                    _ => Some(key),
                }
            })
            .collect();

        if expired.is_empty() {
            return 0;
        }
        match self.store.remove(&expired).await {
            Ok(()) => {
                info!("🗄️ Cache cleanup removed {} expired entries", expired.len());
                expired.len()
            }
            Err(e) => {
                warn!("🗄️ Cache cleanup failed: {}", e);
                0
            }
        }
    }

    /// Evict every summary entry regardless of age.
    pub async fn clear(&self) -> usize {
        let keys: Vec<String> = match self.summary_entries().await {
            Some(entries) => entries.into_keys().collect(),
            None => return 0,
        };
        if keys.is_empty() {
            return 0;
        }
        match self.store.remove(&keys).await {
            Ok(()) => {
                info!("🗄️ Cache cleared ({} entries)", keys.len());
                keys.len()
            }
            Err(e) => {
                warn!("🗄️ Cache clear failed: {}", e);
                0
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            cache_ttl_hours: self.ttl_hours,
            ..CacheStats::default()
        };
        let entries = match self.summary_entries().await {
            Some(entries) => entries,
            None => return stats,
        };

        let now = self.now_ms();
        for value in entries.values() {
            stats.total_entries += 1;
            stats.total_size_bytes += value.to_string().len();
            match value.get("timestamp").and_then(Value::as_i64) {
                Some(timestamp) if self.is_fresh(timestamp, now) => stats.active_entries += 1,
                _ => stats.expired_entries += 1,
            }
        }
        stats
    }
}
