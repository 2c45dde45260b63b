//! Content-addressed cache layer
//!
//! The cache is a pure memoization layer: absence never changes
//! correctness, only latency. Writes are idempotent and last-write-wins.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Cache store contract: get/set with TTL plus prefix deletion
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; expired entries count as absent
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value with a time-to-live
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Remove every entry whose key starts with `prefix`, returning the count
    async fn delete_by_pattern(&self, prefix: &str) -> usize;
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache backed by a concurrent map
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live (non-expired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
        }
        // Drop the read guard before removing the expired entry
        self.entries.remove(key);
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn delete_by_pattern(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }
}

/// Deterministic cache key builders
///
/// Keys fingerprint their variable parts with a truncated SHA-256 so that
/// identical inputs always map to the same entry.
pub mod keys {
    use sha2::{Digest, Sha256};

    /// 16-hex-char digest of arbitrary text
    pub fn fingerprint(text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    /// Key for a cached embedding vector: `emb:{model}:{digest(text)}`
    pub fn embedding(model: &str, text: &str) -> String {
        format!("emb:{}:{}", model, fingerprint(text))
    }

    /// Key for a cached rerank ordering:
    /// `rrk:{digest(query)}:{search_k}:{top_k}:{version}`
    pub fn rerank(query: &str, search_k: usize, top_k: usize, version: &str) -> String {
        format!(
            "rrk:{}:{}:{}:{}",
            fingerprint(query),
            search_k,
            top_k,
            version
        )
    }

    /// Key for a cached answer:
    /// `ans:{model}:{digest(question)}:{digest(context)}:{template}`
    pub fn answer(model: &str, question: &str, context: &str, template: &str) -> String {
        format!(
            "ans:{}:{}:{}:{}",
            model,
            fingerprint(question),
            fingerprint(context),
            template
        )
    }
}
