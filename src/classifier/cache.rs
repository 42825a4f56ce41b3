//! Bounded response cache keyed by normalized input text.

use std::collections::VecDeque;

use ahash::AHashMap;

use serde::{Deserialize, Serialize};

use crate::intent::ClassificationResult;

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, or 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Insertion-ordered cache. When full, the oldest insertion is evicted;
/// lookups do not refresh an entry's position.
///
/// Every [`clear`](Self::clear) starts a new epoch. A result computed
/// against an older model or policy is stored with
/// [`put_if_current`](Self::put_if_current) and dropped if the epoch moved.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: AHashMap<String, ClassificationResult>,
    order: VecDeque<String>,
    max_size: usize,
    epoch: u64,
    hits: u64,
    misses: u64,
}

impl ResponseCache {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: AHashMap::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
            epoch: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// The cache key of an input: trimmed and lowercased.
    pub fn key(text: &str) -> String {
        text.trim().to_lowercase()
    }

    pub fn get(&mut self, key: &str) -> Option<ClassificationResult> {
        match self.entries.get(key) {
            Some(result) => {
                self.hits += 1;
                Some(result.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: String, result: ClassificationResult) {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = result;
            return;
        }
        while self.entries.len() >= self.max_size {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, result);
    }

    /// Store `result` only if no clear happened since `epoch` was read.
    pub fn put_if_current(
        &mut self,
        key: String,
        result: ClassificationResult,
        epoch: u64,
    ) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.put(key, result);
        true
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drop every entry and start a new epoch. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::ResponseSource;

    fn result(tag: &str) -> ClassificationResult {
        ClassificationResult {
            tag: tag.to_string(),
            confidence: 0.9,
            response: format!("{tag} response"),
            relevance: 0.8,
            source: ResponseSource::Faq,
        }
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(ResponseCache::key("  Hello There "), "hello there");
    }

    #[test]
    fn test_get_put_and_counters() {
        let mut cache = ResponseCache::new(10);
        assert!(cache.get("hello").is_none());
        cache.put("hello".to_string(), result("greeting"));
        assert_eq!(cache.get("hello").unwrap().tag, "greeting");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_evicts_oldest_insertion() {
        let mut cache = ResponseCache::new(2);
        cache.put("a".to_string(), result("a"));
        cache.put("b".to_string(), result("b"));
        // A hit does not refresh "a".
        assert!(cache.get("a").is_some());
        cache.put("c".to_string(), result("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = ResponseCache::new(3);
        for i in 0..50 {
            cache.put(format!("key {i}"), result("x"));
            assert!(cache.len() <= cache.capacity());
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let mut cache = ResponseCache::new(2);
        cache.put("a".to_string(), result("first"));
        cache.put("a".to_string(), result("second"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().tag, "second");
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut cache = ResponseCache::new(2);
        cache.put("a".to_string(), result("a"));
        cache.get("a");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_put_after_clear_with_stale_epoch_is_dropped() {
        let mut cache = ResponseCache::new(4);
        let before = cache.epoch();
        cache.clear();

        assert!(!cache.put_if_current("hello".to_string(), result("stale"), before));
        assert!(cache.is_empty());

        let current = cache.epoch();
        assert!(cache.put_if_current("hello".to_string(), result("fresh"), current));
        assert_eq!(cache.get("hello").unwrap().tag, "fresh");
    }
}
