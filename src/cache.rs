//! In-process TTL caches bounding real traffic against the registry.
//!
//! Three independent tiers: search results (5 min), detail records (10 min)
//! and the registration-number → project-id cross-reference written as a side
//! effect of crawling. All state is volatile and lost on restart by design.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::query::TrialQuery;
use crate::record::{TrialDetail, TrialListItem};

/// Default TTL for the search tier.
pub const SEARCH_TTL: Duration = Duration::from_secs(300);
/// Default TTL for the detail tier.
pub const DETAIL_TTL: Duration = Duration::from_secs(600);
/// Default TTL for the cross-reference tier.
pub const CROSSREF_TTL: Duration = Duration::from_secs(600);

struct Entry<V> {
    value: V,
    inserted: Instant,
}

struct TierState<K, V> {
    entries: HashMap<K, Entry<V>>,
    hits: u64,
    misses: u64,
}

/// Counters exposed per cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
}

/// A key-value map whose entries expire a fixed duration after insertion.
///
/// Reads do not extend the TTL; an expired entry is swept on the access that
/// finds it and counted as a miss. `flush` drops entries but keeps the
/// hit/miss counters, matching the stats contract.
pub struct TtlCache<K, V> {
    ttl: Duration,
    state: Mutex<TierState<K, V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    /// Creates an empty cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(TierState {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Returns a clone of the cached value, or `None` on miss/expiry.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.state.lock().expect("cache lock poisoned");
        let state = &mut *guard;
        let expired = match state.entries.get(key) {
            Some(entry) => entry.inserted.elapsed() >= self.ttl,
            None => false,
        };
        if expired {
            state.entries.remove(key);
        }
        match state.entries.get(key) {
            Some(entry) => {
                let value = entry.value.clone();
                state.hits += 1;
                Some(value)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Inserts a value, stamping it with the current time. Last writer wins.
    pub fn insert(&self, key: K, value: V) {
        let mut state = self.state.lock().expect("cache lock poisoned");
        state.entries.insert(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Drops every entry. Counters survive.
    pub fn flush(&self) {
        let mut state = self.state.lock().expect("cache lock poisoned");
        state.entries.clear();
    }

    /// Number of live (possibly expired but unswept) entries.
    pub fn len(&self) -> usize {
        self.state.lock().expect("cache lock poisoned").entries.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters for this tier.
    pub fn stats(&self) -> TierStats {
        let state = self.state.lock().expect("cache lock poisoned");
        TierStats {
            keys: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}

/// Stats payload returned by the `get_cache_stats` tool.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub search: TierStats,
    pub detail: TierStats,
}

/// The three cache tiers, owned here exclusively and injected into the
/// crawler and detail fetcher.
pub struct CacheLayer {
    search: TtlCache<TrialQuery, Vec<TrialListItem>>,
    detail: TtlCache<String, TrialDetail>,
    crossref: TtlCache<String, String>,
}

impl CacheLayer {
    /// Creates the layer with production TTLs.
    pub fn new() -> Self {
        Self::with_ttls(SEARCH_TTL, DETAIL_TTL, CROSSREF_TTL)
    }

    /// Creates the layer with explicit TTLs. Used by tests to exercise
    /// expiry without waiting minutes.
    pub fn with_ttls(search: Duration, detail: Duration, crossref: Duration) -> Self {
        Self {
            search: TtlCache::new(search),
            detail: TtlCache::new(detail),
            crossref: TtlCache::new(crossref),
        }
    }

    /// Search tier, keyed by the exact query signature.
    pub fn search(&self) -> &TtlCache<TrialQuery, Vec<TrialListItem>> {
        &self.search
    }

    /// Detail tier, keyed by registration number.
    pub fn detail(&self) -> &TtlCache<String, TrialDetail> {
        &self.detail
    }

    /// Cross-reference tier: registration number → project id. Populated
    /// opportunistically by the crawler; consulted, never required, by the
    /// detail fetcher. Its reads intentionally skew its miss counter, which
    /// is why it is excluded from [`CacheStats`].
    pub fn crossref(&self) -> &TtlCache<String, String> {
        &self.crossref
    }

    /// Stats for the two caller-visible tiers.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            search: self.search.stats(),
            detail: self.detail.stats(),
        }
    }

    /// Flushes all three tiers unconditionally.
    pub fn clear_all(&self) {
        self.search.flush();
        self.detail.flush();
        self.crossref.flush();
    }

    /// Key counts of all three tiers, in (search, detail, crossref) order.
    pub fn tier_keys(&self) -> (usize, usize, usize) {
        (self.search.len(), self.detail.len(), self.crossref.len())
    }
}

impl Default for CacheLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_miss_then_hit() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"a".to_string()), None);
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expired_entry_swept_and_counted_as_miss() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::ZERO);
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_read_does_not_extend_ttl() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(30));
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_insert_overwrites_last_writer_wins() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        cache.insert("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_flush_keeps_counters() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        cache.get(&"a".to_string());
        cache.flush();
        let stats = cache.stats();
        assert_eq!(stats.keys, 0);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_layer_clear_all_resets_every_tier() {
        let layer = CacheLayer::new();
        layer
            .search()
            .insert(TrialQuery::new().with_keyword("KRAS"), Vec::new());
        layer.detail().insert("d".to_string(), TrialDetail::default());
        layer
            .crossref()
            .insert("ChiCTR1".to_string(), "1".to_string());
        assert_eq!(layer.tier_keys(), (1, 1, 1));

        layer.clear_all();
        assert_eq!(layer.tier_keys(), (0, 0, 0));
    }

    #[test]
    fn test_layer_stats_shape() {
        let layer = CacheLayer::new();
        layer.search().get(&TrialQuery::new().with_keyword("missing"));
        let stats = layer.stats();
        assert_eq!(stats.search.misses, 1);
        assert_eq!(stats.detail.misses, 0);

        let json = serde_json::to_value(stats).unwrap();
        assert!(json["search"]["keys"].is_number());
        assert!(json["detail"]["hits"].is_number());
    }

    #[test]
    fn test_layer_stats_exclude_crossref() {
        let layer = CacheLayer::new();
        let json = serde_json::to_value(layer.stats()).unwrap();
        assert!(json.get("crossref").is_none());
    }
}
