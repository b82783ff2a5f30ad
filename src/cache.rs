//! The `ResultCache` the index consumes for `other_checks` memoization
//! (§4.5, §6). Treated as an external collaborator by the design ("only its
//! interface is consumed" — §1); `MokaResultCache` is the concrete default
//! so the crate is usable without a caller-supplied cache, grounded the
//! same way the teacher's own `WbsCache` wraps `moka::sync::Cache` behind a
//! small typed façade (see DESIGN.md).

use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

/// Bounded associative memoizer, eviction policy opaque to the index.
pub trait ResultCache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn put(&self, key: K, value: V);
    fn clear(&self);
}

/// Manufactures a fresh per-node cache. Cloned cheaply (an `Arc` around the
/// closure) and invoked once per node, lazily, the first time that node
/// needs an `other_checks_cache` (mirrors the teacher's own lazy
/// `OnceBox::get_or_init` construction discipline).
pub type CacheSupplier =
    Arc<dyn Fn() -> Box<dyn ResultCache<Box<str>, Vec<crate::predicate::KeyPredicate>>> + Send + Sync>;

/// Default `ResultCache` backed by `moka::sync::Cache`, bounded by entry
/// count with an opaque (moka's own, LFU-adjacent TinyLFU) eviction policy
/// -- matching the spec's "eviction policy is opaque" requirement without
/// hand-rolling one.
pub struct MokaResultCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<K, V>,
}

impl<K, V> MokaResultCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64) -> Self {
        Self { cache: Cache::new(max_capacity) }
    }
}

impl<K, V> ResultCache<K, V> for MokaResultCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key)
    }

    fn put(&self, key: K, value: V) {
        self.cache.insert(key, value);
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }
}

/// Configuration for the default cache supplier (§4.10).
#[derive(Debug, Clone, Copy)]
pub struct QueryIndexConfig {
    /// Maximum entries held per-node in the default `MokaResultCache`.
    pub cache_capacity: u64,
}

impl Default for QueryIndexConfig {
    fn default() -> Self {
        QueryIndexConfig { cache_capacity: 1_024 }
    }
}

pub(crate) fn default_cache_supplier(config: QueryIndexConfig) -> CacheSupplier {
    Arc::new(move || {
        Box::new(MokaResultCache::new(config.cache_capacity))
            as Box<dyn ResultCache<Box<str>, Vec<crate::predicate::KeyPredicate>>>
    })
}
