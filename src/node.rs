//! The recursive `QueryIndex` node (§3) and the concurrency primitives
//! that back it (§5). See DESIGN.md for the rationale behind each choice.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use dashmap::DashMap;
use log::trace;
use parking_lot::RwLock;

use crate::cache::{CacheSupplier, ResultCache};
use crate::once::OnceBox;
use crate::predicate::KeyPredicate;
use crate::prefix_tree::PrefixTree;

pub(crate) struct Node<V> {
    /// The tag key examined at this node. Assigned at most once (§3
    /// invariant 4) via the publish-once `OnceBox`; the root is keyed
    /// `"name"` at construction (`QueryIndex::new`), every other node gets
    /// its key from the first clause inserted through it.
    pub(crate) key: OnceBox<Box<str>>,
    pub(crate) equal_checks: DashMap<Box<str>, Arc<Node<V>>>,
    pub(crate) other_checks: DashMap<KeyPredicate, Arc<Node<V>>>,
    pub(crate) other_checks_tree: RwLock<PrefixTree>,
    other_checks_cache: OnceBox<Box<dyn ResultCache<Box<str>, Vec<KeyPredicate>>>>,
    pub(crate) has_key_idx: ArcSwapOption<Node<V>>,
    pub(crate) other_keys_idx: ArcSwapOption<Node<V>>,
    pub(crate) missing_keys_idx: ArcSwapOption<Node<V>>,
    pub(crate) matches: ArcSwap<Vec<V>>,
    cache_supplier: CacheSupplier,
}

impl<V> Node<V>
where
    V: Clone + Eq + Send + Sync + 'static,
{
    pub(crate) fn new(cache_supplier: CacheSupplier) -> Self {
        Node {
            key: OnceBox::new(),
            equal_checks: DashMap::new(),
            other_checks: DashMap::new(),
            other_checks_tree: RwLock::new(PrefixTree::new()),
            other_checks_cache: OnceBox::new(),
            has_key_idx: ArcSwapOption::from(None),
            other_keys_idx: ArcSwapOption::from(None),
            missing_keys_idx: ArcSwapOption::from(None),
            matches: ArcSwap::from_pointee(Vec::new()),
            cache_supplier,
        }
    }

    pub(crate) fn new_arc(cache_supplier: CacheSupplier) -> Arc<Self> {
        Arc::new(Self::new(cache_supplier))
    }

    pub(crate) fn key_str(&self) -> Option<&str> {
        self.key.get().map(|k| k.as_ref())
    }

    /// Assigns `key` if this node hasn't been assigned one yet (§3
    /// invariant 4). A no-op if a (necessarily identical, by construction)
    /// key was already published by a previous insertion.
    pub(crate) fn ensure_key(&self, key: &str) {
        let (published, won) = self.key.get_or_init(|| key.to_owned().into_boxed_str());
        debug_assert_eq!(published.as_ref(), key, "a node's key must never change");
        if won {
            trace!("node key published: {key}");
        }
    }

    fn cache(&self) -> &dyn ResultCache<Box<str>, Vec<KeyPredicate>> {
        let (cache, _) = self.other_checks_cache.get_or_init(|| (self.cache_supplier)());
        cache.as_ref()
    }

    pub(crate) fn cached_applicable(&self, probe: &str) -> Option<Vec<KeyPredicate>> {
        self.cache().get(&Box::from(probe))
    }

    pub(crate) fn cache_applicable(&self, probe: &str, applicable: Vec<KeyPredicate>) {
        self.cache().put(Box::from(probe), applicable);
    }

    pub(crate) fn invalidate_cache(&self) {
        self.cache().clear();
    }

    /// §3 invariant 2: a node is empty iff it has no matches and no
    /// non-empty children.
    pub(crate) fn is_empty(&self) -> bool {
        self.matches.load().is_empty()
            && self.equal_checks.is_empty()
            && self.other_checks.is_empty()
            && self.has_key_idx.load().is_none()
            && self.other_keys_idx.load().is_none()
            && self.missing_keys_idx.load().is_none()
    }

    /// Adds `value` to this node's terminal match set if not already
    /// present. Copy-on-write: never mutates the `Vec` a concurrent reader
    /// might be iterating (§5).
    pub(crate) fn add_match(&self, value: V) {
        let current = self.matches.load();
        if current.contains(&value) {
            return;
        }
        let mut updated = (**current).clone();
        updated.push(value);
        self.matches.store(Arc::new(updated));
    }

    /// Removes `value` from this node's terminal match set. Returns
    /// `true` iff it was present.
    pub(crate) fn remove_match(&self, value: &V) -> bool {
        let current = self.matches.load();
        if !current.contains(value) {
            return false;
        }
        let updated: Vec<V> = current.iter().filter(|v| *v != value).cloned().collect();
        self.matches.store(Arc::new(updated));
        true
    }

    /// Fetches the `has_key_idx`/`other_keys_idx`/`missing_keys_idx`
    /// child, creating it on first use. Relies on the single-writer
    /// contract (§5, §7): `add`/`remove` are serialized by the caller, so
    /// this plain load-then-store is race-free with respect to other
    /// writers, and `arc-swap` already guarantees concurrent readers never
    /// observe a torn pointer.
    pub(crate) fn child_or_create(ptr: &ArcSwapOption<Node<V>>, cache_supplier: &CacheSupplier) -> Arc<Node<V>> {
        if let Some(existing) = ptr.load_full() {
            return existing;
        }
        let created = Self::new_arc(cache_supplier.clone());
        ptr.store(Some(Arc::clone(&created)));
        created
    }

    /// Drops a singleton child if it has become empty (§3 invariant 2,
    /// §4.3). Returns `true` iff the child existed (regardless of whether
    /// it was pruned).
    pub(crate) fn prune_if_empty(ptr: &ArcSwapOption<Node<V>>) -> bool {
        match ptr.load_full() {
            Some(child) if child.is_empty() => {
                ptr.store(None);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    pub(crate) fn equal_child_or_create(&self, value: &str, cache_supplier: &CacheSupplier) -> Arc<Node<V>> {
        if let Some(existing) = self.equal_checks.get(value) {
            return Arc::clone(existing.value());
        }
        let created = Self::new_arc(cache_supplier.clone());
        self.equal_checks.insert(value.into(), Arc::clone(&created));
        created
    }

    /// Looks up (or creates) the `other_checks` child for `kq`, inserting
    /// `kq` into the prefix tree and invalidating the cache if that
    /// changed the tree's membership (§4.2).
    pub(crate) fn other_check_child_or_create(
        &self,
        kq: &KeyPredicate,
        cache_supplier: &CacheSupplier,
    ) -> Arc<Node<V>> {
        if let Some(existing) = self.other_checks.get(kq) {
            return Arc::clone(existing.value());
        }
        let created = Self::new_arc(cache_supplier.clone());
        self.other_checks.insert(kq.clone(), Arc::clone(&created));
        let changed = self.other_checks_tree.write().put(kq.clone());
        if changed {
            trace!("other_checks prefix tree grew for prefix {:?}; clearing cache", kq.prefix());
            self.invalidate_cache();
        }
        created
    }

    /// Removes `kq` from `other_checks` and, if present, its tree entry;
    /// invalidates the cache when tree membership changed (§4.3).
    pub(crate) fn remove_other_check_child(&self, kq: &KeyPredicate) {
        self.other_checks.remove(kq);
        let changed = self.other_checks_tree.write().remove(kq);
        if changed {
            self.invalidate_cache();
        }
    }
}
