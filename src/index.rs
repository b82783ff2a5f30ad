//! `QueryIndex<V>`, the public entry point (§6): a concurrent, read-mostly
//! decision tree matching tagged identities against a set of pre-registered
//! boolean tag queries.

use std::fmt;
use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use crate::cache::{default_cache_supplier, CacheSupplier, QueryIndexConfig};
use crate::diagnostics::{self, HotSpot, IndexStats};
use crate::errors::QueryIndexError;
use crate::identity::{Identity, Lookup};
use crate::node::Node;
use crate::predicate::QueryExpr;
use crate::{insert, query, remove};

/// A concurrent index from boolean tag queries to registered values.
/// Readers (`find_matches`, `for_each_match`, `could_match`, ...) may run
/// concurrently with each other and with at most one in-flight writer
/// (`add`/`remove`); concurrent writers are serialized internally via a
/// single-writer guard, matching the contract in §5 and §7.
pub struct QueryIndex<V> {
    root: Arc<Node<V>>,
    cache_supplier: CacheSupplier,
    write_guard: Mutex<()>,
}

impl<V> QueryIndex<V>
where
    V: Clone + Eq + Send + Sync + 'static,
{
    /// Builds an index whose per-node `other_checks` caches are produced
    /// by `cache_supplier` (§6): a caller with its own cache implementation
    /// plugs it in here instead of the default `MokaResultCache`.
    pub fn new(cache_supplier: CacheSupplier) -> Self {
        info!("initializing query index");
        let root = Node::new_arc(cache_supplier.clone());
        root.ensure_key("name");
        QueryIndex { root, cache_supplier, write_guard: Mutex::new(()) }
    }

    /// Builds an index using the default `MokaResultCache` (§4.10).
    pub fn with_default_cache(config: QueryIndexConfig) -> Self {
        Self::new(default_cache_supplier(config))
    }

    /// Registers `value` under every DNF clause of `query` (§4.2). Returns
    /// [`QueryIndexError::MalformedQuery`] if `query` reduces to no clauses
    /// at all (i.e. is unsatisfiable, `QueryExpr::False`) -- adding a value
    /// under a query that can never match is almost certainly a caller bug.
    pub fn add(&self, query: &QueryExpr, value: V) -> Result<(), QueryIndexError> {
        let _guard = self.write_guard.lock();
        let clauses = query.dnf();
        if clauses.is_empty() {
            debug_assert!(false, "add called with an unsatisfiable query");
            return Err(QueryIndexError::MalformedQuery);
        }
        insert::add(&self.root, query, value, &self.cache_supplier);
        Ok(())
    }

    /// Removes `value` from every DNF clause of `query` (§4.3). Returns
    /// `true` iff `value` had been registered under at least one clause.
    pub fn remove(&self, query: &QueryExpr, value: &V) -> bool {
        let _guard = self.write_guard.lock();
        remove::remove(&self.root, query, value)
    }

    /// `true` iff no value is registered under any query (§3 invariant 2).
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// All values registered under a query that `identity` satisfies
    /// (§4.4), deduplicated.
    pub fn find_matches<I: Identity + ?Sized>(&self, identity: &I) -> Vec<V> {
        query::find_matches(&self.root, identity)
    }

    /// As [`Self::find_matches`], but invokes `f` once per match instead of
    /// allocating a `Vec`.
    pub fn for_each_match<I: Identity + ?Sized>(&self, identity: &I, f: impl FnMut(&V)) {
        query::for_each_match(&self.root, identity, f)
    }

    /// As [`Self::find_matches`], but against an ad-hoc, unordered
    /// `Lookup` rather than a pre-sorted `Identity` (§4.6).
    pub fn find_matches_by(&self, lookup: &dyn Lookup) -> Vec<V> {
        query::find_matches_by(&self.root, lookup)
    }

    /// As [`Self::for_each_match`], against an ad-hoc `Lookup` (§4.6).
    pub fn for_each_match_by(&self, lookup: &dyn Lookup, f: impl FnMut(&V)) {
        query::for_each_match_by(&self.root, lookup, f)
    }

    /// Conservative pre-filter over a partial tag lookup (§4.7): `false`
    /// means no query can possibly match; `true` means one might. Never
    /// under-accepts.
    pub fn could_match(&self, lookup: &dyn Lookup) -> bool {
        query::could_match(&self.root, lookup)
    }

    /// Nodes whose `other_checks` fan-out exceeds `threshold`, with the
    /// predicate path used to reach each one (§4.8).
    pub fn find_hot_spots(&self, threshold: usize) -> Vec<HotSpot> {
        diagnostics::find_hot_spots(&self.root, threshold)
    }

    /// Aggregate structural counters over the whole tree (§4.8).
    pub fn stats(&self) -> IndexStats {
        diagnostics::stats(&self.root)
    }
}

impl<V> fmt::Display for QueryIndex<V>
where
    V: Clone + Eq + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        diagnostics::fmt_node(&self.root, f, 0)
    }
}
