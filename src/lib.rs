//! A concurrent, read-mostly decision tree for matching tagged identities
//! against a large set of pre-registered boolean tag predicates (a "tag
//! query index"): the hot-path lookup that, given a freshly measured
//! metric's tags, finds every subscription/alert/rollup query it should be
//! published to, without scanning the whole query set per measurement.
//!
//! Queries are expanded into disjunctive normal form on insertion and
//! folded into a tree keyed first by tag key, then by tag value, so a
//! lookup only walks branches whose predicates the probed identity could
//! actually satisfy. See `DESIGN.md` for how this maps onto the pieces
//! below, and `SPEC_FULL.md` for the full behavioral contract.

mod cache;
mod diagnostics;
mod errors;
mod identity;
mod index;
mod insert;
mod node;
mod once;
mod predicate;
mod prefix_tree;
mod query;
mod regex_prefix;
mod remove;

pub use cache::{CacheSupplier, MokaResultCache, QueryIndexConfig, ResultCache};
pub use diagnostics::{HotSpot, IndexStats, PathSegment};
pub use errors::QueryIndexError;
pub use identity::{Identity, Lookup, Tags};
pub use index::QueryIndex;
pub use predicate::{KeyPredicate, QueryExpr};
pub use regex_prefix::PrefixRegex;
