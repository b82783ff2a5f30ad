//! Read-path traversal: `for_each_match`/`find_matches` against an ordered
//! `Identity` (§4.4), the other-checks cache lookup (§4.5), the `*_by`
//! variants against an ad-hoc `Lookup` (§4.6), and `could_match` (§4.7).

use crate::identity::{key_order, Identity, Lookup};
use crate::node::Node;
use crate::predicate::KeyPredicate;

/// The other-checks predicates applicable to `value` at `node`: those
/// whose literal prefix `value` starts with, and whose full `matches`
/// check passes. Consults the per-node cache before falling back to a
/// prefix-tree walk (§4.5).
fn applicable_other_checks<V>(node: &Node<V>, value: &str) -> Vec<KeyPredicate>
where
    V: Clone + Eq + Send + Sync + 'static,
{
    if let Some(cached) = node.cached_applicable(value) {
        return cached;
    }
    let mut applicable = Vec::new();
    node.other_checks_tree.read().for_each(value, |p| {
        if p.matches(value) {
            applicable.push(p.clone());
        }
    });
    node.cache_applicable(value, applicable.clone());
    applicable
}

/// Ordered traversal against an `Identity` (§4.4). `j` is the cursor: the
/// lowest index in `identity` not yet "spent" on an ancestor's equal/other
/// check. The has-key and other-keys branches deliberately re-enter at `j`
/// rather than one past the matched position (§9 Open Question, preserved
/// in DESIGN.md) -- neither branch consumed the tag at `j`, so later tags
/// must still be checked starting there.
fn for_each_match_at<V, I>(node: &Node<V>, identity: &I, j: usize, out: &mut Vec<V>)
where
    V: Clone + Eq + Send + Sync + 'static,
    I: Identity + ?Sized,
{
    for m in node.matches.load().iter() {
        if !out.contains(m) {
            out.push(m.clone());
        }
    }

    let Some(key) = node.key_str() else { return };

    let mut idx = j;
    while idx < identity.len() && key_order(identity.key_at(idx), key) == std::cmp::Ordering::Less {
        idx += 1;
    }

    if idx < identity.len() && identity.key_at(idx) == key {
        let value = identity.value_at(idx);

        if let Some(child) = node.equal_checks.get(value) {
            for_each_match_at(child.value(), identity, idx + 1, out);
        }
        for pred in applicable_other_checks(node, value) {
            if let Some(child) = node.other_checks.get(&pred) {
                for_each_match_at(child.value(), identity, idx + 1, out);
            }
        }
        if let Some(child) = node.has_key_idx.load_full() {
            for_each_match_at(&child, identity, idx, out);
        }
        if let Some(child) = node.other_keys_idx.load_full() {
            for_each_match_at(&child, identity, idx, out);
        }
    } else {
        if let Some(child) = node.missing_keys_idx.load_full() {
            for_each_match_at(&child, identity, idx, out);
        }
        if let Some(child) = node.other_keys_idx.load_full() {
            for_each_match_at(&child, identity, idx, out);
        }
    }
}

/// Invokes `f` once for every value registered under a query that
/// `identity` satisfies (deduplicated: a value reachable via more than one
/// DNF clause of the same query is only reported once).
pub(crate) fn for_each_match<V, I>(root: &Node<V>, identity: &I, mut f: impl FnMut(&V))
where
    V: Clone + Eq + Send + Sync + 'static,
    I: Identity + ?Sized,
{
    let mut out = Vec::new();
    for_each_match_at(root, identity, 0, &mut out);
    for v in &out {
        f(v);
    }
}

pub(crate) fn find_matches<V, I>(root: &Node<V>, identity: &I) -> Vec<V>
where
    V: Clone + Eq + Send + Sync + 'static,
    I: Identity + ?Sized,
{
    let mut out = Vec::new();
    for_each_match_at(root, identity, 0, &mut out);
    out
}

/// Traversal against an ad-hoc, unordered `Lookup` (§4.6). Since `Lookup`
/// offers no cursor, every branch simply re-queries `lookup.get(key)`
/// directly rather than scanning forward.
fn for_each_match_by_at<V>(node: &Node<V>, lookup: &dyn Lookup, out: &mut Vec<V>)
where
    V: Clone + Eq + Send + Sync + 'static,
{
    for m in node.matches.load().iter() {
        if !out.contains(m) {
            out.push(m.clone());
        }
    }

    let Some(key) = node.key_str() else { return };

    match lookup.get(key) {
        Some(value) => {
            if let Some(child) = node.equal_checks.get(value) {
                for_each_match_by_at(child.value(), lookup, out);
            }
            for pred in applicable_other_checks(node, value) {
                if let Some(child) = node.other_checks.get(&pred) {
                    for_each_match_by_at(child.value(), lookup, out);
                }
            }
            if let Some(child) = node.has_key_idx.load_full() {
                for_each_match_by_at(&child, lookup, out);
            }
            if let Some(child) = node.other_keys_idx.load_full() {
                for_each_match_by_at(&child, lookup, out);
            }
        }
        None => {
            if let Some(child) = node.missing_keys_idx.load_full() {
                for_each_match_by_at(&child, lookup, out);
            }
            if let Some(child) = node.other_keys_idx.load_full() {
                for_each_match_by_at(&child, lookup, out);
            }
        }
    }
}

pub(crate) fn for_each_match_by<V>(root: &Node<V>, lookup: &dyn Lookup, mut f: impl FnMut(&V))
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let mut out = Vec::new();
    for_each_match_by_at(root, lookup, &mut out);
    for v in &out {
        f(v);
    }
}

pub(crate) fn find_matches_by<V>(root: &Node<V>, lookup: &dyn Lookup) -> Vec<V>
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let mut out = Vec::new();
    for_each_match_by_at(root, lookup, &mut out);
    out
}

/// The cheap acceptance test `could_match` applies to an other-checks
/// candidate (§4.7): `In` and `Regex` are accepted unconditionally once
/// their prefix has already passed `other_checks_tree.exists` (full set
/// membership / regex evaluation is deferred to the real matcher), every
/// other variant gets the real `matches` check since it's no more
/// expensive than the prefix check itself.
fn could_match_predicate(kq: &KeyPredicate, value: &str) -> bool {
    match kq {
        KeyPredicate::In { .. } | KeyPredicate::Regex { .. } => true,
        _ => kq.matches(value),
    }
}

/// Conservative pre-filter (§4.7): `true` means "a fuller lookup might
/// still match"; `false` means "definitely cannot match." Never
/// under-accepts: an absent key returns `true` regardless of whether a
/// `missing_keys_idx` branch exists, because a partial `Lookup` not having
/// a key doesn't mean the real identity won't (§9 Open Question, preserved
/// in DESIGN.md). Unlike `for_each_match`, consults `other_checks_tree`
/// directly rather than through the cache -- this is a cheap pre-filter,
/// not the authoritative match.
fn could_match_at<V>(node: &Node<V>, lookup: &dyn Lookup) -> bool
where
    V: Clone + Eq + Send + Sync + 'static,
{
    if !node.matches.load().is_empty() {
        return true;
    }

    let Some(key) = node.key_str() else { return true };

    match lookup.get(key) {
        Some(value) => {
            if let Some(child) = node.equal_checks.get(value) {
                if could_match_at(child.value(), lookup) {
                    return true;
                }
            }
            let other_checks_apply = node.other_checks_tree.read().exists(value, |kq| {
                could_match_predicate(kq, value)
                    && node.other_checks.get(kq).is_some_and(|child| could_match_at(child.value(), lookup))
            });
            if other_checks_apply {
                return true;
            }
            if let Some(child) = node.has_key_idx.load_full() {
                if could_match_at(&child, lookup) {
                    return true;
                }
            }
            if let Some(child) = node.other_keys_idx.load_full() {
                if could_match_at(&child, lookup) {
                    return true;
                }
            }
            false
        }
        None => true,
    }
}

pub(crate) fn could_match<V>(root: &Node<V>, lookup: &dyn Lookup) -> bool
where
    V: Clone + Eq + Send + Sync + 'static,
{
    could_match_at(root, lookup)
}
