//! Tree mutation on removal (§4.3): mirrors `insert.rs`'s descent, pruning
//! empty children on the way back up so a query that no longer has any
//! registered value leaves no trace in the tree (§3 invariant 2).

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::trace;

use crate::insert::group_by_key;
use crate::node::Node;
use crate::predicate::{KeyPredicate, QueryExpr};

/// Removes `value` from every DNF clause of `query`. Returns `true` iff
/// `value` was registered under at least one clause.
pub(crate) fn remove<V>(root: &Arc<Node<V>>, query: &QueryExpr, value: &V) -> bool
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let mut removed_any = false;
    for clause in query.dnf() {
        let clause = group_by_key(clause);
        if remove_clause(root, &clause, value) {
            removed_any = true;
        }
    }
    removed_any
}

fn remove_clause<V>(node: &Arc<Node<V>>, clause: &[KeyPredicate], value: &V) -> bool
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let Some((head, tail)) = clause.split_first() else {
        return node.remove_match(value);
    };

    match node.key_str() {
        Some(existing) if existing == head.key() => {}
        _ => {
            // Either this node was never assigned a key (nothing to remove
            // along this path) or it's committed to a different key: either
            // way the clause, unmodified, belongs to `other_keys_idx`.
            return remove_via_child(&node.other_keys_idx, |child| remove_clause(child, clause, value));
        }
    }

    let mut removed = false;
    match head {
        KeyPredicate::Equal { value: v, .. } => {
            if let Some(child) = node.equal_checks.get(v.as_ref()).map(|e| Arc::clone(e.value())) {
                removed |= remove_clause(&child, tail, value);
                if child.is_empty() {
                    node.equal_checks.remove(v.as_ref());
                }
            }
        }
        KeyPredicate::Has { .. } => {
            removed |= remove_via_child(&node.has_key_idx, |child| remove_clause(child, tail, value));
        }
        other => {
            if let Some(child) = node.other_checks.get(other).map(|e| Arc::clone(e.value())) {
                removed |= remove_clause(&child, tail, value);
                if child.is_empty() {
                    trace!("pruning empty other_checks child for key {:?}", other.key());
                    node.remove_other_check_child(other);
                }
            }
        }
    }

    if head.matches_absent() {
        removed |= remove_via_child(&node.missing_keys_idx, |child| remove_clause(child, tail, value));
    }

    removed
}

fn remove_via_child<V>(ptr: &ArcSwapOption<Node<V>>, f: impl FnOnce(&Arc<Node<V>>) -> bool) -> bool
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let Some(child) = ptr.load_full() else { return false };
    let removed = f(&child);
    if child.is_empty() {
        ptr.store(None);
    }
    removed
}
