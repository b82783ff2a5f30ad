//! Tree mutation on insertion (§4.2): DNF expansion, per-clause key
//! grouping, and the present/has/other three-way descent that builds the
//! decision-tree structure one DNF clause at a time.

use std::sync::Arc;

use log::{debug, trace};

use crate::cache::CacheSupplier;
use crate::identity::key_order;
use crate::node::Node;
use crate::predicate::{KeyPredicate, QueryExpr};

/// Sorts `clause` by `key_order` and folds consecutive same-key predicates
/// into a single `Composite` (§3, §4.2 step 1): a clause produced by DNF
/// expansion may carry more than one predicate on the same key (e.g. a
/// range expressed as `Gt` and `Lt` on the same tag).
pub(crate) fn group_by_key(mut clause: Vec<KeyPredicate>) -> Vec<KeyPredicate> {
    clause.sort_by(|a, b| key_order(a.key(), b.key()));
    let mut grouped: Vec<KeyPredicate> = Vec::with_capacity(clause.len());
    for p in clause {
        let same_key = grouped.last().is_some_and(|prev| prev.key() == p.key());
        if same_key {
            let prev = grouped.pop().expect("just checked non-empty");
            let key = prev.key().to_owned().into_boxed_str();
            let parts = match prev {
                KeyPredicate::Composite { parts, .. } => {
                    let mut parts = parts;
                    parts.push(p);
                    parts
                }
                other => vec![other, p],
            };
            grouped.push(KeyPredicate::Composite { key, parts });
        } else {
            grouped.push(p);
        }
    }
    grouped
}

/// Registers `value` for every DNF clause of `query` (§4.2).
pub(crate) fn add<V>(
    root: &Arc<Node<V>>,
    query: &QueryExpr,
    value: V,
    cache_supplier: &CacheSupplier,
) where
    V: Clone + Eq + Send + Sync + 'static,
{
    let clauses = query.dnf();
    debug!("add: expanded query into {} DNF clause(s)", clauses.len());
    for clause in clauses {
        let clause = group_by_key(clause);
        insert_clause(root, &clause, value.clone(), cache_supplier);
    }
}

fn insert_clause<V>(
    node: &Arc<Node<V>>,
    clause: &[KeyPredicate],
    value: V,
    cache_supplier: &CacheSupplier,
) where
    V: Clone + Eq + Send + Sync + 'static,
{
    let Some((head, tail)) = clause.split_first() else {
        node.add_match(value);
        return;
    };

    match node.key_str() {
        Some(existing) if existing != head.key() => {
            // This node already committed to a different key; defer the
            // whole remaining clause (including `head`) to `other_keys_idx`,
            // which will commit to `head`'s key itself.
            let child = Node::child_or_create(&node.other_keys_idx, cache_supplier);
            insert_clause(&child, clause, value, cache_supplier);
            return;
        }
        _ => node.ensure_key(head.key()),
    }

    let child = match head {
        KeyPredicate::Equal { value: v, .. } => node.equal_child_or_create(v, cache_supplier),
        KeyPredicate::Has { .. } => Node::child_or_create(&node.has_key_idx, cache_supplier),
        other => node.other_check_child_or_create(other, cache_supplier),
    };
    insert_clause(&child, tail, value.clone(), cache_supplier);

    if head.matches_absent() {
        trace!("mirroring predicate on key {:?} into missing_keys_idx", head.key());
        let child = Node::child_or_create(&node.missing_keys_idx, cache_supplier);
        insert_clause(&child, tail, value, cache_supplier);
    }
}
