//! Property tests for the testable invariants in the design notes:
//! soundness, completeness, dedup, ordered/unordered equivalence,
//! insert/remove roundtrip, `could_match` safety, and cache transparency.

use proptest::prelude::*;
use tagdex::{KeyPredicate, Lookup, QueryExpr, QueryIndex, Tags};

const NAMES: [&str; 2] = ["cpu", "mem"];
const APPS: [&str; 3] = ["foo", "bar", "baz"];
const HOSTS: [&str; 3] = ["h1", "h2", "h3"];

/// An independent, structure-free evaluator for `QueryExpr` against a
/// `Lookup`: the oracle property tests check the tree-based index against.
fn eval(expr: &QueryExpr, lookup: &dyn Lookup) -> bool {
    match expr {
        QueryExpr::True => true,
        QueryExpr::False => false,
        QueryExpr::Leaf(p) => match lookup.get(p.key()) {
            Some(v) => p.matches(v),
            None => p.matches_absent(),
        },
        QueryExpr::And(xs) => xs.iter().all(|x| eval(x, lookup)),
        QueryExpr::Or(xs) => xs.iter().any(|x| eval(x, lookup)),
        QueryExpr::Not(_) => unreachable!("test queries never construct Not"),
    }
}

fn leaf_strategy() -> impl Strategy<Value = QueryExpr> {
    prop_oneof![
        (prop::sample::select(&APPS[..])).prop_map(|v| QueryExpr::leaf(KeyPredicate::equal("app", v))),
        (prop::sample::select(&APPS[..]))
            .prop_map(|v| QueryExpr::leaf(KeyPredicate::not_equal("app", v))),
        (prop::sample::select(&HOSTS[..])).prop_map(|v| QueryExpr::leaf(KeyPredicate::equal("host", v))),
        Just(QueryExpr::leaf(KeyPredicate::has("region"))),
    ]
}

/// `name == <n> AND <rest>`, where `<rest>` is an AND or OR of 1-3 leaves.
fn query_strategy() -> impl Strategy<Value = QueryExpr> {
    (
        prop::sample::select(&NAMES[..]),
        prop::collection::vec(leaf_strategy(), 1..=3),
        any::<bool>(),
    )
        .prop_map(|(name, leaves, is_and)| {
            let rest = if is_and { QueryExpr::and(leaves) } else { QueryExpr::or(leaves) };
            QueryExpr::and([QueryExpr::leaf(KeyPredicate::equal("name", name)), rest])
        })
}

fn identity_strategy() -> impl Strategy<Value = Tags> {
    (
        prop::sample::select(&NAMES[..]),
        prop::option::of(prop::sample::select(&APPS[..])),
        prop::option::of(prop::sample::select(&HOSTS[..])),
        prop::option::of("a|b"),
    )
        .prop_map(|(name, app, host, region)| {
            let mut pairs = vec![("name", name)];
            if let Some(app) = app {
                pairs.push(("app", app));
            }
            if let Some(host) = host {
                pairs.push(("host", host));
            }
            if let Some(region) = &region {
                pairs.push(("region", region.as_str()));
            }
            Tags::new(pairs)
        })
}

fn single_query_index(query: &QueryExpr) -> QueryIndex<u32> {
    let index = QueryIndex::with_default_cache(Default::default());
    index.add(query, 1).unwrap();
    index
}

proptest! {
    /// Soundness + completeness together: `find_matches` returns exactly
    /// `{1}` when the oracle says the query is satisfied, and `{}` when
    /// it isn't.
    #[test]
    fn soundness_and_completeness(query in query_strategy(), identity in identity_strategy()) {
        let index = single_query_index(&query);
        let expected = eval(&query, &identity);
        let found = index.find_matches(&identity);
        prop_assert_eq!(!found.is_empty(), expected);
    }

    /// A value reachable through more than one DNF branch of the same
    /// query is reported once.
    #[test]
    fn dedup(identity in identity_strategy()) {
        let query = QueryExpr::and([
            QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
            QueryExpr::or([
                QueryExpr::leaf(KeyPredicate::equal("app", "foo")),
                QueryExpr::leaf(KeyPredicate::not_equal("app", "bar")),
            ]),
        ]);
        let index = single_query_index(&query);
        let found = index.find_matches(&identity);
        prop_assert!(found.len() <= 1);
    }

    /// `find_matches` against an ordered `Identity` and `find_matches_by`
    /// against the same data as an unordered `Lookup` agree.
    #[test]
    fn ordered_vs_unordered_equivalence(query in query_strategy(), identity in identity_strategy()) {
        let index = single_query_index(&query);
        let ordered = index.find_matches(&identity);
        let unordered = index.find_matches_by(&identity);
        prop_assert_eq!(ordered, unordered);
    }

    /// `add` then `remove` of the same `(query, value)` restores the prior
    /// `find_matches` behavior (and structural emptiness, if the index was
    /// empty before).
    #[test]
    fn insert_remove_roundtrip(query in query_strategy(), identity in identity_strategy()) {
        let index: QueryIndex<u32> = QueryIndex::with_default_cache(Default::default());
        prop_assert!(index.is_empty());
        let before = index.find_matches(&identity);

        index.add(&query, 7).unwrap();
        prop_assert!(index.remove(&query, &7));

        prop_assert!(index.is_empty());
        prop_assert_eq!(index.find_matches(&identity), before);
    }

    /// If a full identity matches, `could_match` over any subset of its
    /// tags must also return `true` (never under-accepts).
    #[test]
    fn could_match_never_under_accepts(query in query_strategy(), identity in identity_strategy()) {
        let index = single_query_index(&query);
        if !index.find_matches(&identity).is_empty() {
            prop_assert!(index.could_match(&identity));
            // A strictly smaller view (just "name") must still be accepted.
            let partial = Tags::new([("name", identity.get("name").unwrap())]);
            prop_assert!(index.could_match(&partial));
        }
    }

    /// Results are identical across a cold cache, a warm cache (primed by
    /// a prior lookup), and a cache cleared mid-sequence by an unrelated
    /// structural change.
    #[test]
    fn cache_transparency(query in query_strategy(), identity in identity_strategy()) {
        let index = single_query_index(&query);
        let cold = index.find_matches(&identity);
        let warm = index.find_matches(&identity);
        prop_assert_eq!(&cold, &warm);

        // Force a cache-invalidating structural change elsewhere in the
        // tree, then check the original query is unaffected.
        let unrelated = QueryExpr::leaf(KeyPredicate::regex("app", "^z.*").unwrap());
        index.add(&unrelated, 999).unwrap();
        index.remove(&unrelated, &999);

        prop_assert_eq!(index.find_matches(&identity), cold);
    }
}
