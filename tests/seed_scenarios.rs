//! The seed scenarios from the design notes (S1-S6): small, concrete
//! exercises of each predicate kind and of insert/remove interplay.

use tagdex::{Identity, KeyPredicate, QueryExpr, QueryIndex, Tags};

fn tags(pairs: &[(&str, &str)]) -> Tags {
    Tags::new(pairs.iter().map(|(k, v)| (*k, *v)))
}

#[test]
fn s1_simple_conjunction() {
    let index: QueryIndex<&'static str> = QueryIndex::with_default_cache(Default::default());
    let query = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
        QueryExpr::leaf(KeyPredicate::equal("app", "foo")),
    ]);
    index.add(&query, "V1").unwrap();

    assert_eq!(
        index.find_matches(&tags(&[("name", "cpu"), ("app", "foo"), ("host", "h1")])),
        vec!["V1"]
    );
    assert!(index.find_matches(&tags(&[("name", "cpu"), ("app", "bar")])).is_empty());
    assert!(index.find_matches(&tags(&[("name", "mem"), ("app", "foo")])).is_empty());
}

#[test]
fn s2_disjunction_dedups() {
    let index: QueryIndex<&'static str> = QueryIndex::with_default_cache(Default::default());
    let query = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
        QueryExpr::or([
            QueryExpr::leaf(KeyPredicate::equal("app", "foo")),
            QueryExpr::leaf(KeyPredicate::equal("app", "bar")),
        ]),
    ]);
    index.add(&query, "V2").unwrap();

    assert_eq!(index.find_matches(&tags(&[("name", "cpu"), ("app", "foo")])), vec!["V2"]);
}

#[test]
fn s3_not_equal_matches_absence() {
    let index: QueryIndex<&'static str> = QueryIndex::with_default_cache(Default::default());
    let query = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
        QueryExpr::leaf(KeyPredicate::not_equal("region", "us")),
    ]);
    index.add(&query, "V3").unwrap();

    assert_eq!(index.find_matches(&tags(&[("name", "cpu"), ("region", "eu")])), vec!["V3"]);
    assert_eq!(index.find_matches(&tags(&[("name", "cpu")])), vec!["V3"]);
    assert!(index.find_matches(&tags(&[("name", "cpu"), ("region", "us")])).is_empty());
}

#[test]
fn s4_regex_and_in() {
    let index: QueryIndex<&'static str> = QueryIndex::with_default_cache(Default::default());
    let query = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::regex("name", "^disk.*").unwrap()),
        QueryExpr::leaf(KeyPredicate::in_set("dev", ["sda", "sdb"])),
    ]);
    index.add(&query, "V4").unwrap();

    assert_eq!(index.find_matches(&tags(&[("name", "disk.read"), ("dev", "sda")])), vec!["V4"]);
    assert!(index.find_matches(&tags(&[("name", "disk.read"), ("dev", "sdc")])).is_empty());
    assert!(index.find_matches(&tags(&[("name", "network"), ("dev", "sda")])).is_empty());
}

#[test]
fn s5_has_key() {
    let index: QueryIndex<&'static str> = QueryIndex::with_default_cache(Default::default());
    let query = QueryExpr::leaf(KeyPredicate::has("zone"));
    index.add(&query, "V5").unwrap();

    assert_eq!(index.find_matches(&tags(&[("name", "x"), ("zone", "a")])), vec!["V5"]);
    assert!(index.find_matches(&tags(&[("name", "x")])).is_empty());
}

#[test]
fn s6_remove_leaves_only_surviving_queries() {
    let index: QueryIndex<&'static str> = QueryIndex::with_default_cache(Default::default());

    let q1 = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
        QueryExpr::leaf(KeyPredicate::equal("app", "foo")),
    ]);
    let q2 = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
        QueryExpr::or([
            QueryExpr::leaf(KeyPredicate::equal("app", "foo")),
            QueryExpr::leaf(KeyPredicate::equal("app", "bar")),
        ]),
    ]);
    let q3 = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::equal("name", "cpu")),
        QueryExpr::leaf(KeyPredicate::not_equal("region", "us")),
    ]);
    let q4 = QueryExpr::and([
        QueryExpr::leaf(KeyPredicate::regex("name", "^disk.*").unwrap()),
        QueryExpr::leaf(KeyPredicate::in_set("dev", ["sda", "sdb"])),
    ]);
    let q5 = QueryExpr::leaf(KeyPredicate::has("zone"));

    index.add(&q1, "V1").unwrap();
    index.add(&q2, "V2").unwrap();
    index.add(&q3, "V3").unwrap();
    index.add(&q4, "V4").unwrap();
    index.add(&q5, "V5").unwrap();

    assert!(index.remove(&q3, &"V3"));
    assert!(index.find_matches(&tags(&[("name", "cpu")])).is_empty());
}
