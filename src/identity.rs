//! The `Identity` abstraction this crate consumes from a caller's metric
//! registry, and a small concrete implementation (`Tags`) so the crate is
//! usable standalone.

use std::collections::HashMap;

/// An ordered sequence of `(key, value)` pairs with a distinguished `"name"`
/// pair always first; keys are unique and the rest are in lexicographic
/// order. This ordering is a contract shared with [`crate::QueryIndex`]'s
/// traversal (§9 of the design): an `Identity` that deviates will silently
/// miss matches.
pub trait Identity {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn key_at(&self, i: usize) -> &str;
    fn value_at(&self, i: usize) -> &str;
}

/// Key ordering contract: `"name"` first, then lexicographic.
pub(crate) fn key_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a == "name", b == "name") {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// A concrete, owned `Identity`: the tags of a single measurement.
///
/// Construction sorts and validates the tag set (`"name"` first, keys
/// unique, remainder lexicographic) so that every `Tags` value already
/// satisfies the ordering contract `QueryIndex` traversal depends on.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tags {
    pairs: Vec<(Box<str>, Box<str>)>,
}

impl Tags {
    /// Builds a `Tags` from an unordered iterator of pairs, sorting them
    /// into the canonical order. If `name` appears more than once, the
    /// last occurrence wins (mirrors a `HashMap::insert` overwrite).
    pub fn new<K, V, I>(pairs: I) -> Self
    where
        K: Into<Box<str>>,
        V: Into<Box<str>>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map: HashMap<Box<str>, Box<str>> = HashMap::new();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        let mut pairs: Vec<(Box<str>, Box<str>)> = map.into_iter().collect();
        pairs.sort_by(|(a, _), (b, _)| key_order(a, b));
        Tags { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_ref())
    }
}

impl Identity for Tags {
    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn key_at(&self, i: usize) -> &str {
        &self.pairs[i].0
    }

    fn value_at(&self, i: usize) -> &str {
        &self.pairs[i].1
    }
}

/// An unordered, ad-hoc `key -> value` view used by the `*_by` traversal
/// variants (§4.6) when the caller has no pre-sorted `Identity` at hand.
pub trait Lookup {
    fn get(&self, key: &str) -> Option<&str>;
}

impl Lookup for Tags {
    fn get(&self, key: &str) -> Option<&str> {
        Tags::get(self, key)
    }
}

impl Lookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(|v| v.as_str())
    }
}

impl<L: Lookup + ?Sized> Lookup for &L {
    fn get(&self, key: &str) -> Option<&str> {
        (**self).get(key)
    }
}
