//! `KeyPredicate`, the boolean condition on a single tag key, and
//! `QueryExpr`, a minimal stand-in for the externally-owned query AST
//! (§1: "the query AST and its parser" is explicitly out of scope; this is
//! just enough of one to drive and test the index on its own).

use std::hash::{Hash, Hasher};

use crate::regex_prefix::PrefixRegex;

/// A boolean condition on a single tag key. Non-`Equal`/`Has` variants are
/// collectively the "other checks" (§3).
#[derive(Debug, Clone)]
pub enum KeyPredicate {
    Equal { key: Box<str>, value: Box<str> },
    Has { key: Box<str> },
    NotEqual { key: Box<str>, value: Box<str> },
    In { key: Box<str>, values: Vec<Box<str>> },
    Regex { key: Box<str>, pattern: Box<str>, compiled: PrefixRegex },
    Gt { key: Box<str>, value: Box<str> },
    Ge { key: Box<str>, value: Box<str> },
    Lt { key: Box<str>, value: Box<str> },
    Le { key: Box<str>, value: Box<str> },
    /// Conjunction of same-key predicates, formed by the index during
    /// insertion when a DNF clause carries more than one predicate on the
    /// same key (§3, §4.2).
    Composite { key: Box<str>, parts: Vec<KeyPredicate> },
}

impl KeyPredicate {
    pub fn equal(key: impl Into<Box<str>>, value: impl Into<Box<str>>) -> Self {
        KeyPredicate::Equal { key: key.into(), value: value.into() }
    }

    pub fn has(key: impl Into<Box<str>>) -> Self {
        KeyPredicate::Has { key: key.into() }
    }

    pub fn not_equal(key: impl Into<Box<str>>, value: impl Into<Box<str>>) -> Self {
        KeyPredicate::NotEqual { key: key.into(), value: value.into() }
    }

    pub fn in_set<K, V, I>(key: K, values: I) -> Self
    where
        K: Into<Box<str>>,
        V: Into<Box<str>>,
        I: IntoIterator<Item = V>,
    {
        let mut values: Vec<Box<str>> = values.into_iter().map(Into::into).collect();
        values.sort();
        values.dedup();
        KeyPredicate::In { key: key.into(), values }
    }

    pub fn regex(
        key: impl Into<Box<str>>,
        pattern: impl Into<Box<str>>,
    ) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let compiled = PrefixRegex::new(&pattern)?;
        Ok(KeyPredicate::Regex { key: key.into(), pattern, compiled })
    }

    pub fn gt(key: impl Into<Box<str>>, value: impl Into<Box<str>>) -> Self {
        KeyPredicate::Gt { key: key.into(), value: value.into() }
    }

    pub fn ge(key: impl Into<Box<str>>, value: impl Into<Box<str>>) -> Self {
        KeyPredicate::Ge { key: key.into(), value: value.into() }
    }

    pub fn lt(key: impl Into<Box<str>>, value: impl Into<Box<str>>) -> Self {
        KeyPredicate::Lt { key: key.into(), value: value.into() }
    }

    pub fn le(key: impl Into<Box<str>>, value: impl Into<Box<str>>) -> Self {
        KeyPredicate::Le { key: key.into(), value: value.into() }
    }

    pub fn key(&self) -> &str {
        match self {
            KeyPredicate::Equal { key, .. }
            | KeyPredicate::Has { key }
            | KeyPredicate::NotEqual { key, .. }
            | KeyPredicate::In { key, .. }
            | KeyPredicate::Regex { key, .. }
            | KeyPredicate::Gt { key, .. }
            | KeyPredicate::Ge { key, .. }
            | KeyPredicate::Lt { key, .. }
            | KeyPredicate::Le { key, .. }
            | KeyPredicate::Composite { key, .. } => key,
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, KeyPredicate::Equal { .. })
    }

    pub fn is_has(&self) -> bool {
        matches!(self, KeyPredicate::Has { .. })
    }

    pub fn is_in(&self) -> bool {
        matches!(self, KeyPredicate::In { .. })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, KeyPredicate::Regex { .. })
    }

    /// Whether `value` satisfies this predicate. Not meaningful for `Has`
    /// (callers branch on presence before ever calling `matches`).
    pub fn matches(&self, value: &str) -> bool {
        match self {
            KeyPredicate::Equal { value: v, .. } => v.as_ref() == value,
            KeyPredicate::Has { .. } => true,
            KeyPredicate::NotEqual { value: v, .. } => v.as_ref() != value,
            KeyPredicate::In { values, .. } => values.iter().any(|v| v.as_ref() == value),
            KeyPredicate::Regex { compiled, .. } => compiled.is_match(value),
            KeyPredicate::Gt { value: v, .. } => value > v.as_ref(),
            KeyPredicate::Ge { value: v, .. } => value >= v.as_ref(),
            KeyPredicate::Lt { value: v, .. } => value < v.as_ref(),
            KeyPredicate::Le { value: v, .. } => value <= v.as_ref(),
            KeyPredicate::Composite { parts, .. } => parts.iter().all(|p| p.matches(value)),
        }
    }

    /// True iff this predicate is satisfied by the key's entire absence
    /// (§3 invariant 6). Only `NotEqual` (and a `Composite` made entirely
    /// of such predicates) is satisfied by absence.
    pub fn matches_absent(&self) -> bool {
        match self {
            KeyPredicate::NotEqual { .. } => true,
            KeyPredicate::Composite { parts, .. } => parts.iter().all(|p| p.matches_absent()),
            _ => false,
        }
    }

    /// The longest literal prefix any matching value must begin with.
    /// Possibly empty, meaning "no pruning possible, always consult".
    pub fn prefix(&self) -> &str {
        match self {
            KeyPredicate::Equal { value, .. } => value,
            KeyPredicate::Regex { compiled, .. } => compiled.literal_prefix(),
            KeyPredicate::In { .. } => self.in_common_prefix(),
            KeyPredicate::Composite { parts, .. } => parts
                .iter()
                .map(|p| p.prefix())
                .max_by_key(|s| s.len())
                .unwrap_or(""),
            _ => "",
        }
    }

    fn in_common_prefix(&self) -> &str {
        let KeyPredicate::In { values, .. } = self else {
            return "";
        };
        let Some(first) = values.first() else {
            return "";
        };
        let mut len = first.len();
        for v in &values[1..] {
            len = common_prefix_len(&first[..len], v).min(len);
        }
        &first[..len]
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.char_indices())
        .take_while(|((_, ca), (_, cb))| ca == cb)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0)
}

/// `KeyPredicate` identity is structural, per §3: two predicates are equal
/// iff they carry the same key and the same matching semantics. A compiled
/// `Regex`'s engine is deterministic from its pattern, so it is excluded
/// from comparison.
impl PartialEq for KeyPredicate {
    fn eq(&self, other: &Self) -> bool {
        use KeyPredicate::*;
        match (self, other) {
            (Equal { key: k1, value: v1 }, Equal { key: k2, value: v2 }) => k1 == k2 && v1 == v2,
            (Has { key: k1 }, Has { key: k2 }) => k1 == k2,
            (NotEqual { key: k1, value: v1 }, NotEqual { key: k2, value: v2 }) => {
                k1 == k2 && v1 == v2
            }
            (In { key: k1, values: v1 }, In { key: k2, values: v2 }) => k1 == k2 && v1 == v2,
            (Regex { key: k1, pattern: p1, .. }, Regex { key: k2, pattern: p2, .. }) => {
                k1 == k2 && p1 == p2
            }
            (Gt { key: k1, value: v1 }, Gt { key: k2, value: v2 }) => k1 == k2 && v1 == v2,
            (Ge { key: k1, value: v1 }, Ge { key: k2, value: v2 }) => k1 == k2 && v1 == v2,
            (Lt { key: k1, value: v1 }, Lt { key: k2, value: v2 }) => k1 == k2 && v1 == v2,
            (Le { key: k1, value: v1 }, Le { key: k2, value: v2 }) => k1 == k2 && v1 == v2,
            (Composite { key: k1, parts: p1 }, Composite { key: k2, parts: p2 }) => {
                k1 == k2 && p1 == p2
            }
            _ => false,
        }
    }
}

impl Eq for KeyPredicate {}

impl Hash for KeyPredicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use KeyPredicate::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Equal { key, value } | NotEqual { key, value } | Gt { key, value }
            | Ge { key, value } | Lt { key, value } | Le { key, value } => {
                key.hash(state);
                value.hash(state);
            }
            Has { key } => key.hash(state),
            In { key, values } => {
                key.hash(state);
                values.hash(state);
            }
            Regex { key, pattern, .. } => {
                key.hash(state);
                pattern.hash(state);
            }
            Composite { key, parts } => {
                key.hash(state);
                parts.hash(state);
            }
        }
    }
}

/// A minimal boolean expression tree over `KeyPredicate` leaves, standing
/// in for the externally-owned query AST (§1, §6). Provides `dnf()`, the
/// only operation the index actually depends on.
#[derive(Debug, Clone)]
pub enum QueryExpr {
    True,
    False,
    Leaf(KeyPredicate),
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
    Not(Box<QueryExpr>),
}

impl QueryExpr {
    pub fn leaf(p: KeyPredicate) -> Self {
        QueryExpr::Leaf(p)
    }

    pub fn and(exprs: impl IntoIterator<Item = QueryExpr>) -> Self {
        QueryExpr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = QueryExpr>) -> Self {
        QueryExpr::Or(exprs.into_iter().collect())
    }

    pub fn not(expr: QueryExpr) -> Self {
        QueryExpr::Not(Box::new(expr))
    }

    /// Expands this expression to disjunctive normal form: a list of
    /// conjunctions (AND-lists) of `KeyPredicate` leaves. An empty
    /// AND-list denotes `TRUE` for that clause (§4.2 step 1); an overall
    /// empty result denotes `FALSE`.
    pub fn dnf(&self) -> Vec<Vec<KeyPredicate>> {
        dnf_clauses(&push_negations(self))
    }
}

fn push_negations(expr: &QueryExpr) -> QueryExpr {
    match expr {
        QueryExpr::True => QueryExpr::True,
        QueryExpr::False => QueryExpr::False,
        QueryExpr::Leaf(p) => QueryExpr::Leaf(p.clone()),
        QueryExpr::Not(inner) => negate(inner),
        QueryExpr::And(xs) => QueryExpr::And(xs.iter().map(push_negations).collect()),
        QueryExpr::Or(xs) => QueryExpr::Or(xs.iter().map(push_negations).collect()),
    }
}

/// Produces `push_negations(¬expr)` without ever re-introducing a `Not`.
fn negate(expr: &QueryExpr) -> QueryExpr {
    match expr {
        QueryExpr::True => QueryExpr::False,
        QueryExpr::False => QueryExpr::True,
        QueryExpr::Leaf(p) => match negate_predicate(p) {
            Some(np) => QueryExpr::Leaf(np),
            None => {
                debug_assert!(false, "predicate has no representable negation: {p:?}");
                QueryExpr::False
            }
        },
        QueryExpr::Not(inner) => push_negations(inner),
        QueryExpr::And(xs) => QueryExpr::Or(xs.iter().map(negate).collect()),
        QueryExpr::Or(xs) => QueryExpr::And(xs.iter().map(negate).collect()),
    }
}

fn negate_predicate(p: &KeyPredicate) -> Option<KeyPredicate> {
    match p {
        KeyPredicate::Equal { key, value } => {
            Some(KeyPredicate::NotEqual { key: key.clone(), value: value.clone() })
        }
        KeyPredicate::NotEqual { key, value } => {
            Some(KeyPredicate::Equal { key: key.clone(), value: value.clone() })
        }
        KeyPredicate::Gt { key, value } => {
            Some(KeyPredicate::Le { key: key.clone(), value: value.clone() })
        }
        KeyPredicate::Ge { key, value } => {
            Some(KeyPredicate::Lt { key: key.clone(), value: value.clone() })
        }
        KeyPredicate::Lt { key, value } => {
            Some(KeyPredicate::Ge { key: key.clone(), value: value.clone() })
        }
        KeyPredicate::Le { key, value } => {
            Some(KeyPredicate::Gt { key: key.clone(), value: value.clone() })
        }
        // `Has`, `In`, `Regex`, `Composite` have no single-predicate
        // complement representable in this minimal AST.
        _ => None,
    }
}

/// Assumes `expr` has already had its `Not` nodes pushed down to leaves.
fn dnf_clauses(expr: &QueryExpr) -> Vec<Vec<KeyPredicate>> {
    match expr {
        QueryExpr::True => vec![vec![]],
        QueryExpr::False => vec![],
        QueryExpr::Leaf(p) => vec![vec![p.clone()]],
        QueryExpr::Not(_) => unreachable!("push_negations eliminates Not nodes"),
        QueryExpr::And(xs) => xs
            .iter()
            .map(dnf_clauses)
            .fold(vec![vec![]], |acc, clauses| cross(&acc, &clauses)),
        QueryExpr::Or(xs) => xs.iter().flat_map(dnf_clauses).collect(),
    }
}

fn cross(
    acc: &[Vec<KeyPredicate>],
    clauses: &[Vec<KeyPredicate>],
) -> Vec<Vec<KeyPredicate>> {
    let mut out = Vec::with_capacity(acc.len() * clauses.len().max(1));
    for a in acc {
        for c in clauses {
            let mut combined = a.clone();
            combined.extend(c.iter().cloned());
            out.push(combined);
        }
    }
    out
}
