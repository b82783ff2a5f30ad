//! A thin wrapper around the `regex` crate that precomputes the literal
//! prefix any match must begin with (§3: "for `Regex`, the longest string
//! that any matching input must begin with"). The index consumes only this
//! prefix-extraction and anchored-match capability from the regex engine
//! (§1): full engine semantics are an external collaborator's concern.

use regex::Regex;
use regex_syntax::hir::{Hir, HirKind, Literal};
use regex_syntax::Parser;

#[derive(Debug, Clone)]
pub struct PrefixRegex {
    regex: Regex,
    prefix: Box<str>,
}

impl PrefixRegex {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        let prefix = Parser::new()
            .parse(pattern)
            .ok()
            .map(|hir| literal_prefix(&hir))
            .unwrap_or_default();
        Ok(PrefixRegex { regex, prefix: prefix.into_boxed_str() })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn literal_prefix(&self) -> &str {
        &self.prefix
    }

    /// Matches `value` against the pattern, on the assumption that the
    /// caller has already confirmed `value` begins with `literal_prefix()`
    /// via the prefix tree (§4.6): still runs the full regex, since the
    /// literal prefix alone never implies the rest of the pattern matches.
    pub fn matches_after_prefix(&self, value: &str) -> bool {
        debug_assert!(value.starts_with(self.literal_prefix()));
        self.is_match(value)
    }
}

/// Extracts the longest fixed literal string every match of `hir` must
/// begin with. Returns an empty string when the pattern has no required
/// literal prefix (e.g. it starts with `.`, a class, or an alternation
/// whose branches disagree).
fn literal_prefix(hir: &Hir) -> String {
    match hir.kind() {
        HirKind::Literal(Literal(bytes)) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        HirKind::Concat(parts) => {
            let mut out = String::new();
            for part in parts {
                let p = literal_prefix(part);
                let exhausted = p.len() < exact_literal_len(part);
                out.push_str(&p);
                if exhausted {
                    break;
                }
            }
            out
        }
        HirKind::Capture(cap) => literal_prefix(&cap.sub),
        _ => String::new(),
    }
}

/// The length of the literal this sub-expression matches, if it matches
/// exactly one fixed string (used to decide whether `Concat` can keep
/// pulling prefix material from the next sibling).
fn exact_literal_len(hir: &Hir) -> usize {
    match hir.kind() {
        HirKind::Literal(Literal(bytes)) => bytes.len(),
        HirKind::Capture(cap) => exact_literal_len(&cap.sub),
        _ => usize::MAX,
    }
}
