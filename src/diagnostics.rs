//! Structural diagnostics (§4.8): `find_hot_spots`, `IndexStats`, and the
//! indented `Display` dump of a node subtree.

use std::fmt;

use crate::node::Node;
use crate::predicate::KeyPredicate;

/// One step of the breadcrumb path `find_hot_spots` reports alongside each
/// over-populated node, so a caller can see which predicate led there.
#[derive(Debug, Clone)]
pub enum PathSegment {
    Equal { key: Box<str>, value: Box<str> },
    OtherCheck { key: Box<str>, description: Box<str> },
    HasKey { key: Box<str> },
    OtherKeys { key: Box<str> },
    MissingKeys { key: Box<str> },
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Equal { key, value } => write!(f, "{key}={value}"),
            PathSegment::OtherCheck { key, description } => write!(f, "{key}:{description}"),
            PathSegment::HasKey { key } => write!(f, "has({key})"),
            PathSegment::OtherKeys { key } => write!(f, "otherKeys({key})"),
            PathSegment::MissingKeys { key } => write!(f, "missingKeys({key})"),
        }
    }
}

/// A node whose `other_checks` fan-out exceeds the hot-spot threshold --
/// i.e. a node where a large number of distinct non-equality predicates
/// (ranges, regexes, set membership, ...) must all be probed on every
/// lookup that reaches it -- with the path taken to reach it and the
/// predicates responsible for the fan-out.
#[derive(Debug, Clone)]
pub struct HotSpot {
    pub path: Vec<PathSegment>,
    pub predicates: Vec<KeyPredicate>,
}

/// Aggregate counters over the whole tree (§4.8).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub node_count: usize,
    pub max_depth: usize,
    pub value_count: usize,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes:  {}", self.node_count)?;
        writeln!(f, "depth:  {}", self.max_depth)?;
        write!(f, "values: {}", self.value_count)
    }
}

pub(crate) fn stats<V>(root: &Node<V>) -> IndexStats
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let mut stats = IndexStats::default();
    walk_stats(root, 0, &mut stats);
    stats
}

fn walk_stats<V>(node: &Node<V>, depth: usize, stats: &mut IndexStats)
where
    V: Clone + Eq + Send + Sync + 'static,
{
    stats.node_count += 1;
    stats.max_depth = stats.max_depth.max(depth);
    stats.value_count += node.matches.load().len();

    for entry in node.equal_checks.iter() {
        walk_stats(entry.value(), depth + 1, stats);
    }
    for entry in node.other_checks.iter() {
        walk_stats(entry.value(), depth + 1, stats);
    }
    if let Some(child) = node.has_key_idx.load_full() {
        walk_stats(&child, depth + 1, stats);
    }
    if let Some(child) = node.other_keys_idx.load_full() {
        walk_stats(&child, depth + 1, stats);
    }
    if let Some(child) = node.missing_keys_idx.load_full() {
        walk_stats(&child, depth + 1, stats);
    }
}

/// Walks the whole tree collecting every node whose `other_checks` has
/// more than `threshold` entries, breadcrumbed by the path of predicates
/// taken to reach it (§4.8) -- useful for finding a single tag that is
/// accumulating an unreasonable number of distinct non-equality checks.
pub(crate) fn find_hot_spots<V>(root: &Node<V>, threshold: usize) -> Vec<HotSpot>
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let mut hot_spots = Vec::new();
    let mut path = Vec::new();
    walk_hot_spots(root, threshold, &mut path, &mut hot_spots);
    hot_spots
}

fn walk_hot_spots<V>(
    node: &Node<V>,
    threshold: usize,
    path: &mut Vec<PathSegment>,
    hot_spots: &mut Vec<HotSpot>,
) where
    V: Clone + Eq + Send + Sync + 'static,
{
    if node.other_checks.len() > threshold {
        let predicates = node.other_checks.iter().map(|entry| entry.key().clone()).collect();
        hot_spots.push(HotSpot { path: path.clone(), predicates });
    }

    let Some(key) = node.key_str() else { return };

    for entry in node.equal_checks.iter() {
        path.push(PathSegment::Equal { key: key.into(), value: entry.key().clone() });
        walk_hot_spots(entry.value(), threshold, path, hot_spots);
        path.pop();
    }
    for entry in node.other_checks.iter() {
        path.push(PathSegment::OtherCheck {
            key: key.into(),
            description: format!("{:?}", entry.key()).into_boxed_str(),
        });
        walk_hot_spots(entry.value(), threshold, path, hot_spots);
        path.pop();
    }
    if let Some(child) = node.has_key_idx.load_full() {
        path.push(PathSegment::HasKey { key: key.into() });
        walk_hot_spots(&child, threshold, path, hot_spots);
        path.pop();
    }
    if let Some(child) = node.other_keys_idx.load_full() {
        path.push(PathSegment::OtherKeys { key: key.into() });
        walk_hot_spots(&child, threshold, path, hot_spots);
        path.pop();
    }
    if let Some(child) = node.missing_keys_idx.load_full() {
        path.push(PathSegment::MissingKeys { key: key.into() });
        walk_hot_spots(&child, threshold, path, hot_spots);
        path.pop();
    }
}

/// Renders a node subtree as an indented, multi-section dump, in the
/// teacher's own `StrideStats`/`Display` style.
pub(crate) fn fmt_node<V>(node: &Node<V>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result
where
    V: Clone + Eq + Send + Sync + 'static,
{
    let pad = "  ".repeat(indent);
    let key = node.key_str().unwrap_or("<unset>");
    writeln!(f, "{pad}key: {key}")?;

    let matches = node.matches.load();
    if !matches.is_empty() {
        writeln!(f, "{pad}matches: {}", matches.len())?;
    }

    if !node.equal_checks.is_empty() {
        writeln!(f, "{pad}equal checks:")?;
        for entry in node.equal_checks.iter() {
            writeln!(f, "{pad}  = {}", entry.key())?;
            fmt_node(entry.value(), f, indent + 2)?;
        }
    }
    if !node.other_checks.is_empty() {
        writeln!(f, "{pad}other checks:")?;
        for entry in node.other_checks.iter() {
            writeln!(f, "{pad}  {:?}", entry.key())?;
            fmt_node(entry.value(), f, indent + 2)?;
        }
    }
    if let Some(child) = node.has_key_idx.load_full() {
        writeln!(f, "{pad}has key:")?;
        fmt_node(&child, f, indent + 1)?;
    }
    if let Some(child) = node.other_keys_idx.load_full() {
        writeln!(f, "{pad}other keys:")?;
        fmt_node(&child, f, indent + 1)?;
    }
    if let Some(child) = node.missing_keys_idx.load_full() {
        writeln!(f, "{pad}missing keys:")?;
        fmt_node(&child, f, indent + 1)?;
    }
    Ok(())
}
