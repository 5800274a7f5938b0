//! Side values
//!
//! Each side of a match entry is either a single leaf or a grouping of keyed
//! children (a show holding seasons holding episodes). Groupings keep their
//! insertion order, which is what makes expansion deterministic.

use crate::key::SubKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A leaf item or an insertion-ordered grouping of sub-values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side<T> {
    Leaf(T),
    Group(IndexMap<SubKey, Side<T>>),
}

/// Shape of a side value, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideShape {
    Absent,
    Leaf,
    Group,
}

impl fmt::Display for SideShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SideShape::Absent => "absent",
            SideShape::Leaf => "leaf",
            SideShape::Group => "group",
        };
        f.write_str(name)
    }
}

impl<T> Side<T> {
    pub fn leaf(item: T) -> Self {
        Side::Leaf(item)
    }

    /// Build a grouping; children keep the order they are given in.
    pub fn group<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, Side<T>)>,
        K: Into<SubKey>,
    {
        Side::Group(
            children
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Side::Group(_))
    }

    pub fn shape(&self) -> SideShape {
        match self {
            Side::Leaf(_) => SideShape::Leaf,
            Side::Group(_) => SideShape::Group,
        }
    }

    /// Shape of an optional side; `None` is [`SideShape::Absent`].
    pub fn shape_of(side: Option<&Self>) -> SideShape {
        side.map(Side::shape).unwrap_or(SideShape::Absent)
    }

    /// Number of leaves reachable from this value.
    pub fn leaf_count(&self) -> usize {
        match self {
            Side::Leaf(_) => 1,
            Side::Group(children) => children.values().map(Side::leaf_count).sum(),
        }
    }

    /// All reachable leaves in iteration order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Side::Leaf(item) => out.push(item),
            Side::Group(children) => {
                for child in children.values() {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

impl<T: fmt::Display> fmt::Display for Side<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Leaf(item) => write!(f, "{}", item),
            Side::Group(children) => {
                f.write_str("{")?;
                for (i, (key, value)) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}
