//! Eager-load specifications.
//!
//! [`Include`] mirrors the shape callers write (`[:address, { books:
//! :publisher }]` style trees).  Query handles normalise a list of includes
//! into an [`IncludeTree`] before preloading.

use std::collections::BTreeMap;
use std::fmt;

/// One node of an eager-load specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Include {
    /// Load a single relation.
    Relation(String),
    /// Load each relation, then the nested spec below it.
    Nested(Vec<(String, Include)>),
    /// Load every element.
    List(Vec<Include>),
}

impl Include {
    pub fn relation(name: impl Into<String>) -> Self {
        Self::Relation(name.into())
    }

    pub fn nested(name: impl Into<String>, inner: Include) -> Self {
        Self::Nested(vec![(name.into(), inner)])
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relation(name) => write!(f, "{name}"),
            Self::Nested(entries) => {
                write!(f, "{{")?;
                for (i, (name, inner)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {inner}")?;
                }
                write!(f, "}}")
            }
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Normalised eager-load tree: relation name → relations to load below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: BTreeMap<String, IncludeTree>,
}

impl IncludeTree {
    /// Merge a list of includes into one tree.
    pub fn from_includes(includes: &[Include]) -> Self {
        let mut tree = Self::default();
        for include in includes {
            tree.merge(include);
        }
        tree
    }

    fn merge(&mut self, include: &Include) {
        match include {
            Include::Relation(name) => {
                self.children.entry(name.clone()).or_default();
            }
            Include::Nested(entries) => {
                for (name, inner) in entries {
                    self.children.entry(name.clone()).or_default().merge(inner);
                }
            }
            Include::List(items) => {
                for item in items {
                    self.merge(item);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn contains(&self, relation: &str) -> bool {
        self.children.contains_key(relation)
    }

    /// The nested tree for `relation`, if that relation is to be loaded.
    pub fn get(&self, relation: &str) -> Option<&IncludeTree> {
        self.children.get(relation)
    }

    /// Top-level relation names, sorted.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }
}
