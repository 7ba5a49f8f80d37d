use crate::record::StubRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deduplication key: normalized title, normalized author, category
///
/// Two records with equal keys are the same entity even when their other
/// fields (for example rating counts) differ. The category is part of the
/// key, so the same book listed under two categories yields two keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub title: String,
    pub author: String,
    pub category: String,
}

impl IdentityKey {
    pub fn new(title: &str, author: &str, category: &str) -> Self {
        Self {
            title: normalize(title),
            author: normalize(author),
            category: category.to_string(),
        }
    }

    /// Derives the key of a stub; an unset author counts as "n/a"
    pub fn from_stub(stub: &StubRecord) -> Self {
        Self::new(&stub.title, &stub.author.to_string(), &stub.category)
    }

    /// A key without a title identifies nothing and is never committed
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
    }

    /// Flat `title_author_category` form written to artifacts
    pub fn unique_id(&self) -> String {
        format!("{}_{}_{}", self.title, self.author, self.category)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_id())
    }
}

/// Trims, collapses internal whitespace and lowercases
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
