use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::profile::Role;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArticleId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleEntry {
    pub id: ArticleId,
    pub title: String,
    pub link: String,
    pub source: String,
    pub summary: String,
    pub published: NaiveDate,
    pub tags: BTreeSet<Role>,
}

impl ArticleEntry {
    pub fn is_tagged(&self, role: Role) -> bool {
        self.tags.contains(&role)
    }

    /// Case-insensitive substring match against title and summary.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.title.to_lowercase().contains(&needle) || self.summary.to_lowercase().contains(&needle)
    }

    pub fn primary_tag(&self) -> Option<Role> {
        self.tags.iter().next().copied()
    }
}
