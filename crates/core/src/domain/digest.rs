use serde::{Deserialize, Serialize};

use crate::domain::article::ArticleEntry;
use crate::domain::profile::{Role, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationaleSource {
    Templated,
    Generated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    pub article: ArticleEntry,
    pub rationale: String,
    pub rationale_source: RationaleSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestResult {
    pub user_id: UserId,
    pub role: Role,
    pub items: Vec<DigestItem>,
    pub used_general_fallback: bool,
}

impl DigestResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn article_titles(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.article.title.as_str()).collect()
    }
}
