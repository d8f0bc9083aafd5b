//! Article catalog behind the `ArticleSource` seam.
//!
//! `StaticCatalog` serves a fixed mock catalog. Real ingestion would plug in
//! another `ArticleSource` without touching the curator.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::article::{ArticleEntry, ArticleId};
use crate::domain::profile::Role;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArticleSourceError {
    #[error("article source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Entries tagged with any role in `tags`, in catalog order.
    async fn candidates(
        &self,
        tags: &BTreeSet<Role>,
    ) -> Result<Vec<ArticleEntry>, ArticleSourceError>;

    /// Role-agnostic subset used when nothing matches a profile.
    async fn general(&self, limit: usize) -> Result<Vec<ArticleEntry>, ArticleSourceError>;
}

#[derive(Clone, Debug)]
pub struct StaticCatalog {
    entries: Vec<ArticleEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<ArticleEntry>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_entries())
    }

    pub fn entries(&self) -> &[ArticleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl ArticleSource for StaticCatalog {
    async fn candidates(
        &self,
        tags: &BTreeSet<Role>,
    ) -> Result<Vec<ArticleEntry>, ArticleSourceError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.tags.iter().any(|tag| tags.contains(tag)))
            .cloned()
            .collect())
    }

    async fn general(&self, limit: usize) -> Result<Vec<ArticleEntry>, ArticleSourceError> {
        Ok(self.entries.iter().take(limit).cloned().collect())
    }
}

struct Seed {
    id: &'static str,
    title: &'static str,
    link: &'static str,
    source: &'static str,
    summary: &'static str,
    tags: &'static [Role],
}

const PUBLISHED: (i32, u32, u32) = (2025, 7, 15);

const SEEDS: &[Seed] = &[
    Seed {
        id: "gpt5-release",
        title: "OpenAI Releases GPT-5 with Breakthrough Reasoning Capabilities",
        link: "https://techcrunch.com/gpt5-release",
        source: "TechCrunch",
        summary: "OpenAI's latest model shows significant improvements in mathematical reasoning and code generation, potentially transforming how developers work with AI...",
        tags: &[Role::AiMl],
    },
    Seed {
        id: "react-compiler",
        title: "Meta's New React Compiler Reduces Bundle Sizes by 40%",
        link: "https://react.dev/compiler-announcement",
        source: "React Blog",
        summary: "The experimental React compiler automatically optimizes components, eliminating the need for manual memoization in most cases...",
        tags: &[Role::Engineering],
    },
    Seed {
        id: "yc-demo-day-s25",
        title: "Y Combinator Demo Day: AI Startups Dominate S25 Batch",
        link: "https://techcrunch.com/yc-demo-day-2025",
        source: "TechCrunch",
        summary: "Over 60% of Y Combinator's summer 2025 batch focuses on AI applications, with notable companies in healthcare, developer tools, and robotics...",
        tags: &[Role::Business],
    },
    Seed {
        id: "figma-ai-design-systems",
        title: "Figma Introduces AI-Powered Design System Generator",
        link: "https://figma.com/ai-design-systems",
        source: "Figma Blog",
        summary: "Designers can now generate comprehensive design systems from simple prompts, including components, tokens, and documentation...",
        tags: &[Role::Design],
    },
    Seed {
        id: "stripe-embedded-finance",
        title: "Stripe Launches Embedded Financial Services for SaaS",
        link: "https://stripe.com/embedded-finance",
        source: "Stripe Blog",
        summary: "SaaS companies can now offer banking, lending, and payment services directly to their customers through Stripe's new platform...",
        tags: &[Role::Product, Role::Business],
    },
    Seed {
        id: "ethereum-l2-fees",
        title: "Ethereum Layer-2 Fees Drop Below a Cent After Blob Expansion",
        link: "https://coindesk.com/ethereum-l2-fees",
        source: "CoinDesk",
        summary: "Rollups report record throughput as expanded blob capacity pushes average transaction costs down, reviving interest in on-chain consumer apps...",
        tags: &[Role::Crypto],
    },
    Seed {
        id: "defi-lending-tvl",
        title: "DeFi Lending Protocols Hit Record Total Value Locked",
        link: "https://cointelegraph.com/defi-lending-record",
        source: "Cointelegraph",
        summary: "Aave and its competitors crossed new highs in deposits as institutional desks experiment with on-chain trading and collateralized lending...",
        tags: &[Role::Crypto],
    },
    Seed {
        id: "stablecoin-bill",
        title: "Stablecoin Bill Clears Senate Committee With Bipartisan Support",
        link: "https://coindesk.com/stablecoin-bill-committee",
        source: "CoinDesk",
        summary: "The proposed framework sets reserve and audit requirements for dollar-backed stablecoins, a step payment companies and exchanges have lobbied for...",
        tags: &[Role::Crypto, Role::Business],
    },
    Seed {
        id: "open-weight-coding",
        title: "Open-Weight Models Close the Gap on Coding Benchmarks",
        link: "https://huggingface.co/blog/open-weight-coding",
        source: "Hugging Face Blog",
        summary: "New open-weight releases match proprietary models on Python and Rust code generation, making self-hosted AI assistants practical for most teams...",
        tags: &[Role::AiMl, Role::Engineering],
    },
    Seed {
        id: "product-discovery-ai",
        title: "How Product Teams Are Using AI Interviews for Discovery",
        link: "https://www.mindtheproduct.com/ai-discovery-interviews",
        source: "Mind the Product",
        summary: "Product managers share how AI-moderated user interviews compress discovery cycles, and where the design research still needs a human...",
        tags: &[Role::Product, Role::Design],
    },
];

fn builtin_entries() -> Vec<ArticleEntry> {
    let (year, month, day) = PUBLISHED;
    let published = NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default();

    SEEDS
        .iter()
        .map(|seed| ArticleEntry {
            id: ArticleId(seed.id.to_owned()),
            title: seed.title.to_owned(),
            link: seed.link.to_owned(),
            source: seed.source.to_owned(),
            summary: seed.summary.to_owned(),
            published,
            tags: seed.tags.iter().copied().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{ArticleSource, StaticCatalog};
    use crate::domain::profile::Role;

    #[test]
    fn every_known_role_has_coverage() {
        let catalog = StaticCatalog::builtin();
        for role in Role::KNOWN {
            assert!(
                catalog.entries().iter().any(|entry| entry.is_tagged(role)),
                "no catalog entry tagged {role}"
            );
        }
        assert!(!catalog.entries().iter().any(|entry| entry.is_tagged(Role::Other)));
    }

    #[tokio::test]
    async fn crypto_candidates_keep_catalog_order() {
        let catalog = StaticCatalog::builtin();
        let tags = BTreeSet::from([Role::Crypto]);

        let candidates = catalog.candidates(&tags).await.expect("static catalog never fails");
        let ids: Vec<&str> = candidates.iter().map(|entry| entry.id.0.as_str()).collect();

        assert_eq!(ids, vec!["ethereum-l2-fees", "defi-lending-tvl", "stablecoin-bill"]);
    }

    #[tokio::test]
    async fn general_subset_is_catalog_prefix() {
        let catalog = StaticCatalog::builtin();
        let general = catalog.general(3).await.expect("static catalog never fails");

        assert_eq!(general.len(), 3);
        assert_eq!(general[0].id.0, "gpt5-release");
        assert_eq!(general[2].id.0, "yc-demo-day-s25");
    }
}
