//! Three-tier keyword matcher: exact, contains, then word overlap.
//!
//! Every tier walks the [`KnowledgeStore`] in its fixed order and the first
//! qualifying entry wins, so results are deterministic for a given store.

use crate::knowledge::{KnowledgeEntry, KnowledgeStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tokens shorter than this are ignored by the word tier.
pub const MIN_TOKEN_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Contains,
    Word,
    None,
}

/// Outcome of [`Matcher::find`]. `score` is only meaningful for word matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub entry: Option<KnowledgeEntry>,
    pub match_type: MatchType,
    pub score: usize,
    /// Query tokens the word tier considered.
    #[serde(default)]
    pub token_count: usize,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            entry: None,
            match_type: MatchType::None,
            score: 0,
            token_count: 0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.entry.is_some()
    }
}

/// Lower-cased, trimmed, whitespace-collapsed form used by the exact and contains tiers.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Word-tier tokens: whitespace split, edge punctuation stripped, short tokens dropped.
pub fn significant_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .collect()
}

/// Finds the best knowledge entry for a query.
#[derive(Clone)]
pub struct Matcher {
    store: Arc<KnowledgeStore>,
}

impl Matcher {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn find(&self, query: &str) -> MatchResult {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return MatchResult::none();
        }

        if let Some(entry) = self
            .store
            .eligible()
            .find(|e| normalize(&e.keyword) == normalized)
        {
            return Self::hit(entry, MatchType::Exact, 0, 0);
        }

        let tokens = significant_tokens(query);
        if let Some(entry) = self.store.eligible().find(|e| {
            let keyword = normalize(&e.keyword);
            normalized.contains(&keyword) || keyword.contains(&normalized)
        }) {
            return Self::hit(entry, MatchType::Contains, 0, tokens.len());
        }

        // nothing left for the word tier to score
        if tokens.is_empty() {
            return MatchResult::none();
        }
        self.word_overlap(&tokens)
    }

    fn word_overlap(&self, tokens: &[String]) -> MatchResult {
        let mut best: Option<(&KnowledgeEntry, usize)> = None;
        for entry in self.store.eligible() {
            let combined = format!("{} {}", entry.keyword, entry.answer).to_lowercase();
            let score = tokens.iter().filter(|t| combined.contains(t.as_str())).count();
            if score > best.map(|(_, s)| s).unwrap_or(0) {
                best = Some((entry, score));
            }
        }

        match best {
            // inclusive cutoff: half the considered tokens, floored for odd counts
            Some((entry, score)) if score * 2 >= tokens.len() => {
                Self::hit(entry, MatchType::Word, score, tokens.len())
            }
            _ => MatchResult {
                token_count: tokens.len(),
                ..MatchResult::none()
            },
        }
    }

    fn hit(entry: &KnowledgeEntry, match_type: MatchType, score: usize, token_count: usize) -> MatchResult {
        MatchResult {
            entry: Some(entry.clone()),
            match_type,
            score,
            token_count,
        }
    }
}
