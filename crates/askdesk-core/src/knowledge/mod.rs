//! Knowledge base: entries, the sources they are loaded from, and the read-only store.
//!
//! | Source           | Backing data                                        |
//! |------------------|-----------------------------------------------------|
//! | `JsonFileSource` | static `knowledge.json` shipped with the deployment |
//! | `SledSource`     | entries written by the admin dashboard              |
//! | `CombinedSource` | static entries first, then dashboard entries        |

mod sources;
mod store;

pub use sources::{CombinedSource, JsonFileSource, SledSource, ENTRIES_TREE};
pub use store::KnowledgeStore;

use crate::error::DataError;
use serde::{Deserialize, Serialize};

/// Priority assigned to records that do not carry one.
pub const DEFAULT_PRIORITY: i64 = 50;

/// One keyword → answer record. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntry")]
pub struct KnowledgeEntry {
    pub keyword: String,
    pub answer: String,
    pub category: String,
    pub tags: Vec<String>,
    /// Lower values sort first and therefore win matcher ties.
    pub priority: i64,
}

impl KnowledgeEntry {
    pub fn new(keyword: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            answer: answer.into(),
            category: "general".to_string(),
            tags: Vec::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Entries need both a keyword and an answer to take part in matching.
    pub fn is_eligible(&self) -> bool {
        !self.keyword.trim().is_empty() && !self.answer.trim().is_empty()
    }

    /// `keyword: answer` line used as context for the generative backend.
    pub fn context_line(&self) -> String {
        format!("{}: {}", self.keyword, self.answer)
    }
}

/// Wire shape accepted from JSON and the admin store. Dashboard records use
/// `question`/`title` and `content` for what the core calls keyword and answer.
#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    priority: Option<i64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<RawEntry> for KnowledgeEntry {
    fn from(raw: RawEntry) -> Self {
        Self {
            keyword: non_blank(raw.keyword)
                .or_else(|| non_blank(raw.question))
                .or_else(|| non_blank(raw.title))
                .unwrap_or_default(),
            answer: non_blank(raw.answer)
                .or_else(|| non_blank(raw.content))
                .unwrap_or_default(),
            category: non_blank(raw.category).unwrap_or_else(|| "general".to_string()),
            tags: raw.tags.unwrap_or_default(),
            priority: raw.priority.unwrap_or(DEFAULT_PRIORITY),
        }
    }
}

/// Capability that yields the full entry set at startup.
pub trait KnowledgeSource: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Loads every record in source order.
    fn load_all(&self) -> Result<Vec<KnowledgeEntry>, DataError>;
}
