use crate::error::{GenerationError, SearchError};
use crate::memory::SessionTurn;

/// Text produced by a [`GenerativeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
}

impl Generated {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Language model the router can ask for an answer.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// False when the backend is not configured (e.g. no API key). The router
    /// then skips generation entirely.
    fn is_available(&self) -> bool {
        true
    }

    /// `context` is supplementary text (KB answer or web snippets); `history` is
    /// the user's recent turns, oldest first, excluding the current query.
    async fn generate(
        &self,
        query: &str,
        context: Option<&str>,
        history: &[SessionTurn],
    ) -> Result<Generated, GenerationError>;
}

/// Web search returning plain-text snippets.
#[async_trait::async_trait]
pub trait WebSearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Unconfigured backends return an empty list rather than an error.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError>;
}
