//! Mock generative backend: deterministic text, no network.

use askdesk_core::{Generated, GenerationError, GenerativeBackend, SessionTurn};

const BACKEND_NAME: &str = "mock";
const PREVIEW_CHARS: usize = 80;

/// Always-available backend used in development and tests. The reply echoes
/// the question, a preview of the context and the last turn it was given.
#[derive(Debug, Clone, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }

    fn mock_generate(&self, query: &str, context: Option<&str>, history: &[SessionTurn]) -> String {
        let mut out = format!("[Generated – Mock LLM]\n\nYou asked: {}", query.trim());
        if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
            out.push_str(&format!("\n\nBased on: {}", preview(context)));
        }
        if let Some(last) = history.last() {
            out.push_str(&format!("\n\nEarlier we discussed: {}", preview(&last.text)));
        }
        out
    }
}

fn preview(text: &str) -> String {
    let mut p: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        p.push('…');
    }
    p
}

#[async_trait::async_trait]
impl GenerativeBackend for MockBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn generate(
        &self,
        query: &str,
        context: Option<&str>,
        history: &[SessionTurn],
    ) -> Result<Generated, GenerationError> {
        Ok(Generated::new(self.mock_generate(query, context, history)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdesk_core::{Role, TurnMetadata};

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let backend = MockBackend::new();
        let a = backend.generate("tell me a joke", None, &[]).await.unwrap();
        let b = backend.generate("tell me a joke", None, &[]).await.unwrap();
        assert_eq!(a, b);
        assert!(a.text.contains("You asked: tell me a joke"));
        assert!(!a.text.contains("Based on"));
    }

    #[tokio::test]
    async fn test_mock_mentions_context_and_history() {
        let history = vec![SessionTurn::now(
            Role::Assistant,
            "The library is next to the admin block",
            TurnMetadata::new(),
        )];
        let long_context = "x".repeat(200);
        let out = MockBackend::new()
            .generate("when is it open?", Some(&long_context), &history)
            .await
            .unwrap();
        assert!(out.text.contains(&format!("Based on: {}…", "x".repeat(80))));
        assert!(out.text.contains("Earlier we discussed: The library is next to the admin block"));
    }
}
