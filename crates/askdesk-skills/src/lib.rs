//! Concrete capabilities for the askdesk router: generative backends and web search.
//!
//! | Setting                      | Backend            |
//! |------------------------------|--------------------|
//! | `llm.mode = "mock"`          | [`MockBackend`]    |
//! | `llm.mode = "gemini"`        | [`GeminiBackend`]  |
//! | `search.provider = "serpapi"`| [`SerpApiSearch`]  |
//! | `search.provider = "duckduckgo"` | [`DuckDuckGoSearch`] |
//! | anything else                | [`DisabledSearch`] |

mod gemini;
mod mock;
mod search;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use search::{DisabledSearch, DuckDuckGoSearch, SerpApiSearch};

use askdesk_core::{GenerationError, GenerativeBackend, LlmSettings, SearchError, SearchSettings, WebSearchBackend};
use std::sync::Arc;

/// Mode for generative calls: deterministic mock, or the live Gemini API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Gemini,
}

impl LlmMode {
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "gemini" | "live" => LlmMode::Gemini,
            _ => LlmMode::Mock,
        }
    }
}

/// Builds the generative backend selected by `llm.mode`.
pub fn build_generative(settings: &LlmSettings) -> Result<Arc<dyn GenerativeBackend>, GenerationError> {
    let backend: Arc<dyn GenerativeBackend> = match LlmMode::parse(&settings.mode) {
        LlmMode::Mock => Arc::new(MockBackend::new()),
        LlmMode::Gemini => {
            let gemini = GeminiBackend::new(settings)?;
            if !gemini.is_available() {
                tracing::warn!(
                    target: "askdesk::skills",
                    "Gemini selected but no API key is configured; generation disabled"
                );
            }
            Arc::new(gemini)
        }
    };
    tracing::info!(target: "askdesk::skills", backend = backend.name(), "Generative backend ready");
    Ok(backend)
}

/// Builds the web-search backend selected by `search.provider`.
pub fn build_search(settings: &SearchSettings) -> Result<Arc<dyn WebSearchBackend>, SearchError> {
    let backend: Arc<dyn WebSearchBackend> = match settings.provider.trim().to_ascii_lowercase().as_str() {
        "serpapi" => Arc::new(SerpApiSearch::new(settings.api_key.clone())?),
        "duckduckgo" | "ddg" => Arc::new(DuckDuckGoSearch::new()?),
        "disabled" | "" | "none" => Arc::new(DisabledSearch),
        other => {
            tracing::warn!(target: "askdesk::skills", provider = %other, "Unknown search provider, search disabled");
            Arc::new(DisabledSearch)
        }
    };
    tracing::info!(target: "askdesk::skills", backend = backend.name(), "Web search backend ready");
    Ok(backend)
}
