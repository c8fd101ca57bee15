//! Web search backends returning plain-text snippets.

use askdesk_core::{SearchError, WebSearchBackend};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::time::Duration;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
/// Fallback when `search.api_key` is not set in config.
const ENV_SERPAPI_KEY: &str = "SERPAPI_KEY";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn http_client() -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SearchError::Network(e.to_string()))
}

/// Search that is switched off. Always returns no snippets.
#[derive(Debug, Clone, Default)]
pub struct DisabledSearch;

#[async_trait::async_trait]
impl WebSearchBackend for DisabledSearch {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<String>, SearchError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    answer_box: Option<AnswerBox>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    answer: Option<serde_json::Value>,
    snippet: Option<String>,
}

/// Google results through SerpAPI (`engine=google`).
pub struct SerpApiSearch {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SerpApiSearch {
    pub fn new(api_key: Option<String>) -> Result<Self, SearchError> {
        let api_key = api_key
            .or_else(|| std::env::var(ENV_SERPAPI_KEY).ok())
            .filter(|k| !k.trim().is_empty());
        Ok(Self {
            client: http_client()?,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl WebSearchBackend for SerpApiSearch {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!(target: "askdesk::skills", "SerpAPI key not configured, skipping web search");
            return Ok(Vec::new());
        };

        let num = max_results.to_string();
        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&[("q", query), ("api_key", api_key), ("engine", "google"), ("num", num.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Api {
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;
        parse_serpapi(&body, max_results)
    }
}

/// Organic results as `"{title}: {snippet}"` (title alone when there is no
/// snippet); the answer box is used only when there are no organic results.
fn parse_serpapi(body: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
    let data: SerpResponse = serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;

    let mut snippets: Vec<String> = data
        .organic_results
        .into_iter()
        .take(max_results)
        .filter_map(|r| match (r.title, r.snippet) {
            (title, Some(snippet)) => Some(format!("{}: {}", title.unwrap_or_default(), snippet)),
            (Some(title), None) => Some(title),
            (None, None) => None,
        })
        .collect();

    if snippets.is_empty() {
        if let Some(answer_box) = data.answer_box {
            let answer = match answer_box.answer {
                Some(serde_json::Value::String(s)) => Some(s),
                Some(serde_json::Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            };
            if let Some(text) = answer.or(answer_box.snippet) {
                snippets.push(text);
            }
        }
    }
    Ok(snippets)
}

/// DuckDuckGo HTML endpoint; no API key needed.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self { client: http_client()? })
    }
}

#[async_trait::async_trait]
impl WebSearchBackend for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .get(DUCKDUCKGO_URL)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Api {
                status: response.status().as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;
        parse_duckduckgo(&html, max_results)
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("{:?}", e)))
}

fn element_text(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_duckduckgo(html: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
    let document = Html::parse_document(html);
    let result_selector = selector(".result")?;
    let title_selector = selector(".result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let snippets = document
        .select(&result_selector)
        .filter_map(|result| {
            let title = result.select(&title_selector).next().map(element_text).unwrap_or_default();
            let snippet = result.select(&snippet_selector).next().map(element_text).unwrap_or_default();
            match (title.is_empty(), snippet.is_empty()) {
                (true, _) => None,
                (false, true) => Some(title),
                (false, false) => Some(format!("{}: {}", title, snippet)),
            }
        })
        .take(max_results)
        .collect();
    Ok(snippets)
}
