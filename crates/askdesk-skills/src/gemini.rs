//! Gemini `generateContent` backend.
//!
//! Candidate models are tried in order until one returns text. Recent turns
//! are sent as `user`/`model` contents; the KB or web context is embedded in
//! the final user prompt.

use askdesk_core::{Generated, GenerationError, GenerativeBackend, LlmSettings, Role, SessionTurn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BACKEND_NAME: &str = "gemini";
/// Fallback when `llm.api_key` is not set in config.
const ENV_API_KEY: &str = "GEMINI_API_KEY";
const NO_CONTEXT: &str = "No specific context was found for this question.";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Live backend over the Gemini REST API.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    models: Vec<String>,
    system_instruction: String,
}

impl GeminiBackend {
    pub fn new(settings: &LlmSettings) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var(ENV_API_KEY).ok())
            .filter(|k| !k.trim().is_empty());
        Ok(Self {
            client,
            api_key,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            models: settings.models.clone(),
            system_instruction: settings.system_instruction.clone(),
        })
    }

    fn build_request(&self, query: &str, context: Option<&str>, history: &[SessionTurn]) -> GenerateRequest {
        // the conversation has to open with a user turn
        let mut contents: Vec<Content> = history
            .iter()
            .skip_while(|t| t.role == Role::Assistant)
            .map(|t| {
                let role = match t.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Content::text(Some(role), t.text.clone())
            })
            .collect();
        contents.push(Content::text(Some("user"), build_prompt(query, context)));

        let system_instruction = (!self.system_instruction.trim().is_empty())
            .then(|| Content::text(None, self.system_instruction.clone()));
        GenerateRequest {
            system_instruction,
            contents,
        }
    }

    async fn call_model(&self, model: &str, api_key: &str, body: &GenerateRequest) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.api_base, model))
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;
        extract_text(&parsed)
    }
}

fn build_prompt(query: &str, context: Option<&str>) -> String {
    let context = context.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(NO_CONTEXT);
    format!(
        "Context:\n---\n{}\n---\n\nQuestion: {}\n\nUse the context above when it is relevant. \
         Do not simply repeat it; answer directly and conversationally.",
        context,
        query.trim()
    )
}

fn extract_text(response: &GenerateResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .map(|p| p.text.as_str())
        .collect();
    let cleaned = strip_emphasis(&text);
    if cleaned.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(cleaned)
}

/// Drops markdown asterisks; the chat widget renders plain text.
fn strip_emphasis(text: &str) -> String {
    text.replace('*', "").trim().to_string()
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        query: &str,
        context: Option<&str>,
        history: &[SessionTurn],
    ) -> Result<Generated, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Unavailable("Gemini API key not configured".to_string()))?;
        let body = self.build_request(query, context, history);

        let mut last_err = None;
        for model in &self.models {
            match self.call_model(model, api_key, &body).await {
                Ok(text) => {
                    tracing::debug!(target: "askdesk::skills", model = %model, "Gemini model succeeded");
                    return Ok(Generated::new(text));
                }
                Err(e) => {
                    tracing::warn!(target: "askdesk::skills", model = %model, error = %e, "Gemini model failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| GenerationError::Unavailable("no Gemini models configured".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdesk_core::TurnMetadata;

    fn settings(api_key: Option<&str>) -> LlmSettings {
        LlmSettings {
            mode: "gemini".to_string(),
            api_key: api_key.map(str::to_string),
            ..LlmSettings::default()
        }
    }

    fn turn(role: Role, text: &str) -> SessionTurn {
        SessionTurn::now(role, text, TurnMetadata::new())
    }

    #[test]
    fn test_request_maps_history_roles() {
        let backend = GeminiBackend::new(&settings(Some("k"))).unwrap();
        let history = vec![
            turn(Role::Assistant, "orphaned reply"),
            turn(Role::User, "where is the library?"),
            turn(Role::Assistant, "Next to the admin block"),
        ];
        let body = serde_json::to_value(backend.build_request("when is it open?", None, &history)).unwrap();

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "where is the library?");
        assert_eq!(contents[1]["role"], "model");
        let prompt = contents[2]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Question: when is it open?"));
        assert!(prompt.contains(NO_CONTEXT));
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("help desk"));
        assert!(body["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_prompt_embeds_context() {
        let prompt = build_prompt("  fees? ", Some("tuition: Pay at the bursar"));
        assert!(prompt.contains("---\ntuition: Pay at the bursar\n---"));
        assert!(prompt.contains("Question: fees?"));
    }

    #[test]
    fn test_extract_text_strips_asterisks() {
        let parsed: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "**Library** hours are " }, { "text": "*8am-10pm*." }]
                }
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(&parsed).unwrap(), "Library hours are 8am-10pm.");

        let empty: GenerateResponse = serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(matches!(extract_text(&empty), Err(GenerationError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_unavailable_without_key() {
        let backend = GeminiBackend {
            api_key: None,
            ..GeminiBackend::new(&settings(None)).unwrap()
        };
        assert!(!backend.is_available());
        let err = backend.generate("hi", None, &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_api_reports_network_error() {
        let backend = GeminiBackend::new(&LlmSettings {
            api_base: "http://127.0.0.1:9".to_string(),
            models: vec!["a".to_string(), "b".to_string()],
            ..settings(Some("k"))
        })
        .unwrap();
        let err = backend.generate("hi", None, &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
    }
}
