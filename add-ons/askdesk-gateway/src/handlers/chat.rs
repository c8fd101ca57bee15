//! Chat handler: the HTTP face of `RoutingPolicy::answer`.
//!
//! Callers that do not send a `user_id` get a fresh guest id back and should
//! echo it on follow-ups so session memory can resolve "it", "there", etc.

use crate::AppState;
use askdesk_core::{AnswerSource, ChatAnswer, EMPTY_QUERY_REPLY};
use axum::extract::{Json, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(default)]
    q: String,
    #[serde(default, alias = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatResponse {
    #[serde(flatten)]
    reply: ChatAnswer,
    user_id: String,
    suggestions: Vec<String>,
    escalate: bool,
}

/// POST /api/chat – answers `{ q, user_id? }` with the routed answer, quick
/// reply suggestions and a human-escalation flag.
pub(crate) async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    let user_id = req
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("guest-{}", uuid::Uuid::new_v4()));

    if req.q.trim().is_empty() {
        let reply = ChatAnswer {
            answer: EMPTY_QUERY_REPLY.to_string(),
            source: AnswerSource::Generative,
            kb_match: false,
            error: true,
        };
        let body = ChatResponse {
            reply,
            user_id,
            suggestions: Vec::new(),
            escalate: false,
        };
        return (StatusCode::BAD_REQUEST, Json(body));
    }

    let outcome = state.policy.route(&req.q, &user_id).await;
    let body = ChatResponse {
        reply: outcome.reply,
        user_id,
        suggestions: outcome.suggestions,
        escalate: outcome.escalate,
    };
    (StatusCode::OK, Json(body))
}
