//! Routing policy: knowledge base first, then generative and web search.
//!
//! Follow-ups to the previous answer ("are you sure?", "tell me more") are
//! answered from templates. Strong matches are answered straight from the
//! [`KnowledgeStore`] with no network call. Weak matches, small talk and open questions go to the
//! [`GenerativeBackend`] with the user's recent turns; open questions may first
//! collect snippets from the [`WebSearchBackend`]. Capability failures never
//! reach the caller: the router falls back to the weak KB candidate or a fixed
//! apology.
//!
//! [`KnowledgeStore`]: crate::KnowledgeStore

mod capability;

pub use capability::{Generated, GenerativeBackend, WebSearchBackend};

use crate::conversation::{
    clarification_reply, confirmation_reply, detect_follow_up, more_info_reply, related_entries,
    turn_from_knowledge_base, FollowUp,
};
use crate::error::{GenerationError, SearchError};
use crate::intent::{classify_topic, should_escalate, suggested_questions, IntentClassifier, TopicIntent};
use crate::knowledge::KnowledgeEntry;
use crate::matcher::{MatchResult, MatchType, Matcher};
use crate::memory::{short_id, Role, SessionMemory, SessionTurn, TurnMetadata};
use crate::shared::RoutingSettings;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Reply to a blank query. Nothing is recorded.
pub const EMPTY_QUERY_REPLY: &str = "Please ask a valid question.";

/// Reply when no source could produce an answer.
pub const CANNOT_HELP_REPLY: &str =
    "I'm sorry, I can't help with that right now. Please try again later or contact the help desk directly.";

/// Fallback reply to a greeting when the generative backend fails.
pub const GREETING_REPLY: &str = "Hello! I'm the campus help desk assistant. How can I help you today?";

/// Fallback reply to a farewell or thanks when the generative backend fails.
pub const FAREWELL_REPLY: &str =
    "You're welcome! Feel free to come back anytime you have questions. Goodbye!";

/// Context words from earlier turns appended to a web-search query.
const MAX_SEARCH_CONTEXT_TERMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerSource {
    #[serde(rename = "knowledge_base")]
    KnowledgeBase,
    #[serde(rename = "generative")]
    Generative,
    #[serde(rename = "generative+knowledge_base")]
    GenerativeWithKnowledge,
    #[serde(rename = "web_search")]
    WebSearch,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::KnowledgeBase => "knowledge_base",
            AnswerSource::Generative => "generative",
            AnswerSource::GenerativeWithKnowledge => "generative+knowledge_base",
            AnswerSource::WebSearch => "web_search",
        }
    }
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller gets back for every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    pub answer: String,
    pub source: AnswerSource,
    pub kb_match: bool,
    /// Set when the answer is a fixed fallback rather than real content.
    #[serde(default)]
    pub error: bool,
}

impl ChatAnswer {
    fn new(answer: impl Into<String>, source: AnswerSource, kb_match: bool) -> Self {
        Self {
            answer: answer.into(),
            source,
            kb_match,
            error: false,
        }
    }

    fn from_entry(entry: &KnowledgeEntry) -> Self {
        Self::new(entry.answer.clone(), AnswerSource::KnowledgeBase, true)
    }

    fn cannot_help() -> Self {
        Self {
            error: true,
            ..Self::new(CANNOT_HELP_REPLY, AnswerSource::Generative, false)
        }
    }
}

/// A routed answer together with the signals that chose its route.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub reply: ChatAnswer,
    pub matched: MatchResult,
    pub topic: TopicIntent,
    /// Set when the query was answered from the previous assistant turn.
    pub follow_up: Option<FollowUp>,
    /// Quick replies for the query's topic.
    pub suggestions: Vec<String>,
    /// The query should be handed to a human.
    pub escalate: bool,
}

pub struct RoutingPolicy {
    matcher: Matcher,
    memory: Arc<SessionMemory>,
    generator: Arc<dyn GenerativeBackend>,
    search: Arc<dyn WebSearchBackend>,
    intent: Arc<dyn IntentClassifier>,
    settings: RoutingSettings,
}

impl RoutingPolicy {
    pub fn new(
        matcher: Matcher,
        memory: Arc<SessionMemory>,
        generator: Arc<dyn GenerativeBackend>,
        search: Arc<dyn WebSearchBackend>,
        intent: Arc<dyn IntentClassifier>,
        settings: RoutingSettings,
    ) -> Self {
        Self {
            matcher,
            memory,
            generator,
            search,
            intent,
            settings,
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn memory(&self) -> &Arc<SessionMemory> {
        &self.memory
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn search_name(&self) -> &str {
        self.search.name()
    }

    /// Caller-facing entry point: answer a query for a user.
    pub async fn answer(&self, query: &str, user_id: &str) -> ChatAnswer {
        self.route(query, user_id).await.reply
    }

    /// Picks a source, produces the answer and records both turns.
    pub async fn route(&self, query: &str, user_id: &str) -> RouteOutcome {
        let query = query.trim();
        if query.is_empty() {
            return RouteOutcome {
                reply: ChatAnswer {
                    error: true,
                    ..ChatAnswer::new(EMPTY_QUERY_REPLY, AnswerSource::Generative, false)
                },
                matched: MatchResult::none(),
                topic: classify_topic(""),
                follow_up: None,
                suggestions: Vec::new(),
                escalate: false,
            };
        }

        let topic = classify_topic(query);
        let (reply, matched, follow_up, keyword) = match self.answer_follow_up(query, user_id) {
            Some((kind, reply, keyword)) => (reply, MatchResult::none(), Some(kind), keyword),
            None => {
                let matched = self.matcher.find(query);
                let reply = match (&matched.entry, matched.match_type) {
                    (Some(entry), MatchType::Exact | MatchType::Contains) => ChatAnswer::from_entry(entry),
                    (Some(entry), MatchType::Word) if matched.score >= self.settings.strong_word_score => {
                        ChatAnswer::from_entry(entry)
                    }
                    (Some(entry), _) => self.answer_weak_match(query, user_id, entry).await,
                    (None, _) if self.intent.is_small_talk(query) => {
                        self.answer_small_talk(query, user_id).await
                    }
                    (None, _) => self.answer_open_question(query, user_id).await,
                };
                let keyword = matched.entry.as_ref().map(|e| e.keyword.clone());
                (reply, matched, None, keyword)
            }
        };

        let escalate = reply.error || should_escalate(&topic);
        tracing::info!(
            target: "askdesk::routing",
            session = %short_id(user_id),
            route = reply.source.as_str(),
            kb_match = reply.kb_match,
            match_type = ?matched.match_type,
            score = matched.score,
            follow_up = follow_up.map(|f| f.as_str()),
            topic = %topic.topic,
            fallback = reply.error,
            "Query routed"
        );
        if escalate {
            tracing::warn!(
                target: "askdesk::routing",
                session = %short_id(user_id),
                topic = %topic.topic,
                confidence = topic.confidence,
                "Query flagged for human follow-up"
            );
        }

        self.record_exchange(user_id, query, &reply, &topic, keyword.as_deref());
        RouteOutcome {
            suggestions: suggested_questions(&topic.topic)
                .iter()
                .map(|q| q.to_string())
                .collect(),
            reply,
            matched,
            topic,
            follow_up,
            escalate,
        }
    }

    /// Answers a follow-up from the previous assistant turn. `None` hands the
    /// query to normal routing: no earlier answer, an apology to build on, or
    /// nothing related to add.
    fn answer_follow_up(&self, query: &str, user_id: &str) -> Option<(FollowUp, ChatAnswer, Option<String>)> {
        let kind = detect_follow_up(query)?;
        let last = self.memory.last_turn(user_id, Role::Assistant)?;
        if last.text == CANNOT_HELP_REPLY {
            return None;
        }

        let source = last
            .metadata
            .get("source")
            .and_then(|v| serde_json::from_value::<AnswerSource>(v.clone()).ok())
            .unwrap_or(AnswerSource::Generative);
        let kb_match = turn_from_knowledge_base(&last);
        let keyword = last
            .metadata
            .get("keyword")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let reply = match kind {
            FollowUp::Confirmation => ChatAnswer::new(confirmation_reply(&last), source, kb_match),
            FollowUp::Clarification => ChatAnswer::new(clarification_reply(&last), source, kb_match),
            FollowUp::MoreInfo => {
                let related = related_entries(self.matcher.store(), &last);
                if related.is_empty() {
                    return None;
                }
                ChatAnswer::new(more_info_reply(&related), AnswerSource::KnowledgeBase, true)
            }
        };
        Some((kind, reply, keyword))
    }

    async fn answer_weak_match(&self, query: &str, user_id: &str, entry: &KnowledgeEntry) -> ChatAnswer {
        let history = self.memory.recent_history(user_id);
        let context = entry.context_line();
        match self.generate(query, Some(&context), &history, user_id).await {
            Ok(text) => ChatAnswer::new(text, AnswerSource::GenerativeWithKnowledge, true),
            Err(_) => {
                tracing::info!(
                    target: "askdesk::routing",
                    keyword = %entry.keyword,
                    "Falling back to weak knowledge base match"
                );
                ChatAnswer::from_entry(entry)
            }
        }
    }

    async fn answer_small_talk(&self, query: &str, user_id: &str) -> ChatAnswer {
        let history = self.memory.recent_history(user_id);
        match self.generate(query, None, &history, user_id).await {
            Ok(text) => ChatAnswer::new(text, AnswerSource::Generative, false),
            Err(_) if self.intent.is_greeting(query) => {
                ChatAnswer::new(GREETING_REPLY, AnswerSource::Generative, false)
            }
            Err(_) if self.intent.is_farewell(query) => {
                ChatAnswer::new(FAREWELL_REPLY, AnswerSource::Generative, false)
            }
            Err(_) => ChatAnswer::cannot_help(),
        }
    }

    async fn answer_open_question(&self, query: &str, user_id: &str) -> ChatAnswer {
        let history = self.memory.recent_history(user_id);
        let snippets = if self.settings.web_search_enabled {
            self.search_snippets(query, user_id).await
        } else {
            Vec::new()
        };

        if !self.generator.is_available() {
            if snippets.is_empty() {
                return ChatAnswer::cannot_help();
            }
            return ChatAnswer::new(format_snippet_answer(&snippets), AnswerSource::WebSearch, false);
        }

        let context = (!snippets.is_empty()).then(|| format_snippet_context(&snippets));
        match self.generate(query, context.as_deref(), &history, user_id).await {
            Ok(text) => ChatAnswer::new(text, AnswerSource::Generative, false),
            Err(_) if !snippets.is_empty() => {
                ChatAnswer::new(format_snippet_answer(&snippets), AnswerSource::WebSearch, false)
            }
            Err(_) => ChatAnswer::cannot_help(),
        }
    }

    /// Calls the generative backend under the configured timeout. Counts the
    /// call and rejects blank output.
    async fn generate(
        &self,
        query: &str,
        context: Option<&str>,
        history: &[SessionTurn],
        user_id: &str,
    ) -> Result<String, GenerationError> {
        if !self.generator.is_available() {
            tracing::debug!(
                target: "askdesk::routing",
                backend = self.generator.name(),
                "Generative backend unavailable"
            );
            return Err(GenerationError::Unavailable(self.generator.name().to_string()));
        }

        self.memory.record_generated_call(user_id);
        let timeout = self.settings.generation_timeout();
        let result = match tokio::time::timeout(timeout, self.generator.generate(query, context, history)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(timeout)),
        };

        let result = result.and_then(|generated| {
            let text = generated.text.trim();
            if text.is_empty() {
                Err(GenerationError::EmptyResponse)
            } else {
                Ok(text.to_string())
            }
        });
        if let Err(e) = &result {
            tracing::warn!(
                target: "askdesk::routing",
                backend = self.generator.name(),
                session = %short_id(user_id),
                error = %e,
                "Generation failed"
            );
        }
        result
    }

    /// Web snippets for a query; any failure yields an empty list.
    async fn search_snippets(&self, query: &str, user_id: &str) -> Vec<String> {
        let search_query = self.search_query(query, user_id);
        let max_results = self.settings.search_max_results;
        let timeout = self.settings.search_timeout();
        let result = match tokio::time::timeout(timeout, self.search.search(&search_query, max_results)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(timeout)),
        };

        match result {
            Ok(mut snippets) => {
                snippets.retain(|s| !s.trim().is_empty());
                snippets.truncate(max_results);
                tracing::debug!(
                    target: "askdesk::routing",
                    backend = self.search.name(),
                    count = snippets.len(),
                    "Web search completed"
                );
                snippets
            }
            Err(e) => {
                tracing::warn!(
                    target: "askdesk::routing",
                    backend = self.search.name(),
                    error = %e,
                    "Web search failed, continuing without snippets"
                );
                Vec::new()
            }
        }
    }

    /// Appends the newest context words not already in the query so follow-ups
    /// ("when is it open?") search for the thing being discussed.
    fn search_query(&self, query: &str, user_id: &str) -> String {
        let lower = query.to_lowercase();
        let mut extra: Vec<String> = self
            .memory
            .context_keywords(user_id)
            .into_iter()
            .rev()
            .filter(|k| !lower.contains(k.as_str()))
            .take(MAX_SEARCH_CONTEXT_TERMS)
            .collect();
        if extra.is_empty() {
            return query.to_string();
        }
        extra.reverse();
        format!("{} {}", query, extra.join(" "))
    }

    fn record_exchange(
        &self,
        user_id: &str,
        query: &str,
        reply: &ChatAnswer,
        topic: &TopicIntent,
        keyword: Option<&str>,
    ) {
        let mut user_meta = exchange_metadata(reply);
        user_meta.insert("topic".to_string(), json!(topic.topic));
        user_meta.insert("topicConfidence".to_string(), json!(topic.confidence));
        self.memory.append_turn(user_id, Role::User, query, user_meta);

        let mut assistant_meta = exchange_metadata(reply);
        // the entry behind the answer, for later "tell me more"
        if let Some(keyword) = keyword.filter(|_| reply.kb_match) {
            assistant_meta.insert("keyword".to_string(), json!(keyword));
        }
        self.memory
            .append_turn(user_id, Role::Assistant, reply.answer.clone(), assistant_meta);
    }
}

fn exchange_metadata(reply: &ChatAnswer) -> TurnMetadata {
    let mut meta = TurnMetadata::new();
    meta.insert("source".to_string(), json!(reply.source.as_str()));
    meta.insert("kbMatch".to_string(), json!(reply.kb_match));
    meta
}

fn format_snippet_context(snippets: &[String]) -> String {
    let mut out = String::from("Web search results:");
    for s in snippets {
        out.push_str("\n- ");
        out.push_str(s);
    }
    out
}

fn format_snippet_answer(snippets: &[String]) -> String {
    let mut out = String::from("Here is what I found on the web:");
    for s in snippets {
        out.push_str("\n- ");
        out.push_str(s);
    }
    out
}
