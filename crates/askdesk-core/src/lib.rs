//! askdesk-core: answer routing for the help desk (knowledge base, matcher,
//! session memory, routing policy).
//!
//! Concrete generative and web-search backends live in `askdesk-skills`; the
//! HTTP surface lives in the `askdesk-gateway` add-on.

mod conversation;
pub mod error;
mod intent;
mod knowledge;
mod matcher;
mod memory;
mod routing;
mod shared;

// Configuration
pub use shared::{CoreConfig, LlmSettings, MemorySettings, RoutingSettings, SearchSettings};

// Errors
pub use error::{DataError, GenerationError, SearchError};

// Knowledge base
pub use knowledge::{
    CombinedSource, JsonFileSource, KnowledgeEntry, KnowledgeSource, KnowledgeStore, SledSource,
    DEFAULT_PRIORITY, ENTRIES_TREE,
};

// Matching
pub use matcher::{normalize, significant_tokens, MatchResult, MatchType, Matcher, MIN_TOKEN_LEN};

// Session memory
pub use memory::{MemoryStats, Role, Session, SessionMemory, SessionTurn, TurnMetadata};

// Intent heuristics
pub use intent::{
    classify_topic, should_escalate, suggested_questions, IntentClassifier, KeywordIntentClassifier,
    TopicIntent,
};
pub use conversation::{detect_follow_up, FollowUp};

// Routing
pub use routing::{
    AnswerSource, ChatAnswer, Generated, GenerativeBackend, RouteOutcome, RoutingPolicy,
    WebSearchBackend, CANNOT_HELP_REPLY, EMPTY_QUERY_REPLY, FAREWELL_REPLY, GREETING_REPLY,
};
