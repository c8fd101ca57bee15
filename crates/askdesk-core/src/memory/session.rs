use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Open key/value annotations on a turn (`source`, `kbMatch`, `topic`, ...).
pub type TurnMetadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTurn {
    pub role: Role,
    pub text: String,
    /// Unix timestamp (milliseconds).
    pub timestamp_ms: i64,
    #[serde(default)]
    pub metadata: TurnMetadata,
}

impl SessionTurn {
    pub fn now(role: Role, text: impl Into<String>, metadata: TurnMetadata) -> Self {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            role,
            text: text.into(),
            timestamp_ms,
            metadata,
        }
    }
}

/// Per-user conversational state. Owned by [`super::SessionMemory`].
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub history: VecDeque<SessionTurn>,
    pub last_active: Instant,
    pub api_call_count: u64,
}

impl Session {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            history: VecDeque::new(),
            last_active: Instant::now(),
            api_call_count: 0,
        }
    }

    /// Appends and trims from the front so at most `capacity` turns remain.
    pub(crate) fn push(&mut self, turn: SessionTurn, capacity: usize) {
        self.history.push_back(turn);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}
