//! Short-lived per-user conversation memory.
//!
//! Sessions live in a [`DashMap`] keyed by user id. Every mutation goes through
//! the map's entry guard, so two turns for the same user are serialized while
//! different users only contend when they hash to the same shard, and no guard
//! is ever held across an `.await`.

mod session;

pub use session::{Role, Session, SessionTurn, TurnMetadata};

use crate::shared::MemorySettings;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Turns scanned by [`SessionMemory::context_keywords`].
const CONTEXT_WINDOW: usize = 6;

const CONTEXT_STOP_WORDS: &[&str] = &[
    "that", "this", "with", "from", "have", "what", "when", "where", "which", "there", "their",
    "about", "would", "could", "should", "please",
];

/// Aggregate counters across all live sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub active_sessions: usize,
    pub total_turns: usize,
    pub total_api_calls: u64,
}

/// Bounded, expiring store of recent turns per user.
pub struct SessionMemory {
    sessions: DashMap<String, Session>,
    capacity: usize,
    ttl: Duration,
}

impl SessionMemory {
    pub fn new(settings: &MemorySettings) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity: settings.history_capacity(),
            ttl: settings.session_ttl(),
        }
    }

    /// Maximum stored turns per session (`2 * max_turns`).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a snapshot of the session, creating it if needed. Refreshes `last_active`.
    pub fn get_or_create(&self, user_id: &str) -> Session {
        self.touch(user_id).value().clone()
    }

    /// Appends a turn and drops the oldest ones beyond capacity.
    pub fn append_turn(&self, user_id: &str, role: Role, text: impl Into<String>, metadata: TurnMetadata) {
        let mut session = self.touch(user_id);
        session.push(SessionTurn::now(role, text, metadata), self.capacity);
    }

    /// Most recent `2 * max_turns` turns, oldest first.
    pub fn recent_history(&self, user_id: &str) -> Vec<SessionTurn> {
        self.recent_history_n(user_id, self.capacity)
    }

    /// Most recent `count` turns, oldest first.
    pub fn recent_history_n(&self, user_id: &str, count: usize) -> Vec<SessionTurn> {
        let session = self.touch(user_id);
        let skip = session.history.len().saturating_sub(count);
        session.history.iter().skip(skip).cloned().collect()
    }

    /// Newest turn with the given role.
    pub fn last_turn(&self, user_id: &str, role: Role) -> Option<SessionTurn> {
        let session = self.touch(user_id);
        session.history.iter().rev().find(|t| t.role == role).cloned()
    }

    /// Snapshot of an existing session for inspection. Unlike the other reads
    /// it neither creates the session nor refreshes `last_active`.
    pub fn peek(&self, user_id: &str) -> Option<Session> {
        self.sessions.get(user_id).map(|s| s.value().clone())
    }

    /// Counts a call to the generative backend. Observability only; never throttles.
    pub fn record_generated_call(&self, user_id: &str) {
        let mut session = self.touch(user_id);
        session.api_call_count += 1;
        tracing::debug!(
            target: "askdesk::memory",
            session = %short_id(user_id),
            calls = session.api_call_count,
            "Generative call recorded"
        );
    }

    /// Generative calls made for this user; does not create a session.
    pub fn api_call_count(&self, user_id: &str) -> u64 {
        self.sessions
            .get(user_id)
            .map(|s| s.api_call_count)
            .unwrap_or(0)
    }

    /// Removes every session idle for longer than the TTL as of `now`.
    ///
    /// Each shard is locked while it is swept, so a session touched before its
    /// shard is visited carries a `last_active` at or after `now` and survives.
    pub fn expire_stale(&self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = now.saturating_duration_since(session.last_active) <= ttl;
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            tracing::info!(
                target: "askdesk::memory",
                removed,
                remaining = self.sessions.len(),
                "Expired stale sessions"
            );
        }
        removed
    }

    /// Drops a session (logout, reset). Returns whether one existed.
    pub fn clear(&self, user_id: &str) -> bool {
        let existed = self.sessions.remove(user_id).is_some();
        if existed {
            tracing::info!(target: "askdesk::memory", session = %short_id(user_id), "Session cleared");
        }
        existed
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> MemoryStats {
        self.sessions
            .iter()
            .fold(MemoryStats::default(), |mut acc, entry| {
                acc.active_sessions += 1;
                acc.total_turns += entry.history.len();
                acc.total_api_calls += entry.api_call_count;
                acc
            })
    }

    /// Distinct content words from the last few turns, oldest first.
    pub fn context_keywords(&self, user_id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.recent_history_n(user_id, CONTEXT_WINDOW)
            .iter()
            .flat_map(|turn| {
                turn.text
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| w.chars().count() > 3 && !CONTEXT_STOP_WORDS.contains(w))
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|w| seen.insert(w.clone()))
            .collect()
    }

    /// Drops every session. Used on shutdown.
    pub fn teardown(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        tracing::info!(target: "askdesk::memory", count, "Session memory torn down");
    }

    fn touch(&self, user_id: &str) -> dashmap::mapref::one::RefMut<'_, String, Session> {
        let mut session = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id));
        session.last_active = Instant::now();
        session
    }
}

/// First 8 characters of an id, for logs.
pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
