//! Template replies to conversational follow-ups ("are you sure?", "tell me
//! more", "what do you mean?") built from the previous assistant turn. None of
//! them reach a capability.

use crate::knowledge::{KnowledgeEntry, KnowledgeStore};
use crate::memory::SessionTurn;

/// Related entries offered by a "tell me more" reply.
const MAX_RELATED: usize = 2;

const CONFIRMATIONS: &[&str] = &[
    "sure",
    "really",
    "are you sure",
    "is that right",
    "is that correct",
    "is that true",
    "yes",
    "yeah",
    "seriously",
    "for real",
];

const MORE_INFO: &[&str] = &[
    "tell me more",
    "what else",
    "more info",
    "more information",
    "more details",
    "more",
    "and",
    "continue",
    "go on",
    "elaborate",
];

const CLARIFICATIONS: &[&str] = &[
    "what do you mean",
    "explain",
    "clarify",
    "how so",
    "what",
    "huh",
    "pardon",
    "i dont understand",
];

/// Words that may trail a follow-up phrase without turning it into a new question.
const TRAILING_FILLER: &[&str] = &["please", "about", "it", "that", "this", "me", "on", "more", "further"];

/// What a follow-up asks of the previous answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Confirmation,
    MoreInfo,
    Clarification,
}

impl FollowUp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUp::Confirmation => "confirmation",
            FollowUp::MoreInfo => "more_info",
            FollowUp::Clarification => "clarification",
        }
    }
}

/// Recognises a follow-up. Confirmations must be the whole query; the other
/// kinds may carry trailing filler ("tell me more about it please").
pub fn detect_follow_up(query: &str) -> Option<FollowUp> {
    let q = simplify(query);
    if q.is_empty() {
        return None;
    }
    if CONFIRMATIONS.contains(&q.as_str()) {
        return Some(FollowUp::Confirmation);
    }
    if MORE_INFO.iter().any(|p| leads_with(&q, p)) {
        return Some(FollowUp::MoreInfo);
    }
    if CLARIFICATIONS.iter().any(|p| leads_with(&q, p)) {
        return Some(FollowUp::Clarification);
    }
    None
}

/// Restates the previous answer. Answers that came from the knowledge base are
/// confirmed outright, anything else is hedged.
pub fn confirmation_reply(last: &SessionTurn) -> String {
    if turn_from_knowledge_base(last) {
        format!("Yes, that's correct! {}", last.text)
    } else {
        format!("Yes, that's correct! Based on the information I have: {}", last.text)
    }
}

pub fn clarification_reply(last: &SessionTurn) -> String {
    format!("To clarify: {}", last.text)
}

/// Lists up to two related answers as bullets.
pub fn more_info_reply(related: &[&KnowledgeEntry]) -> String {
    let bullets: Vec<String> = related
        .iter()
        .take(MAX_RELATED)
        .map(|e| format!("- {}", e.answer))
        .collect();
    format!("Here's some additional information:\n\n{}", bullets.join("\n\n"))
}

/// Other eligible entries in the category of the entry that produced `last`.
pub fn related_entries<'a>(store: &'a KnowledgeStore, last: &SessionTurn) -> Vec<&'a KnowledgeEntry> {
    let Some(keyword) = last.metadata.get("keyword").and_then(|v| v.as_str()) else {
        return Vec::new();
    };
    let Some(origin) = store.eligible().find(|e| e.keyword == keyword) else {
        return Vec::new();
    };
    store
        .by_category(&origin.category)
        .filter(|e| e.is_eligible() && e.keyword != origin.keyword)
        .take(MAX_RELATED)
        .collect()
}

pub(crate) fn turn_from_knowledge_base(turn: &SessionTurn) -> bool {
    turn.metadata
        .get("kbMatch")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn leads_with(query: &str, phrase: &str) -> bool {
    match query.strip_prefix(phrase) {
        Some("") => true,
        Some(rest) if rest.starts_with(' ') => rest
            .split_whitespace()
            .all(|w| TRAILING_FILLER.contains(&w)),
        _ => false,
    }
}

fn simplify(query: &str) -> String {
    query
        .to_lowercase()
        .replace(['\'', '’'], "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Role, TurnMetadata};

    fn kb_turn(text: &str, keyword: &str) -> SessionTurn {
        let mut meta = TurnMetadata::new();
        meta.insert("kbMatch".to_string(), serde_json::json!(true));
        meta.insert("keyword".to_string(), serde_json::json!(keyword));
        SessionTurn::now(Role::Assistant, text, meta)
    }

    #[test]
    fn test_detect_follow_up() {
        for q in ["Are you sure?", "really", "Is that correct?", "for real"] {
            assert_eq!(detect_follow_up(q), Some(FollowUp::Confirmation), "{}", q);
        }
        for q in ["tell me more", "Tell me more about it please", "what else?", "more", "elaborate on that"] {
            assert_eq!(detect_follow_up(q), Some(FollowUp::MoreInfo), "{}", q);
        }
        for q in ["What do you mean?", "huh?", "explain that", "I don't understand"] {
            assert_eq!(detect_follow_up(q), Some(FollowUp::Clarification), "{}", q);
        }
    }

    #[test]
    fn test_new_questions_are_not_follow_ups() {
        for q in [
            "explain the admission requirements",
            "what are the library hours",
            "more hostel rooms",
            "are you sure the library opens at 8?",
            "",
        ] {
            assert_eq!(detect_follow_up(q), None, "{}", q);
        }
    }

    #[test]
    fn test_confirmation_hedges_generated_answers() {
        let kb = kb_turn("Mon-Fri 8am-10pm", "library hours");
        assert_eq!(confirmation_reply(&kb), "Yes, that's correct! Mon-Fri 8am-10pm");

        let generated = SessionTurn::now(Role::Assistant, "Probably Friday", TurnMetadata::new());
        assert_eq!(
            confirmation_reply(&generated),
            "Yes, that's correct! Based on the information I have: Probably Friday"
        );
        assert_eq!(clarification_reply(&generated), "To clarify: Probably Friday");
    }

    #[test]
    fn test_related_entries_share_category() {
        let store = KnowledgeStore::from_entries(vec![
            KnowledgeEntry::new("library hours", "Mon-Fri 8am-10pm").with_category("campus_life"),
            KnowledgeEntry::new("tuition fees", "Pay at the bursar").with_category("fees"),
            KnowledgeEntry::new("gym", "Open daily from 6am").with_category("campus_life"),
            KnowledgeEntry::new("chapel", "").with_category("campus_life"),
        ]);
        let last = kb_turn("Mon-Fri 8am-10pm", "library hours");
        let related = related_entries(&store, &last);
        let keywords: Vec<&str> = related.iter().map(|e| e.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["gym"]);
        assert_eq!(
            more_info_reply(&related),
            "Here's some additional information:\n\n- Open daily from 6am"
        );

        let untagged = SessionTurn::now(Role::Assistant, "hello", TurnMetadata::new());
        assert!(related_entries(&store, &untagged).is_empty());
    }
}
