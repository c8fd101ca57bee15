//! Query heuristics: small-talk detection and topic tagging.

use serde::{Deserialize, Serialize};

/// Decides whether a query is conversational rather than a knowledge-base question.
pub trait IntentClassifier: Send + Sync {
    fn is_small_talk(&self, query: &str) -> bool;

    fn is_greeting(&self, _query: &str) -> bool {
        false
    }

    fn is_farewell(&self, _query: &str) -> bool {
        false
    }
}

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "greetings", "good morning", "good afternoon", "good evening",
    "good day", "howdy", "sup", "whats up", "yo",
];

const FAREWELLS: &[&str] = &["bye", "goodbye", "see you", "farewell", "later"];

/// Whole words that mark entertainment or chit-chat requests.
const SMALL_TALK_WORDS: &[&str] = &[
    "joke", "jokes", "funny", "story", "stories", "poem", "poems", "riddle", "weather", "sing",
];

const SMALL_TALK_PHRASES: &[&str] = &[
    "how are you",
    "who are you",
    "who made you",
    "meaning of life",
    "what is your name",
    "whats your name",
];

/// Keyword and phrase based [`IntentClassifier`].
#[derive(Debug, Clone, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn is_greeting(&self, query: &str) -> bool {
        let q = simplify(query);
        GREETINGS.contains(&q.as_str())
    }

    fn is_farewell(&self, query: &str) -> bool {
        let q = simplify(query);
        FAREWELLS.contains(&q.as_str()) || q.starts_with("thank")
    }

    fn is_small_talk(&self, query: &str) -> bool {
        if self.is_greeting(query) || self.is_farewell(query) {
            return true;
        }
        let q = simplify(query);
        let padded = format!(" {} ", q);
        SMALL_TALK_PHRASES.iter().any(|p| padded.contains(&format!(" {} ", p)))
            || q.split(' ').any(|w| SMALL_TALK_WORDS.contains(&w))
    }
}

/// Lower-case, apostrophes removed, other punctuation turned into single spaces.
fn simplify(query: &str) -> String {
    query
        .to_lowercase()
        .replace(['\'', '’'], "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "admissions",
        &[
            "admission", "apply", "application", "requirements", "enroll", "enrollment", "intake",
            "entry requirements", "how to apply", "cutoff points",
        ],
    ),
    (
        "fees",
        &[
            "fee", "fees", "tuition", "payment", "cost", "price", "pay", "balance", "installment",
            "how much", "payment plan",
        ],
    ),
    (
        "academics",
        &[
            "course", "program", "degree", "curriculum", "lecture", "timetable", "exam", "semester",
            "results", "grades", "transcript", "coursework",
        ],
    ),
    (
        "campus_life",
        &[
            "campus", "club", "society", "event", "sports", "cafeteria", "dining", "food", "chapel",
            "library", "gym", "football",
        ],
    ),
    (
        "accommodation",
        &[
            "hostel", "accommodation", "housing", "room", "dormitory", "residence", "roommate",
            "off-campus", "hostel booking",
        ],
    ),
    (
        "support",
        &[
            "help", "support", "problem", "issue", "complaint", "contact", "email", "phone", "office",
            "counseling", "technical support",
        ],
    ),
    (
        "emergency",
        &[
            "emergency", "urgent", "security", "accident", "medical", "sick", "hospital", "clinic",
            "ambulance", "fire", "police",
        ],
    ),
];

/// Topic label attached to user turns for analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicIntent {
    pub topic: String,
    /// Matched keyword weight over query word count, capped at 1.0.
    pub confidence: f32,
}

impl TopicIntent {
    fn other() -> Self {
        Self {
            topic: "other".to_string(),
            confidence: 0.0,
        }
    }
}

/// Scores each topic by matched keywords; multi-word keywords weigh their word count.
pub fn classify_topic(query: &str) -> TopicIntent {
    let q = query.trim().to_lowercase();
    let words = q.split_whitespace().count();
    if words == 0 {
        return TopicIntent::other();
    }
    let padded = format!(
        " {} ",
        q.split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let mut best = ("other", 0usize);
    for (topic, keywords) in TOPIC_KEYWORDS {
        let score: usize = keywords
            .iter()
            .filter(|k| padded.contains(&format!(" {} ", k)))
            .map(|k| k.split(' ').count())
            .sum();
        if score > best.1 {
            best = (*topic, score);
        }
    }

    let (topic, score) = best;
    let confidence = (score as f32 / words as f32).min(1.0);
    if score == 0 || (confidence < 0.1 && score < 2) {
        return TopicIntent::other();
    }
    TopicIntent {
        topic: topic.to_string(),
        confidence: (confidence * 100.0).round() / 100.0,
    }
}

/// Quick-reply suggestions shown next to an answer on `topic`.
pub fn suggested_questions(topic: &str) -> &'static [&'static str] {
    match topic {
        "admissions" => &[
            "What are the admission requirements?",
            "How do I apply for admission?",
            "When is the next intake?",
            "What are the entry points?",
        ],
        "fees" => &[
            "What are the tuition fees?",
            "Can I pay in installments?",
            "How do I check my fee balance?",
            "What payment methods are accepted?",
        ],
        "academics" => &[
            "What courses do you offer?",
            "How do I check my results?",
            "What is the exam timetable?",
            "How do I get my transcript?",
        ],
        "campus_life" => &[
            "What clubs and societies are available?",
            "Tell me about campus events",
            "What sports facilities do you have?",
            "Where is the library?",
        ],
        "accommodation" => &[
            "How do I book a hostel?",
            "What are the hostel fees?",
            "What accommodation options are available?",
            "Can I get off-campus accommodation?",
        ],
        "support" => &[
            "How can I contact ICT support?",
            "Where is the student affairs office?",
            "How do I give feedback?",
            "Who can help me with my issue?",
        ],
        "emergency" => &[
            "What are the emergency contacts?",
            "Where is the medical center?",
            "How do I report a security issue?",
            "What should I do in an emergency?",
        ],
        _ => &[
            "Where is the campus located?",
            "What are the contact details?",
            "How do I access the student portal?",
            "What are the library hours?",
        ],
    }
}

/// Whether a query should be handed to a human: emergencies always, support
/// requests and tagged topics when the tagging is unsure. Untagged queries
/// (small talk, open questions) are left to the router.
pub fn should_escalate(intent: &TopicIntent) -> bool {
    match intent.topic.as_str() {
        "emergency" => true,
        "other" => false,
        "support" => intent.confidence < 0.5,
        _ => intent.confidence < 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_talk_detection() {
        let c = KeywordIntentClassifier::new();
        for q in [
            "tell me a joke",
            "Hello!",
            "good morning",
            "how are you today?",
            "what's the weather like?",
            "tell me a funny story",
            "can you write me a poem?",
            "what is the meaning of life",
            "thanks a lot",
            "bye",
        ] {
            assert!(c.is_small_talk(q), "expected small talk: {}", q);
        }
    }

    #[test]
    fn test_kb_questions_are_not_small_talk() {
        let c = KeywordIntentClassifier::new();
        for q in [
            "library hours",
            "what are the tuition fees",
            "when is it open?",
            "hello, i need admission info",
            "history of the university",
        ] {
            assert!(!c.is_small_talk(q), "unexpected small talk: {}", q);
        }
    }

    #[test]
    fn test_greeting_and_farewell() {
        let c = KeywordIntentClassifier::new();
        assert!(c.is_greeting("  Hey "));
        assert!(c.is_greeting("What's up?"));
        assert!(!c.is_greeting("hey where is the library"));
        assert!(c.is_farewell("Thank you so much"));
        assert!(c.is_farewell("see you"));
    }

    #[test]
    fn test_classify_topic() {
        let t = classify_topic("How much are the tuition fees?");
        assert_eq!(t.topic, "fees");
        assert!(t.confidence > 0.0);

        assert_eq!(classify_topic("where can I book a hostel room").topic, "accommodation");
        assert_eq!(classify_topic("tell me a joke").topic, "other");
        assert_eq!(classify_topic("").topic, "other");
    }

    #[test]
    fn test_suggested_questions_fall_back_to_general() {
        assert_eq!(suggested_questions("fees")[0], "What are the tuition fees?");
        assert_eq!(suggested_questions("unknown"), suggested_questions("other"));
        assert_eq!(suggested_questions("emergency").len(), 4);
    }

    #[test]
    fn test_should_escalate() {
        let intent = |topic: &str, confidence: f32| TopicIntent {
            topic: topic.to_string(),
            confidence,
        };
        assert!(should_escalate(&intent("emergency", 1.0)));
        assert!(should_escalate(&intent("support", 0.4)));
        assert!(!should_escalate(&intent("support", 0.5)));
        assert!(should_escalate(&intent("fees", 0.2)));
        assert!(!should_escalate(&intent("fees", 0.6)));
        assert!(!should_escalate(&intent("other", 0.0)));

        assert!(should_escalate(&classify_topic("medical emergency near the gym")));
        assert!(!should_escalate(&classify_topic("tuition fees")));
    }
}
