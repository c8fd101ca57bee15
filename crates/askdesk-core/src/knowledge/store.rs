//! In-memory, read-only snapshot of the knowledge base.

use super::{KnowledgeEntry, KnowledgeSource};
use crate::error::DataError;
use std::collections::BTreeSet;

/// Ordered entry collection loaded once at startup.
///
/// Order is `priority` ascending, then load order. The matcher iterates in this
/// order, so it is the tie-break for every tier.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeStore {
    /// Loads every entry from `source` and fixes the iteration order.
    pub fn load(source: &dyn KnowledgeSource) -> Result<Self, DataError> {
        let entries = source.load_all()?;
        let store = Self::from_entries(entries);
        tracing::info!(
            target: "askdesk::knowledge",
            source = source.name(),
            total = store.len(),
            eligible = store.eligible().count(),
            "Knowledge base loaded"
        );
        Ok(store)
    }

    pub fn from_entries(mut entries: Vec<KnowledgeEntry>) -> Self {
        // stable: equal priorities keep load order
        entries.sort_by_key(|e| e.priority);
        Self { entries }
    }

    /// All entries, including ineligible ones kept for inspection.
    pub fn all(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    /// Entries with both a keyword and an answer, in store order.
    pub fn eligible(&self) -> impl Iterator<Item = &KnowledgeEntry> {
        self.entries.iter().filter(|e| e.is_eligible())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a KnowledgeEntry> {
        self.entries
            .iter()
            .filter(move |e| e.category.eq_ignore_ascii_case(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<KnowledgeEntry>);

    impl KnowledgeSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn load_all(&self) -> Result<Vec<KnowledgeEntry>, DataError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_sorted_by_priority_then_load_order() {
        let store = KnowledgeStore::load(&FixedSource(vec![
            KnowledgeEntry::new("b", "second at 50"),
            KnowledgeEntry::new("a", "first at 10").with_priority(10),
            KnowledgeEntry::new("c", "third at 50"),
        ]))
        .unwrap();
        let keywords: Vec<&str> = store.all().iter().map(|e| e.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ineligible_entries_kept_but_filtered() {
        let store = KnowledgeStore::from_entries(vec![
            KnowledgeEntry::new("library hours", "Mon-Fri"),
            KnowledgeEntry::new("", "orphan answer"),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.eligible().count(), 1);
    }

    #[test]
    fn test_categories() {
        let store = KnowledgeStore::from_entries(vec![
            KnowledgeEntry::new("fees", "x").with_category("fees"),
            KnowledgeEntry::new("library", "y").with_category("campus_life"),
            KnowledgeEntry::new("tuition", "z").with_category("Fees"),
        ]);
        assert_eq!(store.categories(), vec!["Fees", "campus_life", "fees"]);
        assert_eq!(store.by_category("fees").count(), 2);
    }

    #[test]
    fn test_load_propagates_data_error() {
        struct Broken;
        impl KnowledgeSource for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn load_all(&self) -> Result<Vec<KnowledgeEntry>, DataError> {
                Err(DataError::Malformed("bad".into()))
            }
        }
        assert!(KnowledgeStore::load(&Broken).is_err());
    }
}
