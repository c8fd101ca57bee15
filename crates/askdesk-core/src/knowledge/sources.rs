//! Concrete [`KnowledgeSource`] implementations.

use super::{KnowledgeEntry, KnowledgeSource};
use crate::error::DataError;
use sled::Db;
use std::path::{Path, PathBuf};

/// Sled tree holding dashboard-managed entries.
pub const ENTRIES_TREE: &str = "knowledge_entries";

/// Static JSON array of records (`knowledge.json`).
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeSource for JsonFileSource {
    fn name(&self) -> &str {
        "json_file"
    }

    fn load_all(&self) -> Result<Vec<KnowledgeEntry>, DataError> {
        if !self.path.exists() {
            return Err(DataError::Missing(self.path.clone()));
        }
        let raw = std::fs::read_to_string(&self.path)?;
        parse_entries(&raw)
    }
}

/// Parses a JSON array of records. Anything else is malformed.
pub(crate) fn parse_entries(raw: &str) -> Result<Vec<KnowledgeEntry>, DataError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let records = value
        .as_array()
        .ok_or_else(|| DataError::Malformed("expected a JSON array of records".to_string()))?;
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if !record.is_object() {
                return Err(DataError::Malformed(format!("record {} is not an object", i)));
            }
            serde_json::from_value::<KnowledgeEntry>(record.clone())
                .map_err(|e| DataError::Malformed(format!("record {}: {}", i, e)))
        })
        .collect()
}

/// Sled-backed store of entries created through the admin dashboard.
///
/// Keys are zero-padded insertion sequence numbers so iteration order is load order.
pub struct SledSource {
    db: Db,
}

impl SledSource {
    /// Opens or creates the entry DB at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Appends an entry; returns its key.
    pub fn insert_entry(&self, entry: &KnowledgeEntry) -> Result<String, DataError> {
        let tree = self.db.open_tree(ENTRIES_TREE)?;
        let seq = self.db.generate_id()?;
        let key = format!("entry/{:020}", seq);
        let bytes = serde_json::to_vec(entry)?;
        tree.insert(key.as_bytes(), bytes)?;
        tree.flush()?;
        Ok(key)
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<usize, DataError> {
        Ok(self.db.open_tree(ENTRIES_TREE)?.len())
    }
}

impl KnowledgeSource for SledSource {
    fn name(&self) -> &str {
        "sled"
    }

    fn load_all(&self) -> Result<Vec<KnowledgeEntry>, DataError> {
        let tree = self.db.open_tree(ENTRIES_TREE)?;
        let mut out = Vec::new();
        for item in tree.iter() {
            let (k, v) = item?;
            let entry = serde_json::from_slice::<KnowledgeEntry>(&v).map_err(|e| {
                DataError::Malformed(format!("{}: {}", String::from_utf8_lossy(&k), e))
            })?;
            out.push(entry);
        }
        Ok(out)
    }
}

/// Concatenates several sources in order. Any failing source fails the load.
pub struct CombinedSource {
    sources: Vec<Box<dyn KnowledgeSource>>,
}

impl CombinedSource {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Box<dyn KnowledgeSource>) -> Self {
        self.sources.push(source);
        self
    }
}

impl Default for CombinedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeSource for CombinedSource {
    fn name(&self) -> &str {
        "combined"
    }

    fn load_all(&self) -> Result<Vec<KnowledgeEntry>, DataError> {
        let mut all = Vec::new();
        for source in &self.sources {
            let entries = source.load_all()?;
            tracing::info!(
                target: "askdesk::knowledge",
                source = source.name(),
                count = entries.len(),
                "Loaded knowledge entries"
            );
            all.extend(entries);
        }
        Ok(all)
    }
}
