//! Keyword → sentence knowledge base.
//!
//! Built incrementally, one document at a time, by a single writer. A
//! keyword's sentence list only ever grows: new matches are appended after
//! the existing ones and nothing is deduplicated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use abstractkb_keywords::sentences;
use abstractkb_shared::Result;
use abstractkb_storage::{ArtifactStore, KNOWLEDGE_BASE_FILE};

/// Mapping from keyword to every sentence that contains it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
    entries: BTreeMap<String, Vec<String>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one document's contribution.
    ///
    /// `text` is split into sentences; each sentence is lowercased and
    /// attributed to every keyword it contains as a substring. Matches are
    /// appended to the keyword's existing list in sentence order. A keyword
    /// with no matching sentence still gets an (empty) entry.
    ///
    /// Returns the number of sentences attributed across all keywords.
    #[instrument(skip_all, fields(keywords = keywords.len()))]
    pub fn merge_document(&mut self, text: &str, keywords: &[String]) -> usize {
        if keywords.is_empty() {
            return 0;
        }

        let lowered: Vec<String> = sentences(text)
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect();

        let mut attributed = 0;
        for keyword in keywords {
            let needle = keyword.to_lowercase();
            let matches: Vec<String> = lowered
                .iter()
                .filter(|s| s.contains(&needle))
                .cloned()
                .collect();
            attributed += matches.len();
            self.entries.entry(needle).or_default().extend(matches);
        }

        debug!(
            sentences = lowered.len(),
            attributed, "document merged into knowledge base"
        );
        attributed
    }

    /// Sentences recorded for `keyword`. Lookup is case-insensitive; a miss is
    /// an empty slice.
    pub fn sentences(&self, keyword: &str) -> &[String] {
        self.entries
            .get(&keyword.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `keyword` has an entry, even an empty one.
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(&keyword.to_lowercase())
    }

    /// All keywords, sorted.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keyword/sentence pairs, sorted by keyword.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of keywords.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the snapshot to `knowledge_base.json` in `store`.
    pub fn save(&self, store: &ArtifactStore) -> Result<()> {
        let path = store.write_json(KNOWLEDGE_BASE_FILE, self)?;
        debug!(path = %path.display(), keywords = self.len(), "knowledge base saved");
        Ok(())
    }

    /// Load the snapshot written by a previous run.
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        store.read_json(KNOWLEDGE_BASE_FILE)
    }
}
