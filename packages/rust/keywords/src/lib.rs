//! Term-frequency keyword extraction.
//!
//! Abstract text is tokenized into words, lowercased, and filtered down to
//! purely alphabetic non-stopwords. Distinct terms are ranked by how often
//! they occur; the top `max_keywords` become the document's keywords.
//!
//! Abstracts are short, so many of the top terms share a count of one. Ties
//! are broken alphabetically to keep output stable between runs.

mod stopwords;
mod tokenize;

use std::collections::HashMap;

use tracing::trace;

use abstractkb_shared::AppConfig;

pub use stopwords::is_stopword;
pub use tokenize::{sentences, word_tokens};

/// A distinct term and how many times it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// Keyword extraction settings.
#[derive(Debug, Clone, Copy)]
pub struct KeywordOptions {
    /// Upper bound on keywords returned per document.
    pub max_keywords: usize,
}

impl From<&AppConfig> for KeywordOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_keywords: config.keywords.max_keywords,
        }
    }
}

impl Default for KeywordOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Lowercased tokens of `text` that are alphabetic and not stopwords, in order.
pub fn qualifying_tokens(text: &str) -> Vec<String> {
    word_tokens(text)
        .into_iter()
        .map(str::to_lowercase)
        .filter(|w| is_alphabetic_word(w) && !is_stopword(w))
        .collect()
}

fn is_alphabetic_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_alphabetic)
}

/// Every distinct qualifying term with its count, highest count first.
pub fn rank_terms(text: &str) -> Vec<TermCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in qualifying_tokens(text) {
        *counts.entry(token).or_default() += 1;
    }

    let mut ranked: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    ranked
}

/// The top keywords of `text`.
///
/// Returns `min(opts.max_keywords, distinct terms)` entries; empty when no
/// token qualifies.
pub fn extract_keywords(text: &str, opts: &KeywordOptions) -> Vec<String> {
    rank_terms(text)
        .into_iter()
        .take(opts.max_keywords)
        .inspect(|tc| trace!(term = %tc.term, count = tc.count, "keyword"))
        .map(|tc| tc.term)
        .collect()
}
