//! Keyword lookups rendered as plain-text reports.

use std::io::{self, Write};

use tracing::warn;

use crate::knowledge::KnowledgeBase;

/// Marker printed under a keyword with nothing to show.
const NO_SENTENCES: &str = "(no sentences)";

/// One keyword's section of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub keyword: String,
    pub sentences: Vec<String>,
    /// False when the keyword has no entry in the knowledge base.
    pub found: bool,
}

/// Look up each of `terms` in order.
///
/// A term missing from the knowledge base yields an empty entry with
/// `found = false`.
pub fn build_report<S: AsRef<str>>(kb: &KnowledgeBase, terms: &[S]) -> Vec<ReportEntry> {
    terms
        .iter()
        .map(|term| {
            let keyword = term.as_ref();
            let found = kb.contains(keyword);
            if !found {
                warn!(%keyword, "keyword not in knowledge base");
            }
            ReportEntry {
                keyword: keyword.to_string(),
                sentences: kb.sentences(keyword).to_vec(),
                found,
            }
        })
        .collect()
}

/// Render entries: a `KEYWORD:` line, then one sentence per line.
pub fn write_report<W: Write>(entries: &[ReportEntry], out: &mut W) -> io::Result<()> {
    for entry in entries {
        write_section(out, &entry.keyword, &entry.sentences)?;
    }
    Ok(())
}

/// Render every keyword in the knowledge base, sorted.
pub fn write_full_dump<W: Write>(kb: &KnowledgeBase, out: &mut W) -> io::Result<()> {
    for (keyword, sentences) in kb.iter() {
        write_section(out, keyword, sentences)?;
    }
    Ok(())
}

fn write_section<W: Write>(out: &mut W, keyword: &str, sentences: &[String]) -> io::Result<()> {
    writeln!(out, "KEYWORD: {keyword}")?;
    if sentences.is_empty() {
        writeln!(out, "  {NO_SENTENCES}")?;
    }
    for sentence in sentences {
        writeln!(out, "  {sentence}")?;
    }
    writeln!(out)
}
