//! Visible-text extraction and abstract isolation.
//!
//! A document page is reduced to its visible text nodes in document order.
//! The abstract is the run of nodes that starts at the one beginning with
//! [`ABSTRACT_MARKER`] and stops before the next node beginning with a
//! newline. This depends on the page markup placing a line break right after
//! the abstract block; a layout change upstream silently breaks it.

use scraper::{Html, Node};

use crate::visibility::is_visible;

/// Text a node must start with to open the abstract region.
pub const ABSTRACT_MARKER: &str = "Abstract:";

/// Separator between nodes in the raw visible-text artifact.
const RAW_SEPARATOR: &str = " ";

/// A page reduced to the two text forms that get persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedDocument {
    /// Every visible text node joined by a single space.
    pub raw_text: String,
    /// The abstract region, nodes concatenated verbatim.
    pub abstract_text: String,
}

/// Parse `html` and produce both text forms.
pub fn clean_document(html: &str) -> CleanedDocument {
    let nodes = visible_text_nodes(html);
    CleanedDocument {
        raw_text: nodes.join(RAW_SEPARATOR),
        abstract_text: extract_abstract(nodes.iter().map(String::as_str)),
    }
}

/// All visible text nodes of `html`, in document order.
pub fn visible_text_nodes(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    doc.tree
        .root()
        .descendants()
        .filter_map(|node| {
            let Node::Text(text) = node.value() else {
                return None;
            };
            let parent_tag = node
                .parent()
                .and_then(|p| p.value().as_element().map(|el| el.name()));
            is_visible(parent_tag, text).then(|| text.to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Abstract state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Before,
    InAbstract,
}

/// Concatenate the nodes that fall inside the abstract region.
///
/// Empty when no node starts with the marker; runs to the last node when no
/// newline-prefixed node follows the marker.
pub fn extract_abstract<'a>(nodes: impl IntoIterator<Item = &'a str>) -> String {
    let mut state = ScanState::Before;
    let mut out = String::new();

    for node in nodes {
        if node.starts_with(ABSTRACT_MARKER) {
            state = ScanState::InAbstract;
        }
        if node.starts_with('\n') {
            state = ScanState::Before;
        }
        if state == ScanState::InAbstract {
            out.push_str(node);
        }
    }

    out
}
