//! Listing-page anchor scan.
//!
//! Walks `<a>` elements in document order and keeps those whose `href`
//! starts with the abstract-page prefix. The scan stops after a fixed number
//! of anchors regardless of how many matched.

use std::sync::LazyLock;

use scraper::{Html, Selector};

/// Matches every anchor, with or without an `href`.
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector"));

/// Outcome of scanning one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredLinks {
    /// Absolute document URLs in the order their anchors appear.
    pub urls: Vec<String>,
    /// Number of anchors looked at before the scan ended.
    pub anchors_inspected: usize,
}

/// Rules applied to each anchor.
#[derive(Debug, Clone)]
pub(crate) struct LinkFilter<'a> {
    pub origin: &'a str,
    pub path_prefix: &'a str,
    pub anchor_cap: usize,
}

/// Scan `html` for wanted anchors.
pub(crate) fn extract_links(html: &str, filter: &LinkFilter<'_>) -> DiscoveredLinks {
    let doc = Html::parse_document(html);
    let origin = filter.origin.trim_end_matches('/');
    let mut found = DiscoveredLinks::default();

    for anchor in doc.select(&ANCHOR_SEL).take(filter.anchor_cap) {
        found.anchors_inspected += 1;

        // Wantedness is decided per anchor and never carries over.
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.starts_with(filter.path_prefix) {
            found.urls.push(format!("{origin}{href}"));
        }
    }

    found
}
