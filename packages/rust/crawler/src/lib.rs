//! Document fetching and text cleaning.
//!
//! This crate provides:
//! - [`visibility`]: decides whether an HTML text node is rendered to readers
//! - [`extract`]: visible-text extraction and the abstract state machine
//! - [`engine`]: bounded concurrent fetcher that persists both text artifacts

pub mod engine;
pub mod extract;
pub mod visibility;

pub use engine::{FetchOptions, FetchOutcome, Fetcher};
pub use extract::{
    ABSTRACT_MARKER, CleanedDocument, clean_document, extract_abstract, visible_text_nodes,
};
pub use visibility::is_visible;
