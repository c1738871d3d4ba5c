//! Shared types, error model, and configuration for abstractkb.
//!
//! This crate is the foundation depended on by all other abstractkb crates.
//! It provides:
//! - [`AbstractKbError`]: the unified error type
//! - Domain types ([`DocumentArtifact`], [`RunId`], [`RunManifest`])
//! - Configuration ([`AppConfig`], config loading and validation)
//! - HTTP client limits ([`http`])

pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DiscoveryConfig, FetchConfig, KeywordsConfig, ReportConfig, StorageConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{AbstractKbError, Result};
pub use types::{
    CURRENT_SCHEMA_VERSION, DocumentArtifact, DocumentRecord, RunId, RunManifest, SkipStage,
    SkippedDocument, content_hash,
};
