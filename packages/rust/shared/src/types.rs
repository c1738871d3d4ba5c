//! Core domain types for abstractkb runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AbstractKbError;

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DocumentArtifact
// ---------------------------------------------------------------------------

/// A fetched document in its two persisted forms.
#[derive(Debug, Clone)]
pub struct DocumentArtifact {
    /// Document URL as discovered.
    pub url: String,
    /// Storage key derived from the URL.
    pub key: String,
    /// All visible text nodes joined by a single space.
    pub raw_text: String,
    /// Abstract region, emitted node by node without separators.
    pub abstract_text: String,
    /// SHA-256 of `raw_text`.
    pub content_hash: String,
    /// When the document was fetched.
    pub fetched_at: DateTime<Utc>,
    /// HTTP status code from fetch.
    pub status_code: u16,
}

/// Compute the hex SHA-256 of `content`.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Run manifest
// ---------------------------------------------------------------------------

/// Pipeline stage at which a document was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    /// The document page could not be fetched.
    Fetch,
    /// The fetched text could not be written to the artifact store.
    Store,
    /// The abstract artifact was missing, or its key belongs to another URL.
    Artifact,
}

impl SkipStage {
    /// Stage a per-document error is attributed to.
    pub fn of(err: &AbstractKbError) -> Self {
        match err {
            AbstractKbError::Network { .. } => Self::Fetch,
            AbstractKbError::MissingArtifact { .. } | AbstractKbError::Validation { .. } => {
                Self::Artifact
            }
            _ => Self::Store,
        }
    }
}

impl std::fmt::Display for SkipStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Store => f.write_str("store"),
            Self::Artifact => f.write_str("artifact"),
        }
    }
}

/// A document that did not contribute to the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub url: String,
    pub stage: SkipStage,
    pub reason: String,
}

/// Per-document entry in `run.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub url: String,
    pub key: String,
    /// SHA-256 of the raw visible text.
    pub content_hash: String,
    /// Abstract length in bytes; zero when no abstract marker was found.
    pub abstract_len: usize,
    /// Keywords extracted from the abstract, highest count first.
    pub keywords: Vec<String>,
}

/// The `run.json` structure written at the end of each pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub run_id: RunId,
    pub catalog_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of URLs produced by discovery.
    pub discovered: usize,
    /// Documents merged into the knowledge base, in discovery order.
    pub documents: Vec<DocumentRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        let hash = content_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn manifest_serialization() {
        let manifest = RunManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id: RunId::new(),
            catalog_url: "https://arxiv.org/list/quant-ph/new".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            discovered: 2,
            documents: vec![DocumentRecord {
                url: "https://arxiv.org/abs/2301.00001".into(),
                key: "abs_2301.00001".into(),
                content_hash: content_hash("page"),
                abstract_len: 42,
                keywords: vec!["photon".into(), "memory".into()],
            }],
            skipped: vec![SkippedDocument {
                url: "https://arxiv.org/abs/2301.00002".into(),
                stage: SkipStage::Fetch,
                reason: "HTTP 503".into(),
            }],
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        assert!(json.contains("\"stage\": \"fetch\""));
        let parsed: RunManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.documents[0].keywords, vec!["photon", "memory"]);
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn skip_stage_follows_error_kind() {
        let network = AbstractKbError::network("https://arxiv.org/abs/1", "HTTP 503");
        let io = AbstractKbError::io(
            "/tmp/x_clean.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let missing = AbstractKbError::missing_artifact("abs_1", "/tmp/abs_1_clean.txt");
        let collision = AbstractKbError::validation("artifact key 'x' is already used");

        assert_eq!(SkipStage::of(&network), SkipStage::Fetch);
        assert_eq!(SkipStage::of(&io), SkipStage::Store);
        assert_eq!(SkipStage::of(&missing), SkipStage::Artifact);
        assert_eq!(SkipStage::of(&collision), SkipStage::Artifact);
        assert_eq!(SkipStage::Store.to_string(), "store");
    }

    #[test]
    fn manifest_without_skips_omits_field() {
        let manifest = RunManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id: RunId::new(),
            catalog_url: "https://arxiv.org/list/quant-ph/new".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            discovered: 0,
            documents: vec![],
            skipped: vec![],
        };
        let json = serde_json::to_string(&manifest).expect("serialize");
        assert!(!json.contains("skipped"));
    }
}
