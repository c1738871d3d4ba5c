//! File-based artifact store.
//!
//! Every artifact is one file under the store root:
//!
//! ```text
//! <output_dir>/
//! ├── urls.txt               discovery result, one URL per line
//! ├── <key>_raw.txt          visible text of a document
//! ├── <key>_clean.txt        abstract text of a document
//! ├── knowledge_base.json    keyword → sentences snapshot
//! └── run.json               run manifest
//! ```
//!
//! `<key>` is the document URL with a fixed number of leading characters
//! removed (see [`artifact_key`]).

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use abstractkb_shared::{AbstractKbError, AppConfig, Result, RunManifest};

/// File name of the knowledge-base snapshot.
pub const KNOWLEDGE_BASE_FILE: &str = "knowledge_base.json";

/// File name of the run manifest.
pub const RUN_MANIFEST_FILE: &str = "run.json";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Where and how artifacts are named on disk.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    /// Directory all artifacts are written into.
    pub root: PathBuf,
    /// Leading URL characters dropped when deriving a key.
    pub key_prefix_len: usize,
    /// Suffix appended to the key for the raw visible-text artifact.
    pub raw_suffix: String,
    /// Suffix appended to the key for the abstract artifact.
    pub clean_suffix: String,
    /// File name of the discovery result.
    pub url_list_file: String,
}

impl From<&AppConfig> for StoreLayout {
    fn from(config: &AppConfig) -> Self {
        Self {
            root: PathBuf::from(&config.storage.output_dir),
            key_prefix_len: config.storage.key_prefix_len,
            raw_suffix: config.storage.raw_suffix.clone(),
            clean_suffix: config.storage.clean_suffix.clone(),
            url_list_file: config.storage.url_list_file.clone(),
        }
    }
}

impl StoreLayout {
    /// Default layout rooted at `root`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let mut layout = Self::from(&AppConfig::default());
        layout.root = root.into();
        layout
    }
}

/// Derive the storage key for `url` by dropping its first `prefix_len` characters.
///
/// With the default of 17 (the `https://arxiv.org` origin),
/// `https://arxiv.org/abs/2301.00001` becomes `abs_2301.00001`. Path-hostile
/// characters become `_` and leading separators are dropped. A URL too short
/// to strip falls back to the whole sanitized URL.
pub fn artifact_key(url: &str, prefix_len: usize) -> String {
    let rest = match url.char_indices().nth(prefix_len) {
        Some((idx, _)) => sanitize(&url[idx..]),
        None => String::new(),
    };
    let trimmed = rest.trim_start_matches('_');
    if trimmed.is_empty() {
        sanitize(url)
    } else {
        trimmed.to_string()
    }
}

fn sanitize(source: &str) -> String {
    source
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '*' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle to the artifact directory. Cheap to clone; each fetch task holds one.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: StoreLayout,
}

impl ArtifactStore {
    /// Open the store, creating its root directory if needed.
    pub fn open(layout: StoreLayout) -> Result<Self> {
        std::fs::create_dir_all(&layout.root)
            .map_err(|e| AbstractKbError::io(&layout.root, e))?;
        Ok(Self { layout })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.layout.root
    }

    /// Storage key for a document URL.
    pub fn key_for(&self, url: &str) -> String {
        artifact_key(url, self.layout.key_prefix_len)
    }

    /// Path of the raw visible-text artifact for `url`.
    pub fn raw_path(&self, url: &str) -> PathBuf {
        self.layout
            .root
            .join(format!("{}{}", self.key_for(url), self.layout.raw_suffix))
    }

    /// Path of the abstract artifact for `url`.
    pub fn abstract_path(&self, url: &str) -> PathBuf {
        self.layout
            .root
            .join(format!("{}{}", self.key_for(url), self.layout.clean_suffix))
    }

    /// Path of the discovery result.
    pub fn url_list_path(&self) -> PathBuf {
        self.layout.root.join(&self.layout.url_list_file)
    }

    // -- Discovery result ----------------------------------------------------

    /// Overwrite the discovery result: one URL per line, trailing newline.
    #[instrument(skip_all, fields(count = urls.len()))]
    pub fn write_url_list(&self, urls: &[String]) -> Result<PathBuf> {
        let mut content = String::new();
        for url in urls {
            content.push_str(url);
            content.push('\n');
        }
        let path = self.url_list_path();
        write_atomic(&path, content.as_bytes())?;
        debug!(path = %path.display(), "wrote url list");
        Ok(path)
    }

    /// Read the discovery result back, skipping blank lines.
    pub fn read_url_list(&self) -> Result<Vec<String>> {
        let path = self.url_list_path();
        let content = read_artifact(&self.layout.url_list_file, &path)?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect())
    }

    // -- Per-document text ---------------------------------------------------

    /// Persist the raw visible text of a document.
    pub fn write_raw_text(&self, url: &str, text: &str) -> Result<PathBuf> {
        let path = self.raw_path(url);
        write_atomic(&path, text.as_bytes())?;
        Ok(path)
    }

    /// Persist the abstract text of a document.
    pub fn write_abstract(&self, url: &str, text: &str) -> Result<PathBuf> {
        let path = self.abstract_path(url);
        write_atomic(&path, text.as_bytes())?;
        Ok(path)
    }

    /// Read the abstract text of a document.
    ///
    /// Returns [`AbstractKbError::MissingArtifact`] when it was never written.
    pub fn read_abstract(&self, url: &str) -> Result<String> {
        read_artifact(&self.key_for(url), &self.abstract_path(url))
    }

    // -- JSON snapshots ------------------------------------------------------

    /// Serialize `value` as pretty JSON into `name` under the root.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| AbstractKbError::Serialization(format!("{name}: {e}")))?;
        let path = self.layout.root.join(name);
        write_atomic(&path, content.as_bytes())?;
        Ok(path)
    }

    /// Deserialize JSON file `name` under the root.
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.layout.root.join(name);
        let content = read_artifact(name, &path)?;
        serde_json::from_str(&content)
            .map_err(|e| AbstractKbError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Write `run.json`.
    pub fn write_run_manifest(&self, manifest: &RunManifest) -> Result<PathBuf> {
        self.write_json(RUN_MANIFEST_FILE, manifest)
    }

    /// Read `run.json`.
    pub fn read_run_manifest(&self) -> Result<RunManifest> {
        self.read_json(RUN_MANIFEST_FILE)
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Write to a sibling temp file, then rename over the target.
///
/// The temp name is unique per call, so concurrent writers of the same target
/// never share a temp file; the last rename wins.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

    std::fs::write(&temp, content).map_err(|e| AbstractKbError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        AbstractKbError::io(path, e)
    })
}

fn read_artifact(key: &str, path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AbstractKbError::missing_artifact(key, path))
        }
        Err(e) => Err(AbstractKbError::io(path, e)),
    }
}
