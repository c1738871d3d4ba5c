//! Application configuration for abstractkb.
//!
//! User config lives at `~/.abstractkb/abstractkb.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AbstractKbError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "abstractkb.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".abstractkb";

// ---------------------------------------------------------------------------
// Config structs (matching abstractkb.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listing page and link filter.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Per-document fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Keyword extraction settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,

    /// Artifact storage layout.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Batch report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Catalog page listing newly submitted documents.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Origin prefixed onto matching relative hrefs.
    #[serde(default = "default_site_origin")]
    pub site_origin: String,

    /// Href prefix identifying an abstract-page link.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Number of anchors inspected before discovery stops.
    #[serde(default = "default_anchor_cap")]
    pub anchor_cap: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            site_origin: default_site_origin(),
            path_prefix: default_path_prefix(),
            anchor_cap: default_anchor_cap(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://arxiv.org/list/quant-ph/new".into()
}
fn default_site_origin() -> String {
    "https://arxiv.org".into()
}
fn default_path_prefix() -> String {
    "/abs".into()
}
fn default_anchor_cap() -> usize {
    101
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum documents fetched at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[keywords]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Keywords kept per document.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            max_keywords: default_max_keywords(),
        }
    }
}

fn default_max_keywords() -> usize {
    25
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory all artifacts are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Number of leading URL characters dropped when deriving an artifact key.
    #[serde(default = "default_key_prefix_len")]
    pub key_prefix_len: usize,

    /// Suffix of the raw visible-text artifact.
    #[serde(default = "default_raw_suffix")]
    pub raw_suffix: String,

    /// Suffix of the abstract artifact.
    #[serde(default = "default_clean_suffix")]
    pub clean_suffix: String,

    /// File name of the discovery result.
    #[serde(default = "default_url_list_file")]
    pub url_list_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            key_prefix_len: default_key_prefix_len(),
            raw_suffix: default_raw_suffix(),
            clean_suffix: default_clean_suffix(),
            url_list_file: default_url_list_file(),
        }
    }
}

fn default_output_dir() -> String {
    "var/abstractkb".into()
}
fn default_key_prefix_len() -> usize {
    // len("https://arxiv.org")
    17
}
fn default_raw_suffix() -> String {
    "_raw.txt".into()
}
fn default_clean_suffix() -> String {
    "_clean.txt".into()
}
fn default_url_list_file() -> String {
    "urls.txt".into()
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Keywords reported after each run, in this order.
    #[serde(default = "default_interest_terms")]
    pub interest_terms: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interest_terms: default_interest_terms(),
        }
    }
}

fn default_interest_terms() -> Vec<String> {
    [
        "protection",
        "determinism",
        "photons",
        "geometric",
        "algorithm",
        "envelope",
        "metasurfaces",
        "photonic",
        "wva",
        "memory",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.discovery.catalog_url).map_err(|e| {
            AbstractKbError::config(format!(
                "catalog_url '{}' is not a valid URL: {e}",
                self.discovery.catalog_url
            ))
        })?;

        if self.discovery.path_prefix.is_empty() {
            return Err(AbstractKbError::config("path_prefix must not be empty"));
        }
        if self.discovery.anchor_cap == 0 {
            return Err(AbstractKbError::config("anchor_cap must be at least 1"));
        }
        if self.fetch.concurrency == 0 {
            return Err(AbstractKbError::config("concurrency must be at least 1"));
        }
        if self.keywords.max_keywords == 0 {
            return Err(AbstractKbError::config("max_keywords must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.abstractkb/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AbstractKbError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.abstractkb/abstractkb.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AbstractKbError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        AbstractKbError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AbstractKbError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AbstractKbError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AbstractKbError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("catalog_url"));
        assert!(toml_str.contains("interest_terms"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.discovery.anchor_cap, 101);
        assert_eq!(parsed.keywords.max_keywords, 25);
        assert_eq!(parsed.storage.key_prefix_len, 17);
        assert_eq!(parsed.report.interest_terms.len(), 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[discovery]
catalog_url = "https://arxiv.org/list/cs.CL/new"

[report]
interest_terms = ["transformer", "attention"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.discovery.catalog_url, "https://arxiv.org/list/cs.CL/new");
        assert_eq!(config.discovery.path_prefix, "/abs");
        assert_eq!(config.fetch.concurrency, 4);
        assert_eq!(config.report.interest_terms, vec!["transformer", "attention"]);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.fetch.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency"));

        let mut config = AppConfig::default();
        config.discovery.catalog_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.discovery.anchor_cap = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.keywords.max_keywords = 0;
        assert!(config.validate().is_err());
    }
}
