//! End-to-end run: listing → fetch/clean → keywords → knowledge base.
//!
//! Fetching runs on a bounded pool. Everything after it is a single writer
//! walking the URL list in discovery order, so the knowledge base sees
//! documents in the same order on every run.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{Level, debug, enabled, info, instrument, warn};

use abstractkb_crawler::{FetchOptions, FetchOutcome, Fetcher};
use abstractkb_discovery::DiscoveryOptions;
use abstractkb_keywords::{KeywordOptions, extract_keywords};
use abstractkb_shared::{
    AppConfig, CURRENT_SCHEMA_VERSION, DocumentRecord, Result, RunId, RunManifest, SkipStage,
    SkippedDocument,
};
use abstractkb_storage::{ArtifactStore, StoreLayout};

use crate::knowledge::KnowledgeBase;
use crate::report::write_full_dump;

/// Everything a run needs, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub discovery: DiscoveryOptions,
    pub fetch: FetchOptions,
    pub keywords: KeywordOptions,
    pub layout: StoreLayout,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            discovery: DiscoveryOptions::from(config),
            fetch: FetchOptions::from(config),
            keywords: KeywordOptions::from(config),
            layout: StoreLayout::from(config),
        }
    }
}

/// Counts and failures of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    /// URLs produced by discovery.
    pub discovered: usize,
    /// Documents merged into the knowledge base.
    pub processed: usize,
    /// Documents dropped, with the stage and reason.
    pub skipped: Vec<SkippedDocument>,
    /// Distinct keywords in the knowledge base.
    pub keyword_count: usize,
    pub elapsed: Duration,
}

/// Result of [`run_pipeline`].
#[derive(Debug)]
pub struct PipelineOutcome {
    pub knowledge_base: KnowledgeBase,
    pub summary: RunSummary,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each document's fetch outcome is collected.
    fn document_fetched(&self, url: &str, current: usize, total: usize);
    /// Called after a document is merged into the knowledge base.
    fn document_indexed(&self, url: &str, keywords: usize, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_fetched(&self, _url: &str, _current: usize, _total: usize) {}
    fn document_indexed(&self, _url: &str, _keywords: usize, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full pipeline.
///
/// 1. Discover document URLs on the listing page and persist them
/// 2. Fetch and clean every document on the bounded pool
/// 3. Extract keywords and merge, one document at a time, in URL order
/// 4. Persist the knowledge base and run manifest
///
/// Only a listing-page failure is fatal. Documents that cannot be fetched
/// or whose abstract is missing on disk are skipped and listed in the
/// summary.
#[instrument(skip_all, fields(catalog_url = %config.discovery.catalog_url))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<PipelineOutcome> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();
    info!(%run_id, "starting pipeline");

    let store = ArtifactStore::open(config.layout.clone())?;

    // --- Phase 1: Discovery ---
    progress.phase("Discovering documents");
    let discovered = abstractkb_discovery::discover(&config.discovery).await?;
    let urls = discovered.urls;
    store.write_url_list(&urls)?;

    // --- Phase 2: Fetch/Clean ---
    progress.phase("Fetching documents");
    let fetcher = Fetcher::new(&config.fetch, store.clone())?;
    let outcomes = fetcher
        .fetch_all(&urls, &|url, current, total| {
            progress.document_fetched(url, current, total)
        })
        .await;

    // --- Phase 3: Keywords + knowledge base ---
    progress.phase("Building knowledge base");
    let Indexed {
        knowledge_base: kb,
        documents,
        skipped,
    } = index_outcomes(&store, outcomes, &config.keywords, progress)?;

    if enabled!(Level::DEBUG) {
        let mut dump = Vec::new();
        if write_full_dump(&kb, &mut dump).is_ok() {
            debug!(knowledge_base = %String::from_utf8_lossy(&dump), "knowledge base contents");
        }
    }

    // --- Phase 4: Persist ---
    progress.phase("Saving knowledge base");
    kb.save(&store)?;

    let summary = RunSummary {
        run_id: run_id.clone(),
        discovered: urls.len(),
        processed: documents.len(),
        skipped,
        keyword_count: kb.len(),
        elapsed: start.elapsed(),
    };

    store.write_run_manifest(&RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id,
        catalog_url: config.discovery.catalog_url.clone(),
        started_at,
        finished_at: Utc::now(),
        discovered: summary.discovered,
        documents,
        skipped: summary.skipped.clone(),
    })?;

    progress.done(&summary);

    info!(
        run_id = %summary.run_id,
        discovered = summary.discovered,
        processed = summary.processed,
        skipped = summary.skipped.len(),
        keywords = summary.keyword_count,
        elapsed_ms = summary.elapsed.as_millis(),
        "pipeline complete"
    );

    Ok(PipelineOutcome {
        knowledge_base: kb,
        summary,
    })
}

/// Output of the single-writer indexing stage.
struct Indexed {
    knowledge_base: KnowledgeBase,
    documents: Vec<DocumentRecord>,
    skipped: Vec<SkippedDocument>,
}

/// Merge fetch outcomes into a fresh knowledge base, in order.
///
/// Each abstract is read back from the store. Fetch failures and missing
/// artifacts are recorded as skips; any other read error aborts.
fn index_outcomes(
    store: &ArtifactStore,
    outcomes: Vec<FetchOutcome>,
    opts: &KeywordOptions,
    progress: &dyn ProgressReporter,
) -> Result<Indexed> {
    let mut kb = KnowledgeBase::new();
    let mut documents = Vec::new();
    let mut skipped = Vec::new();
    let total = outcomes.len();

    for (i, outcome) in outcomes.into_iter().enumerate() {
        let artifact = match outcome.result {
            Ok(artifact) => artifact,
            Err(e) => {
                skipped.push(SkippedDocument {
                    url: outcome.url,
                    stage: SkipStage::of(&e),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let abstract_text = match store.read_abstract(&artifact.url) {
            Ok(text) => text,
            Err(e) if e.is_recoverable() => {
                warn!(url = %artifact.url, error = %e, "abstract artifact unavailable, skipping");
                skipped.push(SkippedDocument {
                    url: artifact.url,
                    stage: SkipStage::Artifact,
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let keywords = extract_keywords(&abstract_text, opts);
        kb.merge_document(&abstract_text, &keywords);
        debug!(url = %artifact.url, keywords = keywords.len(), "document indexed");
        progress.document_indexed(&artifact.url, keywords.len(), i + 1, total);

        documents.push(DocumentRecord {
            url: artifact.url,
            key: artifact.key,
            content_hash: artifact.content_hash,
            abstract_len: abstract_text.len(),
            keywords,
        });
    }

    Ok(Indexed {
        knowledge_base: kb,
        documents,
        skipped,
    })
}
