//! Bounded, concurrent document fetcher.
//!
//! Each document is fetched, cleaned, and persisted by its own task. A
//! semaphore caps how many run at once. Outcomes come back in the order the
//! URLs were given, so later stages can stay sequential and ordered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use abstractkb_shared::http::{MAX_REDIRECTS, MAX_RESPONSE_SIZE, USER_AGENT};
use abstractkb_shared::{AbstractKbError, AppConfig, DocumentArtifact, Result, content_hash};
use abstractkb_storage::ArtifactStore;

use crate::extract::clean_document;

// ---------------------------------------------------------------------------
// Options & outcomes
// ---------------------------------------------------------------------------

/// Runtime fetch settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum documents in flight.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl From<&AppConfig> for FetchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.fetch.concurrency,
            timeout_secs: config.fetch.timeout_secs,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Result of fetching one document.
#[derive(Debug)]
pub struct FetchOutcome {
    pub url: String,
    pub result: Result<DocumentArtifact>,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Fetches document pages and writes their artifacts.
pub struct Fetcher {
    client: Client,
    store: ArtifactStore,
    concurrency: usize,
    max_body: u64,
}

impl Fetcher {
    /// Create a fetcher writing into `store`.
    pub fn new(opts: &FetchOptions, store: ArtifactStore) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| {
                AbstractKbError::network("<client>", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            store,
            concurrency: opts.concurrency.max(1),
            max_body: MAX_RESPONSE_SIZE,
        })
    }

    /// Reject document bodies larger than `bytes` (default [`MAX_RESPONSE_SIZE`]).
    pub fn with_max_body(mut self, bytes: u64) -> Self {
        self.max_body = bytes;
        self
    }

    /// Fetch, clean, and persist a single document.
    pub async fn fetch_document(&self, url: &str) -> Result<DocumentArtifact> {
        fetch_and_store(&self.client, &self.store, url, self.max_body).await
    }

    /// Fetch every URL on the bounded pool.
    ///
    /// Failures are returned per document; this never aborts early. A URL
    /// whose storage key is already taken by a different URL in the list is
    /// not fetched and fails with a validation error, so one document can
    /// never overwrite another's artifacts. Repeats of the same URL are
    /// fetched independently.
    /// `on_fetched(url, current, total)` runs as each outcome is collected.
    #[instrument(skip_all, fields(count = urls.len(), concurrency = self.concurrency))]
    pub async fn fetch_all(
        &self,
        urls: &[String],
        on_fetched: &(dyn Fn(&str, usize, usize) + Sync),
    ) -> Vec<FetchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let total = urls.len();
        let mut key_owners: HashMap<String, &str> = HashMap::new();

        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let key = self.store.key_for(url);
                let owner = *key_owners.entry(key.clone()).or_insert(url.as_str());
                if owner != url.as_str() {
                    return Err(AbstractKbError::validation(format!(
                        "artifact key '{key}' of {url} is already used by {owner}"
                    )));
                }

                let client = self.client.clone();
                let store = self.store.clone();
                let sem = semaphore.clone();
                let url = url.clone();
                let max_body = self.max_body;

                Ok(tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await.map_err(|e| {
                        AbstractKbError::network(&url, format!("fetch pool closed: {e}"))
                    })?;
                    fetch_and_store(&client, &store, &url, max_body).await
                }))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(total);
        for (i, (url, handle)) in urls.iter().zip(handles).enumerate() {
            let result = match handle {
                Ok(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(AbstractKbError::network(url, format!("fetch task failed: {e}"))),
                },
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                warn!(%url, error = %e, "document unavailable");
            }
            on_fetched(url, i + 1, total);
            outcomes.push(FetchOutcome {
                url: url.clone(),
                result,
            });
        }

        let fetched = outcomes.iter().filter(|o| o.result.is_ok()).count();
        info!(fetched, failed = total - fetched, "fetch stage complete");

        outcomes
    }
}

/// GET `url`, reduce it to visible text and abstract, and write both artifacts.
async fn fetch_and_store(
    client: &Client,
    store: &ArtifactStore,
    url: &str,
    max_body: u64,
) -> Result<DocumentArtifact> {
    debug!(%url, "fetching document");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AbstractKbError::network(url, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AbstractKbError::network(url, format!("HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > max_body {
            return Err(AbstractKbError::network(
                url,
                format!("response too large ({len} bytes, max {max_body})"),
            ));
        }
    }

    let body = response
        .text()
        .await
        .map_err(|e| AbstractKbError::network(url, format!("body read failed: {e}")))?;
    if body.len() as u64 > max_body {
        return Err(AbstractKbError::network(
            url,
            format!("response too large ({} bytes, max {max_body})", body.len()),
        ));
    }

    let cleaned = clean_document(&body);
    if cleaned.abstract_text.is_empty() {
        debug!(%url, "no abstract marker on page");
    }

    store.write_raw_text(url, &cleaned.raw_text)?;
    store.write_abstract(url, &cleaned.abstract_text)?;

    Ok(DocumentArtifact {
        url: url.to_string(),
        key: store.key_for(url),
        content_hash: content_hash(&cleaned.raw_text),
        raw_text: cleaned.raw_text,
        abstract_text: cleaned.abstract_text,
        fetched_at: Utc::now(),
        status_code: status.as_u16(),
    })
}

#[cfg(test)]
mod fetcher_tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use abstractkb_storage::StoreLayout;
    use uuid::Uuid;

    fn abs_page(body: &str) -> String {
        format!(
            r#"<html><head><title>paper</title></head><body>
<h1>Paper</h1>
<blockquote><span>Abstract:</span>{body}
</blockquote>
<p>Subjects: quant-ph</p></body></html>"#
        )
    }

    fn temp_store() -> (ArtifactStore, PathBuf) {
        // Mock-server URLs keep their whole text in the key.
        temp_store_stripping(0)
    }

    fn temp_store_stripping(key_prefix_len: usize) -> (ArtifactStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("abstractkb-fetch-test-{}", Uuid::now_v7()));
        let mut layout = StoreLayout::at(&dir);
        layout.key_prefix_len = key_prefix_len;
        (ArtifactStore::open(layout).unwrap(), dir)
    }

    fn opts(concurrency: usize) -> FetchOptions {
        FetchOptions {
            concurrency,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn fetch_document_writes_both_artifacts() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/abs/1"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(abs_page("Photons exhibit determinism.")),
            )
            .mount(&server)
            .await;

        let (store, dir) = temp_store();
        let fetcher = Fetcher::new(&opts(2), store.clone()).unwrap();
        let url = format!("{}/abs/1", server.uri());

        let doc = fetcher.fetch_document(&url).await.unwrap();

        assert_eq!(doc.abstract_text, "Abstract:Photons exhibit determinism.\n");
        assert_eq!(doc.status_code, 200);
        assert_eq!(doc.content_hash.len(), 64);
        assert_eq!(store.read_abstract(&url).unwrap(), doc.abstract_text);
        let raw = std::fs::read_to_string(store.raw_path(&url)).unwrap();
        assert!(raw.contains("Subjects: quant-ph"));
        assert!(!raw.contains("paper"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn fetch_all_keeps_order_and_isolates_failures() {
        let server = wiremock::MockServer::start().await;
        for (path, text) in [("/abs/1", "First."), ("/abs/3", "Third.")] {
            wiremock::Mock::given(wiremock::matchers::path(path))
                .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(abs_page(text)))
                .mount(&server)
                .await;
        }
        wiremock::Mock::given(wiremock::matchers::path("/abs/2"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (store, dir) = temp_store();
        let fetcher = Fetcher::new(&opts(2), store).unwrap();
        let urls: Vec<String> = (1..=3)
            .map(|i| format!("{}/abs/{i}", server.uri()))
            .collect();

        let seen = AtomicUsize::new(0);
        let outcomes = fetcher
            .fetch_all(&urls, &|_, current, total| {
                assert_eq!(total, 3);
                seen.store(current, Ordering::SeqCst);
            })
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        let order: Vec<&str> = outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(order, urls.iter().map(String::as_str).collect::<Vec<_>>());

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(AbstractKbError::Network { .. })
        ));
        assert_eq!(
            outcomes[2].result.as_ref().unwrap().abstract_text,
            "Abstract:Third.\n"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn slow_document_times_out_without_aborting_others() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/abs/slow"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(abs_page("Late."))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::path("/abs/fast"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(abs_page("Quick.")))
            .mount(&server)
            .await;

        let (store, dir) = temp_store();
        let fetcher = Fetcher::new(
            &FetchOptions {
                concurrency: 2,
                timeout_secs: 1,
            },
            store,
        )
        .unwrap();
        let urls = vec![
            format!("{}/abs/slow", server.uri()),
            format!("{}/abs/fast", server.uri()),
        ];

        let outcomes = fetcher.fetch_all(&urls, &|_, _, _| {}).await;
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn repeated_url_is_fetched_for_every_occurrence() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/abs/2301.00001"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(abs_page("Same paper.")),
            )
            .mount(&server)
            .await;

        let (store, dir) = temp_store();
        let fetcher = Fetcher::new(&opts(8), store.clone()).unwrap();
        let url = format!("{}/abs/2301.00001", server.uri());
        let urls = vec![url.clone(); 40];

        let outcomes = fetcher.fetch_all(&urls, &|_, _, _| {}).await;

        assert_eq!(outcomes.len(), 40);
        for outcome in &outcomes {
            assert!(outcome.result.is_ok(), "{:?}", outcome.result);
        }
        assert_eq!(store.read_abstract(&url).unwrap(), "Abstract:Same paper.\n");
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn colliding_keys_never_overwrite_another_document() {
        let server = wiremock::MockServer::start().await;
        for (path, text) in [
            ("/abs/2210.00001", "Alpha photons shine."),
            ("/abs/2301.00001", "Beta memory holds."),
        ] {
            wiremock::Mock::given(wiremock::matchers::path(path))
                .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(abs_page(text)))
                .mount(&server)
                .await;
        }

        // Strip origin + "/abs/YYMM." so both URLs map to "00001".
        let (store, dir) = temp_store_stripping(server.uri().len() + "/abs/2210.".len());
        let fetcher = Fetcher::new(&opts(2), store.clone()).unwrap();
        let urls = vec![
            format!("{}/abs/2210.00001", server.uri()),
            format!("{}/abs/2301.00001", server.uri()),
        ];
        assert_eq!(store.key_for(&urls[0]), store.key_for(&urls[1]));

        let outcomes = fetcher.fetch_all(&urls, &|_, _, _| {}).await;

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(AbstractKbError::Validation { .. })
        ));
        assert_eq!(
            store.read_abstract(&urls[0]).unwrap(),
            "Abstract:Alpha photons shine.\n"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_and_not_stored() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/abs/big"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(abs_page(&"Photons abound. ".repeat(20))),
            )
            .mount(&server)
            .await;

        let (store, dir) = temp_store();
        let fetcher = Fetcher::new(&opts(1), store.clone()).unwrap();
        assert_eq!(fetcher.max_body, MAX_RESPONSE_SIZE);
        let fetcher = fetcher.with_max_body(64);
        let url = format!("{}/abs/big", server.uri());

        let err = fetcher.fetch_document(&url).await.unwrap_err();

        assert!(matches!(err, AbstractKbError::Network { .. }));
        assert!(err.to_string().contains("too large"));
        assert!(matches!(
            store.read_abstract(&url),
            Err(AbstractKbError::MissingArtifact { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
