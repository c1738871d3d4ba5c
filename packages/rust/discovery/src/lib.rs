//! Listing-page link discovery.
//!
//! Fetches the catalog page of newly submitted documents and collects the
//! abstract-page URLs it links to. A failure to fetch the listing is fatal to
//! the run: there is nothing to process without it.

mod parser;

use abstractkb_shared::http::{MAX_REDIRECTS, MAX_RESPONSE_SIZE, USER_AGENT};
use abstractkb_shared::{AbstractKbError, AppConfig, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::DiscoveredLinks;

use parser::LinkFilter;

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery process.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Listing page to scan.
    pub catalog_url: String,
    /// Origin prefixed onto matching hrefs. Empty means "derive from `catalog_url`".
    pub site_origin: String,
    /// Href prefix marking an abstract-page link.
    pub path_prefix: String,
    /// Anchors inspected before the scan stops.
    pub anchor_cap: usize,
    /// Timeout for the listing request in seconds.
    pub timeout_secs: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DiscoveryOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            catalog_url: config.discovery.catalog_url.clone(),
            site_origin: config.discovery.site_origin.clone(),
            path_prefix: config.discovery.path_prefix.clone(),
            anchor_cap: config.discovery.anchor_cap,
            timeout_secs: config.fetch.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Fetch the listing page and return the wanted document URLs in page order.
#[instrument(skip_all, fields(catalog_url = %opts.catalog_url))]
pub async fn discover(opts: &DiscoveryOptions) -> Result<DiscoveredLinks> {
    let catalog = Url::parse(&opts.catalog_url).map_err(|e| {
        AbstractKbError::validation(format!("invalid catalog URL '{}': {e}", opts.catalog_url))
    })?;

    let origin = if opts.site_origin.is_empty() {
        origin_url(&catalog)?
    } else {
        opts.site_origin.clone()
    };

    let client = build_client(opts)?;
    let html = fetch_listing(&client, catalog.as_str()).await?;
    debug!(bytes = html.len(), "listing page fetched");

    let filter = LinkFilter {
        origin: &origin,
        path_prefix: &opts.path_prefix,
        anchor_cap: opts.anchor_cap,
    };
    let found = parser::extract_links(&html, &filter);

    info!(
        anchors_inspected = found.anchors_inspected,
        urls = found.urls.len(),
        "discovery complete"
    );

    Ok(found)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract the origin (scheme + host + port) from a URL.
fn origin_url(url: &Url) -> Result<String> {
    let scheme = url.scheme();
    let host = url
        .host_str()
        .ok_or_else(|| AbstractKbError::validation(format!("URL has no host: {url}")))?;

    match url.port() {
        Some(port) => Ok(format!("{scheme}://{host}:{port}")),
        None => Ok(format!("{scheme}://{host}")),
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &DiscoveryOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| {
            AbstractKbError::network(&opts.catalog_url, format!("failed to build HTTP client: {e}"))
        })
}

/// Fetch the listing page body. Non-2xx responses are failures.
async fn fetch_listing(client: &Client, url: &str) -> Result<String> {
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
        if len > MAX_RESPONSE_SIZE {
            return Err(AbstractKbError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| AbstractKbError::network(url, format!("failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><head><title>New submissions</title></head><body>
        <a href="/">home</a>
        <dl>
          <dt><a href="/abs/2301.00001" title="Abstract">arXiv:2301.00001</a>
              <a href="/pdf/2301.00001">pdf</a></dt>
          <dt><a href="/other/x">other</a></dt>
          <dt><a href="/abs/2301.00002" title="Abstract">arXiv:2301.00002</a></dt>
        </dl>
    </body></html>"#;

    fn opts_for(server: &wiremock::MockServer, origin: &str) -> DiscoveryOptions {
        DiscoveryOptions {
            catalog_url: format!("{}/list/quant-ph/new", server.uri()),
            site_origin: origin.to_string(),
            path_prefix: "/abs".into(),
            anchor_cap: 101,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_origin_url_simple() {
        let url = Url::parse("https://arxiv.org/list/quant-ph/new").unwrap();
        assert_eq!(origin_url(&url).unwrap(), "https://arxiv.org");
    }

    #[test]
    fn test_origin_url_with_port() {
        let url = Url::parse("http://localhost:3000/list").unwrap();
        assert_eq!(origin_url(&url).unwrap(), "http://localhost:3000");
    }

    #[test]
    fn test_default_options_match_config() {
        let opts = DiscoveryOptions::default();
        assert_eq!(opts.anchor_cap, 101);
        assert_eq!(opts.path_prefix, "/abs");
        assert_eq!(opts.site_origin, "https://arxiv.org");
    }

    #[tokio::test]
    async fn test_discover_end_to_end() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/list/quant-ph/new"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let found = discover(&opts_for(&server, "https://arxiv.org")).await.unwrap();

        assert_eq!(
            found.urls,
            vec![
                "https://arxiv.org/abs/2301.00001",
                "https://arxiv.org/abs/2301.00002",
            ]
        );
        assert_eq!(found.anchors_inspected, 5);
    }

    #[tokio::test]
    async fn test_discover_derives_origin_when_unset() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/list/quant-ph/new"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let found = discover(&opts_for(&server, "")).await.unwrap();
        assert_eq!(found.urls[0], format!("{}/abs/2301.00001", server.uri()));
    }

    #[tokio::test]
    async fn test_discover_listing_failure_is_fatal() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/list/quant-ph/new"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = discover(&opts_for(&server, "https://arxiv.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, AbstractKbError::Network { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_discover_rejects_invalid_catalog_url() {
        let opts = DiscoveryOptions {
            catalog_url: "::not a url::".into(),
            ..DiscoveryOptions::default()
        };
        let err = discover(&opts).await.unwrap_err();
        assert!(matches!(err, AbstractKbError::Validation { .. }));
    }
}
