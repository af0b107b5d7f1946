//! Relay-based document fetching.
//!
//! A target page is never requested directly. Instead it is wrapped in each
//! configured relay template in turn (third-party proxies that fetch the page
//! on our behalf). The first relay that answers with a success status wins;
//! failures are logged and skipped, never retried.

use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use vidpack_shared::{
    ENCODED_URL_PLACEHOLDER, FetchConfig, RAW_URL_PLACEHOLDER, Result, VidPackError,
};

/// Maximum number of redirects to follow per relay request.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for relay requests.
const USER_AGENT: &str = concat!("VidPack/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// RelayTemplate
// ---------------------------------------------------------------------------

/// A relay URL with a placeholder for the target document.
///
/// `{url}` is substituted with the percent-encoded target and `{raw_url}` with
/// the target verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTemplate(String);

impl RelayTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Render the concrete request URL for one fetch attempt.
    pub fn render(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        self.0
            .replace(ENCODED_URL_PLACEHOLDER, &encoded)
            .replace(RAW_URL_PLACEHOLDER, target)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Fetch options
// ---------------------------------------------------------------------------

/// Configuration for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Relays in the order they are tried.
    pub relays: Vec<RelayTemplate>,
    /// Timeout for each relay request in seconds.
    pub timeout_secs: u64,
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            relays: config.relays.iter().cloned().map(RelayTemplate::new).collect(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SourceFetcher
// ---------------------------------------------------------------------------

/// Fetches raw page markup through an ordered list of relays.
pub struct SourceFetcher {
    client: Client,
    relays: Vec<RelayTemplate>,
}

impl SourceFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| VidPackError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            relays: opts.relays.clone(),
        })
    }

    pub fn relays(&self) -> &[RelayTemplate] {
        &self.relays
    }

    /// Fetch the markup of `url`, trying each relay in order.
    ///
    /// Relays are attempted strictly one after another. The first success
    /// short-circuits the loop; when every relay fails the result is
    /// [`VidPackError::FetchUnreachable`].
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let target = url.trim();
        if target.is_empty() {
            return Err(VidPackError::validation("URL must not be empty"));
        }

        for (index, relay) in self.relays.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(VidPackError::Cancelled {
                    partial: String::new(),
                });
            }

            let request_url = relay.render(target);
            debug!(attempt = index + 1, relay = %relay.as_str(), "trying relay");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(VidPackError::Cancelled { partial: String::new() });
                }
                outcome = fetch_once(&self.client, &request_url) => outcome,
            };

            match outcome {
                Ok(body) => {
                    info!(attempt = index + 1, bytes = body.len(), "document fetched");
                    return Ok(body);
                }
                Err(reason) => {
                    warn!(attempt = index + 1, relay = %relay.as_str(), %reason, "relay failed, trying next");
                }
            }
        }

        Err(VidPackError::FetchUnreachable {
            url: target.to_string(),
            attempts: self.relays.len(),
        })
    }
}

/// Perform a single relay request. The error is a human-readable reason that
/// only ever ends up in logs.
async fn fetch_once(client: &Client, request_url: &str) -> std::result::Result<String, String> {
    let response = client
        .get(request_url)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }

    response
        .text()
        .await
        .map_err(|e| format!("failed to read body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TARGET: &str = "https://blog.example.com/posts/rust?ref=feed";

    fn fetcher_for(relays: Vec<String>) -> SourceFetcher {
        let opts = FetchOptions {
            relays: relays.into_iter().map(RelayTemplate::new).collect(),
            timeout_secs: 5,
        };
        SourceFetcher::new(&opts).unwrap()
    }

    #[test]
    fn render_encodes_target() {
        let relay = RelayTemplate::new("https://relay.example/raw?url={url}");
        assert_eq!(
            relay.render(TARGET),
            "https://relay.example/raw?url=https%3A%2F%2Fblog.example.com%2Fposts%2Frust%3Fref%3Dfeed"
        );
    }

    #[test]
    fn render_raw_target() {
        let relay = RelayTemplate::new("https://relay.example/{raw_url}");
        assert_eq!(relay.render(TARGET), format!("https://relay.example/{TARGET}"));
    }

    #[test]
    fn default_options_use_three_relays() {
        let opts = FetchOptions::default();
        assert_eq!(opts.relays.len(), 3);
        assert!(opts.relays[0].as_str().contains("allorigins"));
        assert_eq!(opts.timeout_secs, 30);
    }

    #[tokio::test]
    async fn falls_through_to_third_relay() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/first"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/second"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/third"))
            .and(query_param("url", TARGET))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>third</html>"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fourth"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>fourth</html>"))
            .expect(0)
            .mount(&server)
            .await;

        let base = server.uri();
        let fetcher = fetcher_for(vec![
            format!("{base}/first?url={{url}}"),
            format!("{base}/second?url={{url}}"),
            format!("{base}/third?url={{url}}"),
            format!("{base}/fourth?url={{url}}"),
        ]);

        let body = fetcher
            .fetch(TARGET, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "<html>third</html>");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn transport_errors_are_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("body"))
            .mount(&server)
            .await;

        // Port 9 (discard) is not listening on the loopback interface.
        let fetcher = fetcher_for(vec![
            "http://127.0.0.1:9/{raw_url}".into(),
            format!("{}/ok?u={{url}}", server.uri()),
        ]);

        let body = fetcher
            .fetch(TARGET, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "body");
    }

    #[tokio::test]
    async fn all_relays_failing_is_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let base = server.uri();
        let fetcher = fetcher_for(vec![
            format!("{base}/a?url={{url}}"),
            format!("{base}/b?url={{url}}"),
        ]);

        let err = fetcher
            .fetch(TARGET, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            VidPackError::FetchUnreachable { url, attempts } => {
                assert_eq!(url, TARGET);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected FetchUnreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_url_is_rejected_without_requests() {
        let server = MockServer::start().await;
        let fetcher = fetcher_for(vec![format!("{}/a?url={{url}}", server.uri())]);

        let err = fetcher
            .fetch("   ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VidPackError::Validation { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let server = MockServer::start().await;
        let fetcher = fetcher_for(vec![format!("{}/a?url={{url}}", server.uri())]);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher.fetch(TARGET, &cancel).await.unwrap_err();
        assert!(matches!(err, VidPackError::Cancelled { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
