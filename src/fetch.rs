//! Page fetching for the review pipeline
//!
//! A fetch is a single HTTP GET that returns the response body as text. The
//! status code is never inspected: an error page comes back like any other
//! page and simply fails to match the structural selectors later on. Every
//! transport problem (connect, DNS, TLS, timeout, body decoding) collapses into
//! [`FetchError::Transport`], which callers treat as an empty page.

use std::future::Future;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use thiserror::Error;
use tracing::{debug, instrument};

/// Default deadline for a single page fetch in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Error type for page fetches
#[derive(Debug, Error)]
pub enum FetchError {
    /// The page could not be retrieved
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Something that can turn a URL into raw markup
pub trait PageFetcher: Send + Sync + 'static {
    /// Fetch `url` and return the response body
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// [`PageFetcher`] backed by a reqwest client with a request deadline
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: ReqwestClient,
}

impl HttpFetcher {
    /// Create a fetcher with the given user agent and per-request timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        debug!(status = %response.status(), "Received response");

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("review-aggregator-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<html><body>hello</body></html>")
            .expect(1)
            .create_async()
            .await;

        let body = fetcher()
            .fetch(&format!("{}/page", server.url()))
            .await
            .unwrap();
        assert_eq!(body, "<html><body>hello</body></html>");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_ignores_status_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not here")
            .create_async()
            .await;

        let body = fetcher()
            .fetch(&format!("{}/missing", server.url()))
            .await
            .unwrap();
        assert_eq!(body, "not here");
    }

    #[tokio::test]
    async fn test_fetch_transport_failure() {
        let result = fetcher().fetch("http://127.0.0.1:1/unreachable").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_is_transport_failure() {
        let result = fetcher().fetch("not a url").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
