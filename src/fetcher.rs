// =============================================================================
// fetcher.rs - THE PAGE FETCHER
// =============================================================================
//
// Turns a page identifier into raw markup. One GET per card, no retries, no
// parallelism. If the site says no, we say so too: the walker gets a
// FetchError and decides whether that ends the crawl.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;
use crate::models::PageId;

/// Anything that can hand over a page's markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, id: &PageId) -> Result<String, FetchError>;
}

/// Build the one HTTP client the whole run shares.
pub fn build_client(timeout: Duration, user_agent: &str) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
}

/// Fetches cardlist pages over HTTP, relative to the site base.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;

        debug!(url = %url, bytes = body.len(), "Page fetched");
        Ok(body)
    }
}

#[async_trait]
impl PageSource for HttpPageFetcher {
    async fn fetch(&self, id: &PageId) -> Result<String, FetchError> {
        let url = id
            .resolve(&self.base_url)
            .map_err(|source| FetchError::Address { id: id.to_string(), source })?;

        self.get(&url).await.inspect_err(|e| {
            warn!(
                page = %id,
                error = %e,
                "Page fetch failed - the cardlist is not in a sharing mood"
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, loopback_client as client, serve_once, Canned};

    #[test]
    fn test_client_builds_with_configured_agent() {
        assert!(build_client(Duration::from_secs(30), "WsCardlistCrawler/0.1").is_ok());
    }

    #[tokio::test]
    async fn test_fetch_returns_page_markup() {
        let base = serve_once(Canned {
            status: "200 OK",
            content_type: "text/html; charset=utf-8",
            body: fixtures::first_card_page().into_bytes(),
        })
        .await;
        let fetcher = HttpPageFetcher::new(client(), base);

        let markup = fetcher.fetch(&PageId::new(".?cardno=TSK/S70-E001")).await.unwrap();
        assert_eq!(markup, fixtures::first_card_page());
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_status_error() {
        let base = serve_once(Canned {
            status: "404 Not Found",
            content_type: "text/html",
            body: b"<h1>no such card</h1>".to_vec(),
        })
        .await;
        let fetcher = HttpPageFetcher::new(client(), base);

        let err = fetcher.fetch(&PageId::new(".?cardno=NOPE/X00-E999")).await.unwrap_err();
        match err {
            FetchError::Status { url, status } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/cardlist/list/?cardno=NOPE/X00-E999"), "{url}");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }
}
