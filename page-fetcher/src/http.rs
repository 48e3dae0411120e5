//! Raw HTTP fetcher
//!
//! The fallback path when no rendering engine is reachable. A plain
//! reqwest client with a browser user agent, redirect following, and a
//! hard per-request timeout.

use site_archiver_core::*;
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

/// HTTP client wrapper for page and asset downloads
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::RequestFailed {
                url: String::new(),
                details: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// GET a URL and return the response body as text
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url).await?;
        response
            .text()
            .await
            .map_err(|e| self.classify(url, e).into())
    }

    /// GET a URL and return the response body as raw bytes
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        // Non-2xx counts as a failed attempt, same as a transport error
        response
            .error_for_status()
            .map_err(|e| self.classify(url, e).into())
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            FetchError::RequestFailed {
                url: url.to_string(),
                details: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(HttpFetcher::new(Duration::from_secs(30)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_failed() {
        // Port 1 on loopback refuses connections without touching the network
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let result = fetcher.get_text("http://127.0.0.1:1/").await;
        match result {
            Err(SiteArchiverError::Fetch {
                source: FetchError::RequestFailed { url, .. },
            }) => assert_eq!(url, "http://127.0.0.1:1/"),
            other => panic!("expected RequestFailed, got {:?}", other),
        }
    }
}
