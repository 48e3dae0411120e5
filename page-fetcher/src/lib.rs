//! Page fetching for the site archiver
//!
//! Two ways to get a page: rendered through a headless browser's debug
//! port, or raw over plain HTTP. The choice is made once per job when
//! the engine starts; a missing browser downgrades the whole job to raw
//! HTTP rather than failing it. Individual rendered fetches that keep
//! failing also drop to raw HTTP for that page. Assets always go over
//! plain HTTP.

pub mod http;
pub mod renderer;
pub mod retry;
pub mod traits;

pub use http::HttpFetcher;
pub use renderer::CdpRenderer;
pub use retry::RetryPolicy;
pub use traits::Fetcher;

use site_archiver_core::*;
use async_trait::async_trait;
use std::time::Duration;

/// Tunables for the fetch engine
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Debug port of the rendering browser
    pub debug_port: u16,
    /// Hard ceiling on any single fetch attempt
    pub page_timeout: Duration,
    /// How long to let page scripts run before reading the DOM
    pub settle_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            page_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

/// Fetcher combining the rendered and raw HTTP paths
pub struct FetchEngine {
    renderer: Option<CdpRenderer>,
    http: HttpFetcher,
    config: FetcherConfig,
}

impl FetchEngine {
    /// Probe the rendering engine once and fix the strategy for the job
    pub async fn start(config: FetcherConfig) -> Result<Self> {
        let http = HttpFetcher::new(config.page_timeout)?;

        let renderer = match CdpRenderer::connect(config.debug_port, config.settle_delay).await {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                tracing::warn!("Rendering engine unavailable, using raw HTTP for this job: {}", e);
                None
            }
        };

        Ok(Self {
            renderer,
            http,
            config,
        })
    }

    /// Whether pages will be rendered rather than fetched raw
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Release the renderer at the end of a job
    pub async fn shutdown(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.shutdown().await;
        }
    }

    async fn with_timeout<T>(
        &self,
        url: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.page_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.config.page_timeout.as_secs(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl Fetcher for FetchEngine {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        if let Some(renderer) = &self.renderer {
            let rendered = self
                .config
                .retry
                .run(url, || self.with_timeout(url, renderer.render_page(url)))
                .await;

            match rendered {
                Ok(html) => return Ok(html),
                Err(e) => {
                    tracing::warn!("Rendered fetch failed for {}, dropping to raw HTTP: {}", url, e);
                }
            }
        }

        self.config
            .retry
            .run(url, || self.with_timeout(url, self.http.get_text(url)))
            .await
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
        self.config
            .retry
            .run(url, || self.with_timeout(url, self.http.get_bytes(url)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_without_browser_downgrades_instead_of_failing() {
        let config = FetcherConfig {
            debug_port: 1, // nothing listens here
            ..Default::default()
        };
        let engine = FetchEngine::start(config).await.unwrap();
        assert!(!engine.has_renderer());
    }
}
