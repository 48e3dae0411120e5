//! Asset discovery, download, and reference rewriting
//!
//! Discovery is a synchronous read-only pass over the parsed document
//! (scraper); downloads fan out concurrently per page; rewriting is a
//! streaming pass (lol_html) that touches only attributes whose asset
//! was actually captured. Cross-host references and failed downloads
//! stay byte-identical in the output.

use crate::paths;
use site_archiver_core::*;
use archive_store::JobStore;
use futures::stream::{self, StreamExt};
use lol_html::{element, HtmlRewriter, Settings};
use page_fetcher::Fetcher;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;

/// How many asset downloads may run at once for a single page
const ASSET_FANOUT: usize = 8;

/// Attribute-bearing selectors that reference downloadable assets
const ASSET_SELECTORS: &[(&str, &str)] = &[
    ("img[src]", "src"),
    (r#"link[rel="stylesheet"][href]"#, "href"),
    ("script[src]", "src"),
];

/// One same-host asset reference found in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Attribute value exactly as written in the page
    pub raw: String,
    /// Absolute URL after resolution against the page
    pub resolved: Url,
    /// Derived path under the job directory
    pub local_path: String,
}

/// Everything a synchronous discovery pass extracts from one page
#[derive(Debug, Default)]
pub struct PageDiscovery {
    pub assets: Vec<AssetRef>,
    pub links: Vec<String>,
}

/// A page after asset capture and reference rewriting
#[derive(Debug)]
pub struct ProcessedPage {
    pub html: String,
    /// Absolute http(s) link targets, in discovery order
    pub links: Vec<String>,
}

/// Extract asset references and outbound links from raw HTML
///
/// Synchronous on purpose: the parsed document is not `Send`, so it
/// must never be held across an await point.
pub fn discover(html: &str, page_url: &Url) -> PageDiscovery {
    let document = Html::parse_document(html);
    let mut discovery = PageDiscovery::default();
    let mut seen_raw: HashSet<String> = HashSet::new();

    for (selector_str, attr) in ASSET_SELECTORS {
        let selector = match Selector::parse(selector_str) {
            Ok(selector) => selector,
            Err(_) => continue,
        };
        for element in document.select(&selector) {
            let raw = match element.value().attr(attr) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => continue,
            };
            let resolved = match page_url.join(&raw) {
                Ok(resolved) => resolved,
                Err(_) => continue,
            };
            // Different host: leave the reference alone entirely
            if resolved.host_str() != page_url.host_str() {
                continue;
            }
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            if !seen_raw.insert(raw.clone()) {
                continue;
            }
            let local_path = paths::asset_local_path(&resolved);
            discovery.assets.push(AssetRef {
                raw,
                resolved,
                local_path,
            });
        }
    }

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            let href = match element.value().attr("href") {
                Some(value) => value.trim(),
                None => continue,
            };
            if href.is_empty()
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("javascript:")
            {
                continue;
            }
            let resolved = match page_url.join(href) {
                Ok(resolved) => resolved,
                Err(_) => continue,
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            discovery.links.push(resolved.to_string());
        }
    }

    discovery
}

/// Downloads same-host assets and rewrites their references
pub struct AssetPipeline {
    store: Arc<dyn JobStore>,
}

impl AssetPipeline {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Capture a page's assets and return its rewritten HTML and links
    ///
    /// `populated` is the per-job dedup set of local paths that already
    /// hold content; the same derived path is never downloaded twice in
    /// one job (path identity is content identity). A failed download
    /// leaves its reference untouched and never fails the page.
    pub async fn process_page(
        &self,
        fetcher: &dyn Fetcher,
        job_id: Uuid,
        page_url: &Url,
        html: &str,
        populated: &mut HashSet<String>,
    ) -> Result<ProcessedPage> {
        let discovery = discover(html, page_url);

        let mut rewrites: HashMap<String, String> = HashMap::new();
        let mut to_download: Vec<AssetRef> = Vec::new();
        let mut claimed: HashSet<String> = HashSet::new();

        for asset in discovery.assets {
            if populated.contains(&asset.local_path) {
                // Already captured earlier in this job; rewrite only
                rewrites.insert(asset.raw.clone(), asset.local_path.clone());
            } else if claimed.insert(asset.local_path.clone()) {
                to_download.push(asset);
            } else {
                // Two raw references on this page resolve to one path;
                // the first download covers both
                rewrites.insert(asset.raw.clone(), asset.local_path.clone());
            }
        }

        let results: Vec<(AssetRef, Result<()>)> = stream::iter(to_download)
            .map(|asset| async move {
                let outcome = self.capture_asset(fetcher, job_id, &asset).await;
                (asset, outcome)
            })
            .buffer_unordered(ASSET_FANOUT)
            .collect()
            .await;

        for (asset, outcome) in results {
            match outcome {
                Ok(()) => {
                    populated.insert(asset.local_path.clone());
                    rewrites.insert(asset.raw, asset.local_path);
                }
                Err(e) => {
                    tracing::warn!("Skipping asset {}: {}", asset.resolved, e);
                }
            }
        }

        // Drop rewrites whose path never got populated (first reference
        // failed but a duplicate pointed at the same path)
        rewrites.retain(|_, path| populated.contains(path));

        let html = rewrite_references(html, &rewrites)?;
        Ok(ProcessedPage {
            html,
            links: discovery.links,
        })
    }

    async fn capture_asset(
        &self,
        fetcher: &dyn Fetcher,
        job_id: Uuid,
        asset: &AssetRef,
    ) -> Result<()> {
        let bytes = fetcher.fetch_asset(asset.resolved.as_str()).await?;
        self.store
            .save_asset(job_id, &asset.local_path, &bytes, asset.resolved.as_str())
            .await?;
        tracing::debug!("Captured asset {} -> {}", asset.resolved, asset.local_path);
        Ok(())
    }
}

/// Rewrite captured asset references to their local paths
///
/// Attributes whose value is not a key in `rewrites` pass through
/// byte-identical.
fn rewrite_references(html: &str, rewrites: &HashMap<String, String>) -> Result<String> {
    if rewrites.is_empty() {
        return Ok(html.to_string());
    }

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        if let Some(local) = rewrites.get(&src) {
                            el.set_attribute("src", local)?;
                        }
                    }
                    Ok(())
                }),
                element!(r#"link[rel="stylesheet"][href]"#, |el| {
                    if let Some(href) = el.get_attribute("href") {
                        if let Some(local) = rewrites.get(&href) {
                            el.set_attribute("href", local)?;
                        }
                    }
                    Ok(())
                }),
                element!("script[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        if let Some(local) = rewrites.get(&src) {
                            el.set_attribute("src", local)?;
                        }
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| CrawlError::Orchestration {
            details: format!("HTML rewrite failed: {}", e),
        })?;
    rewriter.end().map_err(|e| CrawlError::Orchestration {
        details: format!("HTML rewrite failed: {}", e),
    })?;

    String::from_utf8(output).map_err(|e| {
        CrawlError::Orchestration {
            details: format!("rewritten HTML is not UTF-8: {}", e),
        }
        .into()
    })
}
