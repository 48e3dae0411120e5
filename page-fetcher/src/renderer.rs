//! Chrome DevTools Protocol (CDP) renderer
//!
//! Talks to a headless Chromium instance over its debug port. Each page
//! render opens a fresh target, waits for scripts to settle, pulls the
//! live DOM over the target's WebSocket with `Runtime.evaluate`, and
//! closes the target again.

use site_archiver_core::*;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(5);
const EVALUATE_COMMAND_ID: u64 = 1;

/// CDP target information returned by the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpTarget {
    pub id: String,
    #[serde(rename = "type")]
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub web_socket_debugger_url: Option<String>,
}

/// CDP browser version information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,
    #[serde(rename = "User-Agent")]
    pub user_agent: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: Option<String>,
}

/// CDP command message sent over the target WebSocket
#[derive(Debug, Serialize)]
struct CdpCommand {
    id: u64,
    method: String,
    params: serde_json::Value,
}

/// CDP response message
#[derive(Debug, Deserialize)]
struct CdpResponse {
    id: Option<u64>,
    result: Option<serde_json::Value>,
    error: Option<CdpError>,
}

/// CDP error information
#[derive(Debug, Deserialize)]
struct CdpError {
    code: i64,
    message: String,
}

/// Renderer backed by a Chromium debug endpoint
#[derive(Debug)]
pub struct CdpRenderer {
    debug_port: u16,
    client: reqwest::Client,
    settle_delay: Duration,
}

impl CdpRenderer {
    /// Connect to the browser's debug endpoint and verify it responds
    ///
    /// Fails with `RendererUnavailable` when nothing is listening; the
    /// caller decides whether that downgrades the whole job to raw HTTP.
    pub async fn connect(debug_port: u16, settle_delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(ENDPOINT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::RendererUnavailable {
                details: format!("failed to build HTTP client: {}", e),
            })?;

        let url = format!("http://localhost:{}/json/version", debug_port);
        let response = client.get(&url).send().await.map_err(|e| {
            FetchError::RendererUnavailable {
                details: format!("no browser on port {}: {}", debug_port, e),
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::RendererUnavailable {
                details: format!("debug endpoint returned {}", response.status()),
            }
            .into());
        }

        let version: CdpVersion = response.json().await.map_err(|e| {
            FetchError::RendererUnavailable {
                details: format!("invalid version response: {}", e),
            }
        })?;

        tracing::info!(
            "Connected to rendering engine on port {}: {}",
            debug_port,
            version.browser
        );

        Ok(Self {
            debug_port,
            client,
            settle_delay,
        })
    }

    /// Render one page and return its post-script DOM as HTML
    pub async fn render_page(&self, url: &str) -> Result<String> {
        let target = self.open_target(url).await?;

        // Give scripts a moment to run before reading the DOM
        tokio::time::sleep(self.settle_delay).await;

        let html = self.evaluate_outer_html(url, &target).await;

        // Close the target regardless; leaked tabs pile up across a crawl
        self.close_target(&target.id).await;

        html
    }

    /// Release the renderer at the end of a job
    pub async fn shutdown(&self) {
        tracing::info!("Releasing rendering engine on port {}", self.debug_port);
    }

    /// Open a new browser target navigated to the given URL
    async fn open_target(&self, url: &str) -> Result<CdpTarget> {
        let encoded_url = urlencoding::encode(url);
        let api_url = format!(
            "http://localhost:{}/json/new?{}",
            self.debug_port, encoded_url
        );

        // Chromium 111+ requires PUT for /json/new
        let response = self.client.put(&api_url).send().await.map_err(|e| {
            FetchError::RequestFailed {
                url: url.to_string(),
                details: format!("failed to open render target: {}", e),
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::RequestFailed {
                url: url.to_string(),
                details: format!("render target request returned {}", response.status()),
            }
            .into());
        }

        response.json().await.map_err(|e| {
            FetchError::InvalidRenderResponse {
                url: url.to_string(),
                details: format!("invalid target response: {}", e),
            }
            .into()
        })
    }

    /// Pull `document.documentElement.outerHTML` over the target WebSocket
    async fn evaluate_outer_html(&self, url: &str, target: &CdpTarget) -> Result<String> {
        let ws_url = target.web_socket_debugger_url.as_deref().ok_or_else(|| {
            FetchError::InvalidRenderResponse {
                url: url.to_string(),
                details: "target has no WebSocket debugger URL".to_string(),
            }
        })?;

        let (mut ws, _) = connect_async(ws_url).await.map_err(|e| {
            FetchError::RequestFailed {
                url: url.to_string(),
                details: format!("WebSocket connection failed: {}", e),
            }
        })?;

        let command = CdpCommand {
            id: EVALUATE_COMMAND_ID,
            method: "Runtime.evaluate".to_string(),
            params: serde_json::json!({
                "expression": "document.documentElement.outerHTML",
                "returnByValue": true,
            }),
        };
        let payload = serde_json::to_string(&command).map_err(|e| {
            FetchError::RequestFailed {
                url: url.to_string(),
                details: format!("failed to encode evaluate command: {}", e),
            }
        })?;

        ws.send(Message::Text(payload)).await.map_err(|e| {
            FetchError::RequestFailed {
                url: url.to_string(),
                details: format!("WebSocket send failed: {}", e),
            }
        })?;

        let html = self.read_evaluate_result(url, &mut ws).await;
        let _ = ws.close(None).await;
        html
    }

    async fn read_evaluate_result(
        &self,
        url: &str,
        ws: &mut (impl StreamExt<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
    ) -> Result<String> {
        while let Some(message) = ws.next().await {
            let message = message.map_err(|e| FetchError::RequestFailed {
                url: url.to_string(),
                details: format!("WebSocket read failed: {}", e),
            })?;

            let text = match message {
                Message::Text(text) => text,
                // Protocol events and pings arrive interleaved; skip them
                _ => continue,
            };

            let response: CdpResponse = match serde_json::from_str(&text) {
                Ok(response) => response,
                Err(_) => continue,
            };

            if response.id != Some(EVALUATE_COMMAND_ID) {
                continue;
            }

            if let Some(error) = response.error {
                return Err(FetchError::InvalidRenderResponse {
                    url: url.to_string(),
                    details: format!("CDP error {}: {}", error.code, error.message),
                }
                .into());
            }

            let value = response
                .result
                .as_ref()
                .and_then(|r| r.get("result"))
                .and_then(|r| r.get("value"))
                .and_then(|v| v.as_str());

            return match value {
                Some(html) => Ok(html.to_string()),
                None => Err(FetchError::InvalidRenderResponse {
                    url: url.to_string(),
                    details: "evaluate result carried no string value".to_string(),
                }
                .into()),
            };
        }

        Err(FetchError::InvalidRenderResponse {
            url: url.to_string(),
            details: "WebSocket closed before the evaluate response".to_string(),
        }
        .into())
    }

    /// Close a target; failure only leaks a tab, so log and move on
    async fn close_target(&self, target_id: &str) {
        let url = format!(
            "http://localhost:{}/json/close/{}",
            self.debug_port, target_id
        );
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    "Failed to close render target {}: {}",
                    target_id,
                    response.status()
                );
            }
            Err(e) => {
                tracing::warn!("Failed to close render target {}: {}", target_id, e);
            }
        }
    }
}
