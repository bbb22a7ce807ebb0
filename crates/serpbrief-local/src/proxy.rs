//! Fallback transport: a text-rendering proxy that returns a page as Markdown.
//!
//! Used once per page when a direct fetch fails or yields no headings. The proxy is
//! addressed by prefixing the target URL, e.g. `https://r.jina.ai/https://example.com/`.

use crate::fetch::read_capped;
use serpbrief_core::{Error, Result};

pub const DEFAULT_PROXY_PREFIX: &str = "https://r.jina.ai/";

#[derive(Debug, Clone)]
pub struct MarkdownProxyConfig {
    pub endpoint_prefix: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    /// Cap on Markdown body bytes, same meaning as `FetchRequest.max_bytes`.
    pub max_bytes: u64,
}

impl Default for MarkdownProxyConfig {
    fn default() -> Self {
        Self {
            endpoint_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            api_key: None,
            timeout_ms: 20_000,
            max_bytes: 5_000_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarkdownProxyClient {
    client: reqwest::Client,
    config: MarkdownProxyConfig,
}

#[derive(Debug, Clone)]
pub struct ProxyFetchResult {
    pub markdown: String,
    pub truncated: bool,
}

impl MarkdownProxyClient {
    pub fn new(client: reqwest::Client, config: MarkdownProxyConfig) -> Result<Self> {
        if config.endpoint_prefix.trim().is_empty() {
            return Err(Error::NotConfigured(
                "missing markdown proxy endpoint".to_string(),
            ));
        }
        Ok(Self { client, config })
    }

    /// Replace the body cap, e.g. with the pipeline's per-page `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.config.max_bytes = max_bytes;
        self
    }

    fn target_for(&self, url: &str) -> String {
        format!("{}{}", self.config.endpoint_prefix.trim(), url)
    }

    pub async fn fetch_markdown(&self, url: &str) -> Result<ProxyFetchResult> {
        url::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut rb = self
            .client
            .get(self.target_for(url))
            .header(reqwest::header::ACCEPT, "text/plain, text/markdown;q=0.9, */*;q=0.1")
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"));
        }

        let resp = rb.send().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("markdown proxy HTTP {status}")));
        }
        let cap = usize::try_from(self.config.max_bytes).unwrap_or(usize::MAX);
        let (bytes, truncated) = read_capped(resp, cap).await?;
        if truncated {
            tracing::debug!(url, cap, "markdown proxy body truncated");
        }

        Ok(ProxyFetchResult {
            markdown: String::from_utf8_lossy(&bytes).into_owned(),
            truncated,
        })
    }
}
