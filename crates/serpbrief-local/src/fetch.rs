//! Direct competitor-page fetcher.

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serpbrief_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Never forwarded to third-party hosts, whatever the caller put in `FetchRequest.headers`.
const CREDENTIAL_HEADERS: &[&str] = &["authorization", "cookie", "proxy-authorization"];

#[derive(Debug, Clone)]
pub struct LocalFetcher {
    client: reqwest::Client,
}

impl LocalFetcher {
    /// Client with bounded redirects and a 30s overall ceiling; `FetchRequest.timeout_ms`
    /// tightens it per request.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("serpbrief/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Fetch(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Caller headers minus credentials; names or values that don't parse are skipped.
fn forwardable_headers(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (k, v) in headers {
        let Ok(name) = HeaderName::from_bytes(k.as_bytes()) else {
            continue;
        };
        // HeaderName is lower-case.
        if CREDENTIAL_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(value) = HeaderValue::from_str(v) {
            out.insert(name, value);
        }
    }
    out
}

fn parse_page_url(raw: &str) -> Result<url::Url> {
    let url = url::Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidUrl(format!("unsupported scheme: {other}"))),
    }
}

/// Reads at most `cap` body bytes. Returns the bytes and whether the body was cut.
pub(crate) async fn read_capped(resp: reqwest::Response, cap: usize) -> Result<(Vec<u8>, bool)> {
    let mut body = Vec::new();
    let mut chunks = resp.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| Error::Fetch(format!("body: {e}")))?;
        let room = cap - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

#[async_trait::async_trait]
impl FetchBackend for LocalFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let started = Instant::now();
        let url = parse_page_url(&req.url)?;

        let mut rb = self
            .client
            .get(url)
            .headers(forwardable_headers(&req.headers));
        if let Some(t) = req.timeout() {
            rb = rb.timeout(t);
        }
        let resp = rb
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {e}", req.url)))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let cap = req
            .max_bytes
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let (bytes, truncated) = read_capped(resp, cap).await?;
        if truncated {
            tracing::debug!(url = %req.url, cap, "page body truncated");
        }

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("page_fetch".to_string(), started.elapsed().as_millis());
        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            truncated,
            timings_ms,
        })
    }
}
