use crate::textprep::{dedup_preserve_order, norm_ws};
use serde::Deserialize;
use serpbrief_core::{
    Error, OrganicResult, Result, SearchQuery, SerpProvider, SerpResponse,
};
use std::collections::BTreeMap;
use std::time::Instant;

pub const DEFAULT_ENDPOINT: &str = "https://serpapi.com/search.json";

fn timeout_ms_from_query(q: &SearchQuery, fallback: u64) -> u64 {
    // Provider requests can hang indefinitely without an explicit timeout.
    q.timeout_ms.unwrap_or(fallback).clamp(1_000, 60_000)
}

/// Explicit SerpApi settings. The caller decides where the key comes from.
#[derive(Debug, Clone)]
pub struct SerpApiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub engine: String,
    pub timeout_ms: u64,
}

impl SerpApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            engine: "google".to_string(),
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SerpApiProvider {
    client: reqwest::Client,
    config: SerpApiConfig,
}

impl SerpApiProvider {
    pub fn new(client: reqwest::Client, config: SerpApiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::NotConfigured("missing SerpApi api key".to_string()));
        }
        if config.endpoint.trim().is_empty() {
            return Err(Error::NotConfigured("missing SerpApi endpoint".to_string()));
        }
        Ok(Self { client, config })
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    error: Option<String>,
    organic_results: Option<Vec<SerpApiOrganic>>,
    related_questions: Option<Vec<SerpApiQuestion>>,
    related_searches: Option<Vec<SerpApiRelated>>,
}

#[derive(Debug, Deserialize)]
struct SerpApiOrganic {
    position: Option<u32>,
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpApiQuestion {
    question: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpApiRelated {
    query: Option<String>,
    title: Option<String>,
}

fn clean_list(items: impl Iterator<Item = Option<String>>) -> Vec<String> {
    dedup_preserve_order(
        items
            .flatten()
            .map(|s| norm_ws(&s))
            .filter(|s| !s.is_empty()),
    )
}

fn into_serp(parsed: SerpApiResponse) -> Result<SerpResponse> {
    if let Some(err) = parsed.error.filter(|e| !e.trim().is_empty()) {
        return Err(Error::Search(format!("serpapi: {err}")));
    }

    let mut organic = Vec::new();
    for r in parsed.organic_results.unwrap_or_default() {
        let Some(link) = r.link.filter(|l| !l.trim().is_empty()) else {
            continue;
        };
        organic.push(OrganicResult {
            position: r.position,
            title: r.title.map(|t| norm_ws(&t)).unwrap_or_default(),
            link,
            snippet: r.snippet.map(|s| norm_ws(&s)).filter(|s| !s.is_empty()),
        });
    }

    let paa = clean_list(
        parsed
            .related_questions
            .unwrap_or_default()
            .into_iter()
            .map(|q| q.question),
    );
    let pasf = clean_list(
        parsed
            .related_searches
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.query.or(r.title)),
    );

    Ok(SerpResponse {
        organic,
        paa,
        pasf,
        provider: "serpapi".to_string(),
        timings_ms: BTreeMap::new(),
    })
}

/// Normalize a raw SerpApi JSON document (e.g. a saved response).
pub fn parse_serpapi_json(value: serde_json::Value) -> Result<SerpResponse> {
    let parsed: SerpApiResponse =
        serde_json::from_value(value).map_err(|e| Error::Search(e.to_string()))?;
    into_serp(parsed)
}

#[async_trait::async_trait]
impl SerpProvider for SerpApiProvider {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SerpResponse> {
        let t0 = Instant::now();
        let timeout_ms = timeout_ms_from_query(q, self.config.timeout_ms);

        let mut req = self.client.get(&self.config.endpoint).query(&[
            ("q", q.query.as_str()),
            ("engine", self.config.engine.as_str()),
            ("api_key", self.config.api_key.as_str()),
        ]);
        if let Some(n) = q.max_results {
            req = req.query(&[("num", n.to_string())]);
        }
        if let Some(lang) = q.language.as_deref() {
            req = req.query(&[("hl", lang)]);
        }
        if let Some(country) = q.country.as_deref() {
            req = req.query(&[("gl", country)]);
        }

        let resp = req
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("serpapi search HTTP {status}")));
        }

        let parsed: SerpApiResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let mut out = into_serp(parsed)?;
        if let Some(n) = q.max_results {
            out.organic.truncate(n);
        }
        out.timings_ms
            .insert("search".to_string(), t0.elapsed().as_millis());
        tracing::debug!(
            query = %q.query,
            organic = out.organic.len(),
            paa = out.paa.len(),
            pasf = out.pasf.len(),
            "serpapi search done"
        );
        Ok(out)
    }
}
