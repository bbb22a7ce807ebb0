//! Keyword → SERP → competitor headings → themes + intent → brief.
//!
//! Error policy:
//! - the SERP lookup is fatal for the run (no retries)
//! - each competitor page is isolated: at most one fallback attempt through the markdown
//!   proxy, then the page contributes an empty heading list

use crate::brief::{assemble_brief, BriefExport, BriefInputs, BriefOptions, MetaStyle, OutlineStyle};
use crate::cluster::{cluster_with, ClusterStrategy, DEFAULT_THRESHOLD};
use crate::extract::extract_from_body;
use crate::insights::build_insights;
use crate::intent::classify_intent;
use crate::proxy::MarkdownProxyClient;
use serde::Serialize;
use serpbrief_core::{
    Error, FetchBackend, FetchRequest, Heading, PageHeadings, Result, SearchQuery, SerpProvider,
    SerpResponse,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BriefConfig {
    /// Organic results requested from the provider.
    pub serp_results: usize,
    /// Top-ranked organic results whose pages are fetched.
    pub max_competitors: usize,
    pub threshold: f64,
    pub strategy: ClusterStrategy,
    pub outline: OutlineStyle,
    pub meta: MetaStyle,
    pub fetch_timeout_ms: u64,
    pub max_bytes: u64,
    /// Also try the proxy when a direct fetch succeeds but yields no headings.
    pub fallback_on_empty: bool,
    /// When false, competitor pages are not fetched at all.
    pub fetch_pages: bool,
    pub language: Option<String>,
    pub country: Option<String>,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            serp_results: 10,
            max_competitors: 5,
            threshold: DEFAULT_THRESHOLD,
            strategy: ClusterStrategy::FirstMatch,
            outline: OutlineStyle::Clustered,
            meta: MetaStyle::Basic,
            fetch_timeout_ms: 15_000,
            max_bytes: 5_000_000,
            fallback_on_empty: true,
            fetch_pages: true,
            language: None,
            country: None,
        }
    }
}

impl BriefConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "similarity threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    Direct,
    Proxy,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub url: String,
    pub source: PageSource,
    pub heading_count: usize,
    /// Body was cut at `max_bytes`; headings past the cut are missing.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BriefRun {
    pub export: BriefExport,
    pub pages: Vec<PageReport>,
}

pub struct BriefPipeline {
    provider: Arc<dyn SerpProvider>,
    fetcher: Arc<dyn FetchBackend>,
    proxy: Option<MarkdownProxyClient>,
    config: BriefConfig,
}

impl BriefPipeline {
    pub fn new(
        provider: Arc<dyn SerpProvider>,
        fetcher: Arc<dyn FetchBackend>,
        proxy: Option<MarkdownProxyClient>,
        config: BriefConfig,
    ) -> Result<Self> {
        config.validate()?;
        // The fallback reads under the same per-page byte cap as the direct fetch.
        let proxy = proxy.map(|p| p.with_max_bytes(config.max_bytes));
        Ok(Self {
            provider,
            fetcher,
            proxy,
            config,
        })
    }

    pub fn config(&self) -> &BriefConfig {
        &self.config
    }

    /// Full run: SERP lookup, then [`Self::run_with_serp`].
    pub async fn run(&self, keyword: &str) -> Result<BriefRun> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::InvalidInput("keyword is empty".to_string()));
        }
        let q = SearchQuery {
            query: keyword.to_string(),
            max_results: Some(self.config.serp_results),
            language: self.config.language.clone(),
            country: self.config.country.clone(),
            timeout_ms: None,
        };
        tracing::info!(provider = self.provider.name(), keyword, "searching");
        let serp = self.provider.search(&q).await?;
        self.run_with_serp(keyword, serp).await
    }

    /// Build a brief from an already-normalized SERP.
    pub async fn run_with_serp(&self, keyword: &str, serp: SerpResponse) -> Result<BriefRun> {
        let keyword = keyword.trim();
        let urls: Vec<String> = if self.config.fetch_pages {
            serp.organic
                .iter()
                .take(self.config.max_competitors)
                .map(|r| r.link.clone())
                .collect()
        } else {
            Vec::new()
        };

        // join_all keeps rank order regardless of completion order.
        let outcomes =
            futures_util::future::join_all(urls.iter().map(|u| self.fetch_page(u))).await;
        let mut competitors = Vec::with_capacity(outcomes.len());
        let mut pages = Vec::with_capacity(outcomes.len());
        for (page, report) in outcomes {
            competitors.push(page);
            pages.push(report);
        }

        let pooled: Vec<&str> = competitors
            .iter()
            .flat_map(|p| p.headings.iter().map(|h| h.text.as_str()))
            .collect();
        let themes: Vec<String> = cluster_with(&pooled, self.config.threshold, self.config.strategy)
            .into_iter()
            .map(|c| c.representative)
            .collect();

        let mut snippets: Vec<&str> = vec![keyword];
        for r in &serp.organic {
            snippets.push(r.title.as_str());
            if let Some(s) = r.snippet.as_deref() {
                snippets.push(s);
            }
        }
        snippets.extend(serp.paa.iter().map(String::as_str));
        snippets.extend(serp.pasf.iter().map(String::as_str));
        let intent = classify_intent(&snippets);
        tracing::info!(
            label = %intent.label,
            themes = themes.len(),
            pages = competitors.len(),
            "classified"
        );

        let inputs = BriefInputs {
            keyword: keyword.to_string(),
            intent: Some(intent.label),
            competitors: competitors.clone(),
            themes,
            paa: serp.paa.clone(),
            pasf: serp.pasf.clone(),
        };
        let options = BriefOptions {
            outline: self.config.outline,
            meta: self.config.meta,
            ..Default::default()
        };
        let brief = assemble_brief(&inputs, &options);
        let insights = build_insights(keyword, &serp.organic, &competitors);

        Ok(BriefRun {
            export: BriefExport {
                keyword: keyword.to_string(),
                intent,
                paa: serp.paa,
                pasf: serp.pasf,
                competitor_headings: competitors,
                brief,
                insights: Some(insights),
            },
            pages,
        })
    }

    async fn fetch_page(&self, url: &str) -> (PageHeadings, PageReport) {
        let req = FetchRequest {
            url: url.to_string(),
            timeout_ms: Some(self.config.fetch_timeout_ms),
            max_bytes: Some(self.config.max_bytes),
            headers: Default::default(),
        };

        let direct_err = match self.fetcher.fetch(&req).await {
            Ok(resp) if resp.is_success() => {
                let headings = extract_from_body(&resp.bytes, resp.content_type.as_deref(), url);
                if !headings.is_empty() || !self.config.fallback_on_empty {
                    return done(url, PageSource::Direct, headings, resp.truncated, None);
                }
                "no headings in direct fetch".to_string()
            }
            Ok(resp) => format!("HTTP {}", resp.status),
            Err(e) => e.to_string(),
        };

        let Some(proxy) = self.proxy.as_ref() else {
            tracing::warn!(url, error = %direct_err, "page skipped");
            return done(url, PageSource::Failed, Vec::new(), false, Some(direct_err));
        };

        tracing::debug!(url, error = %direct_err, "trying markdown proxy");
        match proxy.fetch_markdown(url).await {
            Ok(r) => {
                let headings = extract_from_body(r.markdown.as_bytes(), Some("text/markdown"), url);
                done(url, PageSource::Proxy, headings, r.truncated, None)
            }
            Err(e) => {
                let error = format!("{direct_err}; proxy: {e}");
                tracing::warn!(url, error = %error, "page skipped");
                done(url, PageSource::Failed, Vec::new(), false, Some(error))
            }
        }
    }
}

fn done(
    url: &str,
    source: PageSource,
    headings: Vec<Heading>,
    truncated: bool,
    error: Option<String>,
) -> (PageHeadings, PageReport) {
    let report = PageReport {
        url: url.to_string(),
        source,
        heading_count: headings.len(),
        truncated,
        error,
    };
    (
        PageHeadings {
            source_url: url.to_string(),
            headings,
        },
        report,
    )
}
