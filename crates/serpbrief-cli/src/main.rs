use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serpbrief_core::{
    FetchBackend, FetchRequest, Heading, PageHeadings, SearchQuery, SerpProvider, SerpResponse,
};
use serpbrief_local::brief::{MetaStyle, OutlineStyle};
use serpbrief_local::cluster::{cluster_with, ClusterStrategy, DEFAULT_THRESHOLD};
use serpbrief_local::extract::{extract_from_body, extract_headings_from_markdown};
use serpbrief_local::intent::classify_intent;
use serpbrief_local::pipeline::{BriefConfig, BriefPipeline, PageSource};
use serpbrief_local::proxy::{MarkdownProxyClient, MarkdownProxyConfig, DEFAULT_PROXY_PREFIX};
use serpbrief_local::serpapi::{parse_serpapi_json, SerpApiConfig, SerpApiProvider};
use serpbrief_local::LocalFetcher;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "serpbrief")]
#[command(
    about = "Keyword research: SERP lookup, competitor headings, intent and content briefs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a content brief for a keyword (markdown or json).
    Brief(BriefCmd),
    /// Extract h1..h6 headings from a local file or a URL.
    Headings(HeadingsCmd),
    /// Score search intent for one or more text snippets.
    Intent(IntentCmd),
    /// Cluster near-duplicate headings and print the representatives.
    Cluster(ClusterCmd),
    /// Report which keys/endpoints are configured (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutlineArg {
    Clustered,
    PerCompetitor,
}

impl From<OutlineArg> for OutlineStyle {
    fn from(v: OutlineArg) -> Self {
        match v {
            OutlineArg::Clustered => OutlineStyle::Clustered,
            OutlineArg::PerCompetitor => OutlineStyle::PerCompetitor,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MetaArg {
    Basic,
    ByIntent,
}

impl From<MetaArg> for MetaStyle {
    fn from(v: MetaArg) -> Self {
        match v {
            MetaArg::Basic => MetaStyle::Basic,
            MetaArg::ByIntent => MetaStyle::ByIntent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BriefFormat {
    Markdown,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TextOrJson {
    Text,
    Json,
}

fn parse_threshold(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {s}"))?;
    if t > 0.0 && t <= 1.0 {
        Ok(t)
    } else {
        Err(format!("threshold must be in (0, 1], got {t}"))
    }
}

fn strategy(best_match: bool) -> ClusterStrategy {
    if best_match {
        ClusterStrategy::BestMatch
    } else {
        ClusterStrategy::FirstMatch
    }
}

#[derive(clap::Args, Debug)]
struct BriefCmd {
    /// Target keyword.
    #[arg(long)]
    keyword: String,
    /// SerpApi key (ignored with --serp-file).
    #[arg(long, env = "SERPAPI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// SerpApi endpoint override.
    #[arg(long, env = "SERPBRIEF_SERPAPI_ENDPOINT")]
    serpapi_endpoint: Option<String>,
    /// Read a saved SerpApi JSON response instead of calling the API.
    #[arg(long)]
    serp_file: Option<PathBuf>,
    /// Do not fetch competitor pages (SERP-only brief).
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Number of top organic results whose pages are fetched.
    #[arg(long, default_value_t = 5)]
    max_competitors: usize,
    /// Organic results requested from the provider.
    #[arg(long, default_value_t = 10)]
    num_results: usize,
    /// Heading similarity threshold in (0, 1].
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    threshold: f64,
    /// Join the most similar cluster instead of the first qualifying one.
    #[arg(long, default_value_t = false)]
    best_match: bool,
    #[arg(long, value_enum, default_value_t = OutlineArg::Clustered)]
    outline: OutlineArg,
    #[arg(long, value_enum, default_value_t = MetaArg::Basic)]
    meta: MetaArg,
    /// Search language (`hl`).
    #[arg(long)]
    language: Option<String>,
    /// Search country (`gl`).
    #[arg(long)]
    country: Option<String>,
    /// Per-page fetch timeout (ms).
    #[arg(long, default_value_t = 15_000)]
    fetch_timeout_ms: u64,
    /// Markdown proxy prefix used when a direct page fetch fails.
    #[arg(long, env = "SERPBRIEF_PROXY_ENDPOINT", default_value = DEFAULT_PROXY_PREFIX)]
    proxy_endpoint: String,
    #[arg(long, env = "SERPBRIEF_PROXY_API_KEY", hide_env_values = true)]
    proxy_api_key: Option<String>,
    /// Disable the markdown proxy fallback.
    #[arg(long, default_value_t = false)]
    no_proxy: bool,
    #[arg(long, value_enum, default_value_t = BriefFormat::Markdown)]
    format: BriefFormat,
    /// Write the brief here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["file", "url"])))]
struct HeadingsCmd {
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long)]
    url: Option<String>,
    /// Treat the input as Markdown regardless of content type.
    #[arg(long, default_value_t = false)]
    markdown: bool,
    #[arg(long, default_value_t = 15_000)]
    timeout_ms: u64,
    #[arg(long, value_enum, default_value_t = TextOrJson::Text)]
    format: TextOrJson,
}

#[derive(clap::Args, Debug)]
struct IntentCmd {
    /// Snippet to score (repeatable).
    #[arg(long = "text", required = true)]
    texts: Vec<String>,
    #[arg(long, value_enum, default_value_t = TextOrJson::Text)]
    format: TextOrJson,
}

#[derive(clap::Args, Debug)]
struct ClusterCmd {
    /// Heading to cluster (repeatable, order matters).
    #[arg(long = "heading", required = true)]
    headings: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    threshold: f64,
    #[arg(long, default_value_t = false)]
    best_match: bool,
    #[arg(long, value_enum, default_value_t = TextOrJson::Text)]
    format: TextOrJson,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// A saved SERP served as if it came from a provider.
struct SavedSerp(SerpResponse);

#[async_trait::async_trait]
impl SerpProvider for SavedSerp {
    fn name(&self) -> &'static str {
        "serp_file"
    }

    async fn search(&self, _q: &SearchQuery) -> serpbrief_core::Result<SerpResponse> {
        Ok(self.0.clone())
    }
}

fn load_serp_file(path: &std::path::Path) -> Result<SerpResponse> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read serp file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse serp file {}", path.display()))?;
    Ok(parse_serpapi_json(value)?)
}

fn write_output(out: Option<&std::path::Path>, body: &str) -> Result<()> {
    match out {
        Some(p) => {
            if let Some(dir) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create {}", dir.display()))?;
            }
            std::fs::write(p, body).with_context(|| format!("write {}", p.display()))?;
            println!("{}", p.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

fn print_headings_text(headings: &[Heading]) {
    for h in headings {
        let indent = "  ".repeat(h.level.saturating_sub(1) as usize);
        println!("{indent}h{} {}", h.level, h.text);
    }
}

async fn run_brief(args: BriefCmd) -> Result<()> {
    let client = reqwest::Client::new();

    let provider: Arc<dyn SerpProvider> = match args.serp_file.as_deref() {
        Some(p) => Arc::new(SavedSerp(load_serp_file(p)?)),
        None => {
            let key = args
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .context("missing SerpApi key: pass --api-key, set SERPAPI_API_KEY, or use --serp-file")?;
            let mut cfg = SerpApiConfig::new(key);
            if let Some(ep) = args.serpapi_endpoint.clone() {
                cfg.endpoint = ep;
            }
            Arc::new(SerpApiProvider::new(client.clone(), cfg)?)
        }
    };

    let proxy = if args.no_proxy || args.offline {
        None
    } else {
        Some(MarkdownProxyClient::new(
            client.clone(),
            MarkdownProxyConfig {
                endpoint_prefix: args.proxy_endpoint.clone(),
                api_key: args.proxy_api_key.clone(),
                ..Default::default()
            },
        )?)
    };

    let config = BriefConfig {
        serp_results: args.num_results.max(1),
        max_competitors: args.max_competitors,
        threshold: args.threshold,
        strategy: strategy(args.best_match),
        outline: args.outline.into(),
        meta: args.meta.into(),
        fetch_timeout_ms: args.fetch_timeout_ms,
        fetch_pages: !args.offline,
        language: args.language.clone(),
        country: args.country.clone(),
        ..Default::default()
    };
    let pipeline = BriefPipeline::new(provider, Arc::new(LocalFetcher::new()?), proxy, config)?;

    let run = pipeline
        .run(&args.keyword)
        .await
        .with_context(|| format!("brief for {:?}", args.keyword))?;
    for p in &run.pages {
        match p.source {
            PageSource::Failed => tracing::warn!(
                url = %p.url,
                error = p.error.as_deref().unwrap_or(""),
                "no headings"
            ),
            _ => tracing::info!(
                url = %p.url,
                source = ?p.source,
                headings = p.heading_count,
                truncated = p.truncated,
                "page"
            ),
        }
    }

    let body = match args.format {
        BriefFormat::Json => format!("{}\n", run.export.to_json_pretty()?),
        BriefFormat::Markdown => run.export.to_markdown(),
    };
    write_output(args.out.as_deref(), &body)
}

async fn run_headings(args: HeadingsCmd) -> Result<()> {
    let page = if let Some(path) = args.file.as_deref() {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let label = path.display().to_string();
        let headings = if args.markdown {
            extract_headings_from_markdown(&String::from_utf8_lossy(&bytes))
        } else {
            extract_from_body(&bytes, None, &label)
        };
        PageHeadings {
            source_url: label,
            headings,
        }
    } else if let Some(url) = args.url.as_deref() {
        let fetcher = LocalFetcher::new()?;
        let mut req = FetchRequest::new(url);
        req.timeout_ms = Some(args.timeout_ms);
        let resp = fetcher.fetch(&req).await?;
        if !resp.is_success() {
            anyhow::bail!("fetch {url}: HTTP {}", resp.status);
        }
        let headings = if args.markdown {
            extract_headings_from_markdown(&resp.text_lossy())
        } else {
            extract_from_body(&resp.bytes, resp.content_type.as_deref(), &resp.final_url)
        };
        PageHeadings {
            source_url: resp.final_url,
            headings,
        }
    } else {
        anyhow::bail!("one of --file or --url is required");
    };

    match args.format {
        TextOrJson::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        TextOrJson::Text => print_headings_text(&page.headings),
    }
    Ok(())
}

fn run_intent(args: IntentCmd) -> Result<()> {
    let report = classify_intent(args.texts.as_slice());
    match args.format {
        TextOrJson::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        TextOrJson::Text => {
            println!("{}", report.label);
            let s = report.scores;
            println!(
                "informational={} commercial={} transactional={} navigational={}",
                s.informational, s.commercial, s.transactional, s.navigational
            );
        }
    }
    Ok(())
}

fn run_cluster(args: ClusterCmd) -> Result<()> {
    let clusters = cluster_with(args.headings.as_slice(), args.threshold, strategy(args.best_match));
    match args.format {
        TextOrJson::Json => println!("{}", serde_json::to_string_pretty(&clusters)?),
        TextOrJson::Text => {
            for c in &clusters {
                println!("{}", c.representative);
            }
        }
    }
    Ok(())
}

fn run_doctor(args: DoctorCmd) {
    fn has_env(k: &str) -> bool {
        std::env::var(k).ok().is_some_and(|v| !v.trim().is_empty())
    }

    let t0 = std::time::Instant::now();
    let serpapi = has_env("SERPAPI_API_KEY");
    let proxy_key = has_env("SERPBRIEF_PROXY_API_KEY");
    let proxy_endpoint = std::env::var("SERPBRIEF_PROXY_ENDPOINT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROXY_PREFIX.to_string());
    let proxy_endpoint_ok = url::Url::parse(&proxy_endpoint).is_ok();

    let checks = vec![
        serde_json::json!({
            "name": "serpapi_key",
            "ok": serpapi,
            "hint": if serpapi { "" } else { "Set SERPAPI_API_KEY or pass `brief --serp-file`." },
        }),
        serde_json::json!({
            "name": "proxy_endpoint_parses",
            "ok": proxy_endpoint_ok,
            "hint": if proxy_endpoint_ok { "" } else { "SERPBRIEF_PROXY_ENDPOINT is not a valid URL." },
        }),
    ];
    let v = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": proxy_endpoint_ok,
        "name": "serpbrief",
        "version": env!("CARGO_PKG_VERSION"),
        "elapsed_ms": t0.elapsed().as_millis(),
        "configured": {
            "serpapi": serpapi,
            "proxy_api_key": proxy_key,
            "proxy_endpoint": proxy_endpoint,
            "env_file": has_env("SERPBRIEF_ENV_FILE"),
        },
        "checks": checks,
    });
    match args.output.to_ascii_lowercase().as_str() {
        "text" => {
            println!("serpbrief {}", env!("CARGO_PKG_VERSION"));
            println!("serpapi key: {}", if serpapi { "set" } else { "missing" });
            println!("proxy key: {}", if proxy_key { "set" } else { "missing" });
            println!("proxy endpoint: {proxy_endpoint}");
        }
        _ => println!("{}", v),
    }
}

/// Optional env-file loader (opt-in via `SERPBRIEF_ENV_FILE`).
///
/// Sets vars only if not already present in the process environment; never logs values.
/// Must run while the process is still single-threaded.
fn load_env_file() {
    let Ok(p) = std::env::var("SERPBRIEF_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Env mutation happens here, before the runtime spawns any worker threads.
    load_env_file();
    let cli = Cli::parse();
    init_tracing();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Brief(args) => run_brief(args).await?,
        Commands::Headings(args) => run_headings(args).await?,
        Commands::Intent(args) => run_intent(args)?,
        Commands::Cluster(args) => run_cluster(args)?,
        Commands::Doctor(args) => run_doctor(args),
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "serpbrief",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("serpbrief {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}
