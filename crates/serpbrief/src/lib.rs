//! `serpbrief`: keyword → SERP → competitor headings → themes + intent → content brief.
//!
//! Types and collaborator traits come from `serpbrief-core`; the reqwest/scraper
//! implementations and the [`BriefPipeline`] live in `serpbrief-local`, re-exported
//! as [`local`].
//!
//! ```no_run
//! use serpbrief::{BriefConfig, BriefPipeline};
//! use serpbrief::local::{serpapi::{SerpApiConfig, SerpApiProvider}, LocalFetcher};
//! use std::sync::Arc;
//!
//! # async fn demo() -> serpbrief::Result<()> {
//! let fetcher = LocalFetcher::new()?;
//! let provider = SerpApiProvider::new(fetcher.client().clone(), SerpApiConfig::new("key"))?;
//! let pipeline = BriefPipeline::new(
//!     Arc::new(provider),
//!     Arc::new(fetcher),
//!     None,
//!     BriefConfig::default(),
//! )?;
//! let run = pipeline.run("best crm software").await?;
//! println!("{}", run.export.to_markdown());
//! # Ok(())
//! # }
//! ```

pub use serpbrief_core::*;
pub use serpbrief_local as local;
pub use serpbrief_local::pipeline::{BriefConfig, BriefPipeline, BriefRun};
