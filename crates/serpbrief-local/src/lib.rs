//! Local implementations for `serpbrief`: reqwest transports (SerpApi, page fetch,
//! markdown proxy), scraper-based heading extraction, and the pure analysis steps
//! (clustering, intent, brief assembly) wired together by [`pipeline::BriefPipeline`].

pub mod brief;
pub mod cluster;
pub mod extract;
pub mod fetch;
pub mod insights;
pub mod intent;
pub mod pipeline;
pub mod proxy;
pub mod serpapi;
pub mod textprep;

pub use fetch::LocalFetcher;
