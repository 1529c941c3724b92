//! Bounded-depth, bounded-concurrency web crawling.
//!
//! [`CrawlEngine`] drives a traversal from a seed URL, throttling each host with a
//! [`RateLimiter`], deduplicating through a [`VisitedTracker`] and handing every fetched
//! page to a [`PageSink`].

pub mod engine;
pub mod fetch;
pub mod rate_limit;
pub mod visited;

pub use engine::{CrawlConfig, CrawlEngine, CrawlSummary, PageSink};
pub use fetch::{FetchError, FetchedPage, FetcherConfig, HttpFetcher, PageFetcher};
pub use rate_limit::{RateLimiter, DEFAULT_POLITENESS_INTERVAL};
pub use visited::VisitedTracker;
