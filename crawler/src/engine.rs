use crate::fetch::PageFetcher;
use crate::rate_limit::{RateLimiter, DEFAULT_POLITENESS_INTERVAL};
use crate::visited::VisitedTracker;
use search_core::PageRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_MAX_DEPTH: usize = 1;
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Receives every page the engine finishes, failed fetches included.
pub trait PageSink: Send + Sync {
    fn on_page(&self, page: PageRecord);
}

impl<F> PageSink for F
where
    F: Fn(PageRecord) + Send + Sync,
{
    fn on_page(&self, page: PageRecord) { self(page) }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed_url: String,
    /// Inclusive; the seed has depth 0.
    pub max_depth: usize,
    /// Fetches in flight across the whole traversal.
    pub max_concurrent: usize,
    pub politeness_interval: Duration,
}

impl CrawlConfig {
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            politeness_interval: DEFAULT_POLITENESS_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Pages handed to the sink, failed fetches included.
    pub delivered: usize,
    pub failed: usize,
    /// Tasks that panicked before delivering.
    pub aborted: usize,
    pub visited: usize,
    pub elapsed: Duration,
}

struct TaskOutcome {
    depth: usize,
    links: Vec<String>,
    failed: bool,
}

/// Per-run state shared by every task of one crawl.
struct Run {
    visited: VisitedTracker,
    limiter: RateLimiter,
    permits: Semaphore,
}

pub struct CrawlEngine<F> {
    config: CrawlConfig,
    fetcher: Arc<F>,
    sink: Option<Arc<dyn PageSink>>,
}

impl<F: PageFetcher + 'static> CrawlEngine<F> {
    pub fn new(config: CrawlConfig, fetcher: F) -> Self {
        Self { config, fetcher: Arc::new(fetcher), sink: None }
    }

    pub fn with_sink<S: PageSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn fetcher(&self) -> &F { &self.fetcher }

    /// Crawl from the seed and return once every task in the tree has finished.
    ///
    /// Visited URLs and rate-limiter state are created here and dropped on return, so
    /// each call is an independent run.
    pub async fn start(&self) -> CrawlSummary {
        let started = Instant::now();
        let run = Arc::new(Run {
            visited: VisitedTracker::new(),
            limiter: RateLimiter::new(self.config.politeness_interval),
            permits: Semaphore::new(self.config.max_concurrent.max(1)),
        });
        let mut tasks = JoinSet::new();
        let mut summary = CrawlSummary::default();

        tracing::info!(seed = %self.config.seed_url, max_depth = self.config.max_depth, max_concurrent = self.config.max_concurrent, "crawl started");
        self.schedule(&mut tasks, &run, self.config.seed_url.clone(), 0);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    summary.delivered += 1;
                    if outcome.failed {
                        summary.failed += 1;
                    }
                    for link in outcome.links {
                        self.schedule(&mut tasks, &run, link, outcome.depth + 1);
                    }
                }
                Err(err) => {
                    summary.aborted += 1;
                    tracing::error!(error = %err, "crawl task aborted");
                }
            }
        }

        summary.visited = run.visited.len();
        summary.elapsed = started.elapsed();
        tracing::info!(
            delivered = summary.delivered,
            failed = summary.failed,
            visited = summary.visited,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "crawl finished"
        );
        summary
    }

    fn schedule(&self, tasks: &mut JoinSet<TaskOutcome>, run: &Arc<Run>, url: String, depth: usize) {
        if depth > self.config.max_depth {
            tracing::trace!(%url, depth, "beyond max depth");
            return;
        }
        if !run.visited.mark_if_unvisited(&url) {
            tracing::trace!(%url, "already visited");
            return;
        }
        let fetcher = Arc::clone(&self.fetcher);
        let sink = self.sink.clone();
        let run = Arc::clone(run);
        let follow_links = depth < self.config.max_depth;
        tasks.spawn(crawl_one(fetcher, sink, run, url, depth, follow_links));
    }
}

async fn crawl_one<F: PageFetcher>(
    fetcher: Arc<F>,
    sink: Option<Arc<dyn PageSink>>,
    run: Arc<Run>,
    url: String,
    depth: usize,
    follow_links: bool,
) -> TaskOutcome {
    let fetched = {
        // The semaphore is never closed, so acquisition only fails if that changes.
        let _permit = run.permits.acquire().await.ok();
        run.limiter.wait(&url).await;
        fetcher.fetch(&url).await
    };

    let (page, links, failed) = match fetched {
        Ok(fetched) => (fetched.page, fetched.links, false),
        Err(err) => {
            tracing::warn!(%url, depth, error = %err, "fetch failed");
            (PageRecord::empty(url.clone()), Vec::new(), true)
        }
    };

    match &sink {
        Some(sink) => sink.on_page(page),
        None => tracing::info!(url = %page.url, title = %page.title, "crawled"),
    }

    TaskOutcome { depth, links: if follow_links { links } else { Vec::new() }, failed }
}
