use anyhow::Result;
use clap::Parser;
use crawler::{CrawlConfig, CrawlEngine, FetcherConfig, HttpFetcher};
use parking_lot::Mutex;
use search_core::store::open_or_warn;
use search_core::{InvertedIndex, PageRecord, PageStore, SledPageStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl from a seed URL, index the pages and persist them")]
struct Cli {
    /// Seed URL to start from
    #[arg(long, default_value = "https://example.com")]
    seed: String,
    /// Maximum link depth (the seed is depth 0)
    #[arg(long, default_value_t = 1)]
    depth: usize,
    /// Maximum fetches in flight
    #[arg(long, default_value_t = 10)]
    concurrency: usize,
    /// Minimum milliseconds between requests to one host
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string sent with every request
    #[arg(long, default_value = "search-engine-rs-bot/0.1 (+https://example.com/bot)")]
    user_agent: String,
    /// Page store directory
    #[arg(long, default_value = "./data/pages")]
    store: String,
    /// Keep crawled pages in memory only
    #[arg(long, default_value_t = false)]
    no_store: bool,
}

/// Indexes every page and saves it to the store off the crawl's critical path.
struct IndexingSink {
    index: Arc<InvertedIndex>,
    store: Option<Arc<SledPageStore>>,
    pending: Mutex<JoinSet<()>>,
}

impl IndexingSink {
    fn new(index: Arc<InvertedIndex>, store: Option<Arc<SledPageStore>>) -> Self {
        Self { index, store, pending: Mutex::new(JoinSet::new()) }
    }

    fn record(&self, page: PageRecord) {
        tracing::info!(url = %page.url, title = %page.title, "crawled");
        if let Some(store) = &self.store {
            let store = Arc::clone(store);
            let saved = page.clone();
            let mut pending = self.pending.lock();
            while let Some(done) = pending.try_join_next() {
                if let Err(err) = done {
                    tracing::warn!(error = %err, "page save task failed");
                }
            }
            pending.spawn_blocking(move || {
                if let Err(err) = store.save_page(&saved) {
                    tracing::warn!(url = %saved.url, error = %format!("{err:#}"), "failed to save page");
                }
            });
        }
        self.index.add(page);
    }

    async fn drain(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock());
        while let Some(done) = pending.join_next().await {
            if let Err(err) = done {
                tracing::warn!(error = %err, "page save task failed");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let args = Cli::parse();

    let store = if args.no_store { None } else { open_or_warn(&args.store).map(Arc::new) };
    let index = Arc::new(InvertedIndex::new());
    let sink = Arc::new(IndexingSink::new(Arc::clone(&index), store.clone()));

    let fetcher = HttpFetcher::new(&FetcherConfig {
        user_agent: args.user_agent.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        ..FetcherConfig::default()
    })?;
    let config = CrawlConfig {
        seed_url: args.seed.clone(),
        max_depth: args.depth,
        max_concurrent: args.concurrency,
        politeness_interval: Duration::from_millis(args.interval_ms),
    };
    let engine_sink = Arc::clone(&sink);
    let engine = CrawlEngine::new(config, fetcher).with_sink(move |page: PageRecord| engine_sink.record(page));

    let summary = engine.start().await;
    sink.drain().await;
    if let Some(store) = &store {
        store.flush()?;
    }

    let stats = index.stats();
    eprintln!(
        "done: delivered={} failed={} visited={} documents={} terms={} elapsed={:.2}s",
        summary.delivered,
        summary.failed,
        summary.visited,
        stats.document_count,
        stats.term_count,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
