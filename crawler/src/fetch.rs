use async_trait::async_trait;
use lazy_static::lazy_static;
use reqwest::{redirect, Client};
use scraper::{Html, Selector};
use search_core::PageRecord;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref LINKS: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// Elements whose text never counts as visible content.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "title"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },

    #[error("body of {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

/// A fetched page and the outbound links found on it.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub page: PageRecord,
    pub links: Vec<String>,
}

/// Fetch-and-extract collaborator consumed by the crawl engine.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "search-engine-rs-bot/0.1 (+https://example.com/bot)".to_string(),
            timeout: Duration::from_secs(12),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, max_body_bytes: config.max_body_bytes })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }
        if resp.content_length().is_some_and(|len| len as usize > self.max_body_bytes) {
            return Err(FetchError::TooLarge { url: url.to_string(), limit: self.max_body_bytes });
        }
        let bytes = resp.bytes().await.map_err(|source| FetchError::Body { url: url.to_string(), source })?;
        if bytes.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge { url: url.to_string(), limit: self.max_body_bytes });
        }
        let body = String::from_utf8_lossy(&bytes);
        Ok(extract_page(url, &body))
    }
}

/// Pull the title, visible text and absolute `http(s)` links out of an HTML document.
///
/// Parsing is error-tolerant: malformed markup yields whatever the parser recovered.
pub fn extract_page(url: &str, html: &str) -> FetchedPage {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let mut content = String::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node
            .ancestors()
            .any(|a| a.value().as_element().is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name())));
        if hidden {
            continue;
        }
        let text = text.trim();
        if !text.is_empty() {
            content.push_str(text);
            content.push(' ');
        }
    }

    let mut seen = HashSet::new();
    let links = doc
        .select(&LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with("http") && seen.insert(*href))
        .map(str::to_string)
        .collect();

    FetchedPage { page: PageRecord::new(url, title, content), links }
}
