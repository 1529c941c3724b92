use crate::highlight::highlight;
use crate::page::PageRecord;
use crate::tokenizer::tokenize;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// term -> url -> raw term frequency
pub type PostingTable = HashMap<String, HashMap<String, u32>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub term_count: usize,
}

/// A search hit: the stored page with its snippet replaced by a highlighted excerpt.
#[derive(Debug, Clone)]
pub struct ScoredPage {
    pub page: PageRecord,
    pub score: f64,
}

#[derive(Default)]
struct Inner {
    postings: PostingTable,
    docs: HashMap<String, PageRecord>,
}

/// In-memory inverted index with TF-IDF ranking.
///
/// Adding a URL that is already present overwrites its stored record but keeps the
/// postings of earlier adds, so term counts accumulate across repeated adds.
#[derive(Default)]
pub struct InvertedIndex {
    inner: RwLock<Inner>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn add(&self, page: PageRecord) {
        let terms = tokenize(&format!("{} {}", page.title, page.content));
        let mut inner = self.inner.write();
        for term in terms {
            *inner.postings.entry(term).or_default().entry(page.url.clone()).or_insert(0) += 1;
        }
        inner.docs.insert(page.url.clone(), page);
    }

    pub fn add_all<I: IntoIterator<Item = PageRecord>>(&self, pages: I) {
        for page in pages {
            self.add(page);
        }
    }

    pub fn search(&self, query: &str) -> Vec<PageRecord> {
        self.search_scored(query).into_iter().map(|hit| hit.page).collect()
    }

    /// Rank documents for `query` by summed `tf * ln(1 + N/df)` over its terms.
    ///
    /// Results are ordered by descending score, ties by ascending URL.
    pub fn search_scored(&self, query: &str) -> Vec<ScoredPage> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let inner = self.inner.read();
        let n = inner.docs.len() as f64;
        let mut scores: HashMap<&str, f64> = HashMap::new();
        for term in &terms {
            let Some(docs_with_term) = inner.postings.get(term) else { continue };
            let df = docs_with_term.len() as f64;
            let idf = (1.0 + n / df).ln();
            for (url, tf) in docs_with_term {
                *scores.entry(url.as_str()).or_insert(0.0) += f64::from(*tf) * idf;
            }
        }

        let mut ranked: Vec<(&str, f64)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(b.0)));

        ranked
            .into_iter()
            .filter_map(|(url, score)| {
                let mut page = inner.docs.get(url)?.clone();
                page.snippet = highlight(&page.content, &terms);
                Some(ScoredPage { page, score })
            })
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        IndexStats { document_count: inner.docs.len(), term_count: inner.postings.len() }
    }

    pub fn len(&self) -> usize { self.inner.read().docs.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Raw frequency of `term` in the document stored under `url`.
    pub fn term_frequency(&self, term: &str, url: &str) -> u32 {
        let inner = self.inner.read();
        inner.postings.get(term).and_then(|docs| docs.get(url)).copied().unwrap_or(0)
    }

    /// The stored record for `url`, with its precomputed snippet.
    pub fn document(&self, url: &str) -> Option<PageRecord> {
        self.inner.read().docs.get(url).cloned()
    }
}
