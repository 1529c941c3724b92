use crate::index::InvertedIndex;
use crate::page::PageRecord;
use anyhow::{Context, Result};
use std::path::Path;

/// Persistence collaborator for crawled pages.
pub trait PageStore: Send + Sync {
    fn save_page(&self, page: &PageRecord) -> Result<()>;
    fn load_all_pages(&self) -> Result<Vec<PageRecord>>;
}

/// Pages stored in a sled database, bincode-encoded and keyed by URL.
///
/// Saving a URL twice keeps only the latest record.
pub struct SledPageStore {
    db: sled::Db,
}

impl SledPageStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("opening page store at {}", path.display()))?;
        Ok(Self { db })
    }

    /// A store that lives only as long as this handle.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn len(&self) -> usize { self.db.len() }

    pub fn is_empty(&self) -> bool { self.db.is_empty() }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl PageStore for SledPageStore {
    fn save_page(&self, page: &PageRecord) -> Result<()> {
        let bytes = bincode::serialize(page)?;
        self.db.insert(page.url.as_bytes(), bytes)?;
        Ok(())
    }

    fn load_all_pages(&self) -> Result<Vec<PageRecord>> {
        let mut pages = Vec::with_capacity(self.db.len());
        for entry in self.db.iter() {
            let (key, value) = entry?;
            let page: PageRecord = bincode::deserialize(&value)
                .with_context(|| format!("decoding stored page {}", String::from_utf8_lossy(&key)))?;
            pages.push(page);
        }
        Ok(pages)
    }
}

/// Open the store at `path`, or log and return `None` so callers run memory-only.
pub fn open_or_warn<P: AsRef<Path>>(path: P) -> Option<SledPageStore> {
    match SledPageStore::open(&path) {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "page store unavailable, persistence disabled");
            None
        }
    }
}

/// Replay every stored page through `InvertedIndex::add`. Returns the number replayed.
pub fn replay_into(store: &dyn PageStore, index: &InvertedIndex) -> Result<usize> {
    let pages = store.load_all_pages()?;
    let count = pages.len();
    index.add_all(pages);
    tracing::info!(pages = count, "replayed stored pages into index");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pages_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        {
            let store = SledPageStore::open(dir.path().join("pages")).unwrap();
            store.save_page(&PageRecord::new("http://a.com", "Go Lang", "Go is great for concurrency")).unwrap();
            store.save_page(&PageRecord::new("http://b.com", "Rust Lang", "concurrency is harder")).unwrap();
            store.flush().unwrap();
        }
        let store = SledPageStore::open(dir.path().join("pages")).unwrap();
        let mut pages = store.load_all_pages().unwrap();
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].title, "Go Lang");
        assert_eq!(pages[1].content, "concurrency is harder");
    }

    #[test]
    fn resaving_a_url_overwrites() {
        let store = SledPageStore::temporary().unwrap();
        store.save_page(&PageRecord::new("http://a.com", "old", "old body")).unwrap();
        store.save_page(&PageRecord::new("http://a.com", "new", "new body")).unwrap();
        let pages = store.load_all_pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "new");
    }

    #[test]
    fn replay_feeds_the_index() {
        let store = SledPageStore::temporary().unwrap();
        store.save_page(&PageRecord::new("http://a.com", "Go Lang", "Go is great for concurrency")).unwrap();
        store.save_page(&PageRecord::new("http://c.com", "Python", "Python is slow")).unwrap();

        let index = InvertedIndex::new();
        assert_eq!(replay_into(&store, &index).unwrap(), 2);
        assert_eq!(index.stats().document_count, 2);
        assert_eq!(index.search("python").len(), 1);
    }
}
