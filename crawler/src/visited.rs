use parking_lot::Mutex;
use std::collections::HashSet;

/// URLs already claimed during one crawl run.
#[derive(Default)]
pub struct VisitedTracker {
    urls: Mutex<HashSet<String>>,
}

impl VisitedTracker {
    pub fn new() -> Self { Self::default() }

    /// Claim `url`. Returns `true` exactly once per URL; only the caller that gets `true`
    /// may fetch it.
    pub fn mark_if_unvisited(&self, url: &str) -> bool {
        let mut urls = self.urls.lock();
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_string())
    }

    /// Advisory only; never gate a fetch on this.
    pub fn is_visited(&self, url: &str) -> bool { self.urls.lock().contains(url) }

    pub fn len(&self) -> usize { self.urls.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
