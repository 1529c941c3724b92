use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use url::Url;

pub const DEFAULT_POLITENESS_INTERVAL: Duration = Duration::from_secs(1);

/// Per-host minimum spacing between requests.
///
/// Each caller reserves its slot under the lock and sleeps outside it, so waiters on the
/// same host queue up one interval apart without serializing their sleeps. The interval
/// is a soft minimum per caller, not a global ordering.
pub struct RateLimiter {
    interval: Duration,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_request: Mutex::new(HashMap::new()) }
    }

    /// Wait until a request to the host of `url` is permitted.
    pub async fn wait(&self, url: &str) {
        let key = host_key(url);
        let delay = {
            let mut last_request = self.last_request.lock();
            let now = Instant::now();
            match last_request.get(&key).map(|last| *last + self.interval) {
                Some(slot) if slot > now => {
                    last_request.insert(key, slot);
                    Some(slot - now)
                }
                _ => {
                    last_request.insert(key, now);
                    None
                }
            }
        };
        if let Some(delay) = delay {
            sleep(delay).await;
        }
    }
}

/// Throttling key: `host[:port]`, or the raw string when there is no parseable host.
pub fn host_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn host_key_uses_authority() {
        assert_eq!(host_key("https://example.com/a?b=c"), "example.com");
        assert_eq!(host_key("http://example.com:8080/x"), "example.com:8080");
        assert_eq!(host_key("not a url"), "not a url");
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.wait("https://example.com/").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_requests_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let mut permitted = Vec::new();
        for page in ["a", "b", "c"] {
            limiter.wait(&format!("https://example.com/{page}")).await;
            permitted.push(Instant::now());
        }
        for pair in permitted.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_on_one_host_queue_up() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(500)));
        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait(&format!("https://example.com/{i}")).await;
                    Instant::now()
                })
            })
            .collect();
        let mut permitted = Vec::new();
        for h in handles {
            permitted.push(h.await.unwrap());
        }
        permitted.sort();
        for pair in permitted.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
        let last = permitted[3] - start;
        assert!(last >= Duration::from_millis(1500) && last < Duration::from_millis(1600), "{last:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn hosts_are_throttled_independently() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.wait("https://a.example/").await;
        limiter.wait("https://b.example/").await;
        limiter.wait("https://a.example:8443/").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_interval_needs_no_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.wait("https://example.com/").await;
        tokio::time::advance(Duration::from_secs(2)).await;
        let before = Instant::now();
        limiter.wait("https://example.com/").await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
