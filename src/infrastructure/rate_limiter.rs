// Sliding window rate limiting per Grafana URL
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// In-memory sliding-window rate limiter keyed by upstream URL.
///
/// The limit comes from `RATE_LIMIT` at check time; unset or unparsable
/// disables limiting entirely.
#[derive(Debug, Default)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn limit() -> Option<usize> {
        std::env::var("RATE_LIMIT").ok()?.parse().ok()
    }

    pub fn is_allowed(&self, grafana_url: &str) -> bool {
        self.check(grafana_url, Self::limit(), Instant::now())
    }

    fn check(&self, grafana_url: &str, limit: Option<usize>, now: Instant) -> bool {
        let Some(limit) = limit else {
            return true;
        };

        let mut requests = self.requests.lock().unwrap();
        let timestamps = requests.entry(grafana_url.to_string()).or_default();
        timestamps.retain(|ts| now.duration_since(*ts) < WINDOW);

        if timestamps.len() >= limit {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Seconds until the next request for this URL would be allowed.
    pub fn retry_after(&self, grafana_url: &str) -> u64 {
        let requests = self.requests.lock().unwrap();
        let Some(oldest) = requests
            .get(grafana_url)
            .and_then(|timestamps| timestamps.iter().min())
        else {
            return 0;
        };

        let elapsed = oldest.elapsed();
        WINDOW.saturating_sub(elapsed).as_secs().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_limit_always_allows() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..1000 {
            assert!(limiter.check("https://g.example.com", None, now));
        }
    }

    #[test]
    fn test_blocks_over_limit() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.check("https://g.example.com", Some(2), now));
        assert!(limiter.check("https://g.example.com", Some(2), now));
        assert!(!limiter.check("https://g.example.com", Some(2), now));

        // Other URLs have their own window.
        assert!(limiter.check("https://other.example.com", Some(2), now));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        assert!(limiter.check("https://g.example.com", Some(1), start));
        assert!(!limiter.check("https://g.example.com", Some(1), start));
        // Past the window the old timestamp no longer counts.
        assert!(limiter.check("https://g.example.com", Some(1), start + WINDOW));
    }

    #[test]
    fn test_retry_after_bounds() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.retry_after("https://unseen.example.com"), 0);

        limiter.check("https://g.example.com", Some(1), Instant::now());
        let retry = limiter.retry_after("https://g.example.com");
        assert!(retry >= 1 && retry <= 60);
    }
}
