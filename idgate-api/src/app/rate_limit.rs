use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 简单的滑动窗口限流器（基于内存，按 key 计数）。
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, Vec<Instant>>>,
    sweep_threshold: usize,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Mutex::new(HashMap::new()),
            sweep_threshold: 1024,
        }
    }

    /// 返回是否允许当前请求；超限返回 false。
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let entry = buckets.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        let allowed = entry.len() < self.limit;
        if allowed {
            entry.push(now);
        }
        // bucket 过多时全量清理过期记录
        if buckets.len() > self.sweep_threshold {
            buckets.retain(|_, times| {
                times.retain(|t| now.duration_since(*t) < self.window);
                !times.is_empty()
            });
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limits_per_key_within_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("1.2.3.4").await);
        assert!(!limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("5.6.7.8").await);
    }

    #[tokio::test]
    async fn window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        assert!(limiter.allow("k").await);
        assert!(!limiter.allow("k").await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.allow("k").await);
    }
}
