//! 短期缓存：待验证注册信息与一次性验证码，按 key 过期。

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const PENDING_USER_PREFIX: &str = "user_";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// 验证码用途，决定缓存 key 的前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    Registration,
    ForgotPassword,
}

impl CodePurpose {
    pub fn key_prefix(&self) -> &'static str {
        match self {
            CodePurpose::Registration => "registration-code_",
            CodePurpose::ForgotPassword => "forgot-password-code_",
        }
    }
}

/// `user_<email>`
pub fn pending_user_key(email: &str) -> String {
    format!("{PENDING_USER_PREFIX}{email}")
}

/// `<purpose_prefix><email>`
pub fn code_key(purpose: CodePurpose, email: &str) -> String {
    format!("{}{}", purpose.key_prefix(), email)
}

/// 带过期时间的 key/value 缓存。
///
/// `get` 对已过期和从未写入的 key 都返回 `Ok(None)`；实现必须在一次原子操作内完成
/// “检查过期 + 读取”。
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    /// 写入（覆盖已有值并重置 TTL）
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// 删除 key，返回删除前是否存在且未过期
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// 进程内缓存实现
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    sweep_threshold: usize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sweep_threshold: 1024,
        }
    }

    /// 当前仍有效的条目数
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EphemeralCache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Backend(format!("ttl out of range: {:?}", ttl)))?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        // 条目过多时清理过期项，避免无限增长
        if entries.len() > self.sweep_threshold {
            entries.retain(|_, e| e.is_live(now));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_namespace() {
        assert_eq!(pending_user_key("ann@x.com"), "user_ann@x.com");
        assert_eq!(
            code_key(CodePurpose::Registration, "ann@x.com"),
            "registration-code_ann@x.com"
        );
        assert_eq!(
            code_key(CodePurpose::ForgotPassword, "ann@x.com"),
            "forgot-password-code_ann@x.com"
        );
    }

    #[tokio::test]
    async fn set_get_overwrite() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.set("k", "v1", Duration::from_secs(60)).await.unwrap();
        cache.set("k", "v2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entry_reads_as_missing() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_millis(30)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sweep_drops_expired_entries() {
        let cache = MemoryCache {
            entries: Mutex::new(HashMap::new()),
            sweep_threshold: 2,
        };
        cache.set("a", "1", Duration::from_millis(10)).await.unwrap();
        cache.set("b", "2", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.set("c", "3", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.entries.lock().await.len(), 1);
    }
}
