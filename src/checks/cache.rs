// src/checks/cache.rs
//
// cache-set and cache-get share one sentinel key. They are independent
// checks: cache-get only passes after a cache-set against the same cache.
use crate::backends::Cache;
use crate::heartbeat::{CheckFunction, CheckResult, RequestContext};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const CACHE_KEY: &str = "heartbeat-test";
pub const CACHE_VALUE: &str = "abc123";
pub const CACHE_TTL: Duration = Duration::from_secs(30);

pub struct CacheSetCheck {
    cache: Arc<dyn Cache>,
}

impl CacheSetCheck {
    pub const NAME: &'static str = "cache-set";

    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl CheckFunction for CacheSetCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
        Ok(match self.cache.set(CACHE_KEY, CACHE_VALUE, CACHE_TTL).await {
            Ok(()) => CheckResult::ok(Self::NAME),
            Err(e) => CheckResult::failed(Self::NAME, e.to_string()),
        })
    }
}

pub struct CacheGetCheck {
    cache: Arc<dyn Cache>,
}

impl CacheGetCheck {
    pub const NAME: &'static str = "cache-get";

    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl CheckFunction for CacheGetCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
        Ok(match self.cache.get(CACHE_KEY).await {
            Ok(Some(value)) if value == CACHE_VALUE => CheckResult::ok(Self::NAME),
            Ok(_) => CheckResult::failed(Self::NAME, "value check failed"),
            Err(e) => CheckResult::failed(Self::NAME, e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryCache;

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = Arc::new(MemoryCache::new());
        let ctx = RequestContext::new();

        let set = CacheSetCheck::new(cache.clone()).check(&ctx).await.unwrap();
        assert!(set.ok);

        let get = CacheGetCheck::new(cache).check(&ctx).await.unwrap();
        assert_eq!(get, CheckResult::ok("cache-get"));
    }

    #[tokio::test]
    async fn test_get_without_set_fails_value_check() {
        let cache = Arc::new(MemoryCache::new());
        let get = CacheGetCheck::new(cache).check(&RequestContext::new()).await.unwrap();
        assert!(!get.ok);
        assert_eq!(get.message, "value check failed");
    }

    #[tokio::test]
    async fn test_get_with_wrong_value_fails_value_check() {
        let cache = Arc::new(MemoryCache::new());
        cache.set(CACHE_KEY, "stale", CACHE_TTL).await.unwrap();

        let get = CacheGetCheck::new(cache).check(&RequestContext::new()).await.unwrap();
        assert_eq!(get.message, "value check failed");
    }

    #[tokio::test]
    async fn test_unavailable_cache_reports_error() {
        let cache = Arc::new(MemoryCache::new());
        cache.set_available(false);
        let ctx = RequestContext::new();

        let set = CacheSetCheck::new(cache.clone()).check(&ctx).await.unwrap();
        assert!(!set.ok);
        assert!(set.message.contains("cache unavailable"));

        let get = CacheGetCheck::new(cache).check(&ctx).await.unwrap();
        assert!(!get.ok);
        assert_ne!(get.message, "value check failed");
    }
}
