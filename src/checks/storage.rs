// src/checks/storage.rs
use crate::backends::StorageBackend;
use crate::heartbeat::{CheckFunction, CheckResult, RequestContext};
use async_trait::async_trait;
use std::sync::Arc;

pub struct StorageCheck {
    storage: Arc<dyn StorageBackend>,
}

impl StorageCheck {
    pub const NAME: &'static str = "storage-health";

    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl CheckFunction for StorageCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
        Ok(match self.storage.heartbeat().await {
            Ok(()) => CheckResult::ok(Self::NAME),
            Err(failure) => CheckResult::failed(Self::NAME, failure.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStorage;

    #[tokio::test]
    async fn test_storage_failure_message() {
        let storage = Arc::new(MemoryStorage::new());
        let check = StorageCheck::new(storage.clone());
        let ctx = RequestContext::new();

        assert!(check.check(&ctx).await.unwrap().ok);

        storage.set_unhealthy("mongo: replica set has no primary").await;
        let result = check.check(&ctx).await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.message, "mongo: replica set has no primary");
    }
}
