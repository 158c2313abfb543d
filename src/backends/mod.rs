// src/backends/mod.rs
//
// Narrow interfaces to the systems the heartbeat probes. Real deployments
// plug their own implementations in; `memory` and `http` ship with the crate.
pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub use http::HttpStorage;
pub use memory::{MemoryCache, MemoryDatastore, MemoryStorage, MemoryTaskQueue, MemoryUserDirectory};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HeartbeatFailure(pub String);

#[derive(Debug, Clone, thiserror::Error)]
pub enum DatabaseError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("User matching query does not exist: {0:?}")]
    NotFound(String),

    #[error("{count} users returned for {username:?}, expected exactly one")]
    MultipleFound { username: String, count: usize },

    #[error("user directory error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("task broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("task backend error: {0}")]
    Backend(String),
}

/// A single row returned by a datastore query.
pub type Row = Vec<serde_json::Value>;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Self-test; `Err` carries a description of what is unhealthy.
    async fn heartbeat(&self) -> Result<(), HeartbeatFailure>;
}

#[async_trait]
pub trait Datastore: Send + Sync {
    async fn fetch_one(&self, sql: &str) -> Result<Option<Row>, DatabaseError>;
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_username(&self, username: &str) -> Result<UserRecord, LookupError>;
}

/// Unit of work submitted to the task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
pub trait TaskHandle: Send + Sync {
    fn id(&self) -> &str;

    async fn is_complete(&self) -> Result<bool, TaskError>;

    /// `None` until the task has finished, or when it was revoked.
    async fn result(&self) -> Result<Option<serde_json::Value>, TaskError>;
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn submit(
        &self,
        task: Task,
        expires_at: DateTime<Utc>,
    ) -> Result<Box<dyn TaskHandle>, TaskError>;
}

/// Every collaborator the built-in checks need.
#[derive(Clone)]
pub struct Dependencies {
    pub storage: Arc<dyn StorageBackend>,
    pub datastore: Arc<dyn Datastore>,
    pub cache: Arc<dyn Cache>,
    pub users: Arc<dyn UserDirectory>,
    pub tasks: Arc<dyn TaskQueue>,
}

impl Dependencies {
    /// All-in-memory wiring, healthy by default.
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            datastore: Arc::new(MemoryDatastore::new()),
            cache: Arc::new(MemoryCache::new()),
            users: Arc::new(MemoryUserDirectory::new()),
            tasks: Arc::new(MemoryTaskQueue::new()),
        }
    }
}
