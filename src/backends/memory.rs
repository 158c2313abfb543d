// src/backends/memory.rs
//
// In-process collaborators. Each one has an availability switch so outages
// can be simulated without a real service behind it.
use super::{
    Cache, CacheError, Datastore, DatabaseError, HeartbeatFailure, LookupError, Row,
    StorageBackend, Task, TaskError, TaskHandle, TaskQueue, UserDirectory, UserRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub struct MemoryStorage {
    failure: RwLock<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            failure: RwLock::new(None),
        }
    }

    pub async fn set_unhealthy(&self, reason: impl Into<String>) {
        *self.failure.write().await = Some(reason.into());
    }

    pub async fn set_healthy(&self) {
        *self.failure.write().await = None;
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn heartbeat(&self) -> Result<(), HeartbeatFailure> {
        match self.failure.read().await.as_ref() {
            Some(reason) => Err(HeartbeatFailure(reason.clone())),
            None => Ok(()),
        }
    }
}

pub struct MemoryDatastore {
    available: AtomicBool,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn fetch_one(&self, sql: &str) -> Result<Option<Row>, DatabaseError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("connection refused".to_string()));
        }

        let statement = sql.trim().trim_end_matches(';');
        if statement.eq_ignore_ascii_case("SELECT CURRENT_DATE") {
            let today = Utc::now().date_naive().to_string();
            Ok(Some(vec![serde_json::Value::String(today)]))
        } else if statement.eq_ignore_ascii_case("SELECT 1") {
            Ok(Some(vec![serde_json::Value::from(1)]))
        } else {
            Err(DatabaseError::Query(format!("unsupported statement: {}", sql)))
        }
    }
}

pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
    available: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), CacheError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("no cache node reachable".to_string()))
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.ensure_available()?;
        let expires = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.ensure_available()?;
        // Expired entries are dropped lazily on read.
        self.entries
            .remove_if(key, |_, (_, expires)| *expires <= Instant::now());
        Ok(self.entries.get(key).map(|entry| entry.value().0.clone()))
    }
}

pub struct MemoryUserDirectory {
    users: DashMap<String, Vec<UserRecord>>,
    next_id: AtomicU64,
    available: AtomicBool,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    pub fn with_users<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let directory = Self::new();
        for username in usernames {
            directory.add_user(username);
        }
        directory
    }

    /// Duplicate usernames are kept so lookups can be ambiguous.
    pub fn add_user(&self, username: impl Into<String>) -> UserRecord {
        let username = username.into();
        let record = UserRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            username: username.clone(),
        };
        self.users.entry(username).or_default().push(record.clone());
        record
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for MemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_by_username(&self, username: &str) -> Result<UserRecord, LookupError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(LookupError::Backend("directory offline".to_string()));
        }

        let matches = self
            .users
            .get(username)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        match matches.len() {
            0 => Err(LookupError::NotFound(username.to_string())),
            1 => Ok(matches[0].clone()),
            count => Err(LookupError::MultipleFound {
                username: username.to_string(),
                count,
            }),
        }
    }
}

#[derive(Debug, Clone)]
enum TaskState {
    Pending,
    Finished(serde_json::Value),
    Revoked,
}

/// Runs submitted tasks on the tokio runtime after a fixed latency.
pub struct MemoryTaskQueue {
    tasks: Arc<DashMap<String, TaskState>>,
    latency: Duration,
    result: serde_json::Value,
    available: AtomicBool,
    stalled: Arc<AtomicBool>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            latency: Duration::from_millis(10),
            result: serde_json::Value::Bool(true),
            available: AtomicBool::new(true),
            stalled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Value every task finishes with.
    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = result;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// While stalled, no worker picks tasks up.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn pending(&self) -> usize {
        self.tasks
            .iter()
            .filter(|entry| matches!(entry.value(), TaskState::Pending))
            .count()
    }

    /// Tasks whose handles are still alive, in any state.
    pub fn tracked(&self) -> usize {
        self.tasks.len()
    }
}

impl Default for MemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn submit(
        &self,
        task: Task,
        expires_at: DateTime<Utc>,
    ) -> Result<Box<dyn TaskHandle>, TaskError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TaskError::BrokerUnavailable("connection refused".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.tasks.insert(id.clone(), TaskState::Pending);
        tracing::debug!(task = %task.name, %id, "task submitted");

        let tasks = self.tasks.clone();
        let stalled = self.stalled.clone();
        let latency = self.latency;
        let result = self.result.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            if stalled.load(Ordering::SeqCst) {
                return;
            }
            let state = if Utc::now() > expires_at {
                TaskState::Revoked
            } else {
                TaskState::Finished(result)
            };
            // The record is gone once its handle is dropped.
            if let Some(mut entry) = tasks.get_mut(&task_id) {
                *entry = state;
            }
        });

        Ok(Box::new(MemoryTaskHandle {
            id,
            tasks: self.tasks.clone(),
        }))
    }
}

struct MemoryTaskHandle {
    id: String,
    tasks: Arc<DashMap<String, TaskState>>,
}

impl MemoryTaskHandle {
    fn state(&self) -> Result<TaskState, TaskError> {
        self.tasks
            .get(&self.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TaskError::Backend(format!("no record of task {}", self.id)))
    }
}

impl Drop for MemoryTaskHandle {
    fn drop(&mut self) {
        self.tasks.remove(&self.id);
    }
}

#[async_trait]
impl TaskHandle for MemoryTaskHandle {
    fn id(&self) -> &str {
        &self.id
    }

    async fn is_complete(&self) -> Result<bool, TaskError> {
        Ok(!matches!(self.state()?, TaskState::Pending))
    }

    async fn result(&self) -> Result<Option<serde_json::Value>, TaskError> {
        match self.state()? {
            TaskState::Finished(value) => Ok(Some(value)),
            TaskState::Pending | TaskState::Revoked => Ok(None),
        }
    }
}
