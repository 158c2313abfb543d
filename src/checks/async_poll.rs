// src/checks/async_poll.rs
use crate::backends::{Task, TaskError, TaskHandle, TaskQueue};
use crate::heartbeat::{CheckFunction, CheckResult, RequestContext};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::debug;

/// Name of the no-op task whose result must be `true`.
pub const SAMPLE_TASK: &str = "heartbeat.sample_task";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Round-trips a task through the background queue within a deadline.
pub struct AsyncPollCheck {
    tasks: Arc<dyn TaskQueue>,
    timeout: Duration,
    poll_interval: Duration,
}

#[derive(Debug)]
enum PollOutcome {
    Succeeded(Duration),
    Expired,
    Faulted(TaskError),
}

impl AsyncPollCheck {
    pub const NAME: &'static str = "async-poll";

    pub fn new(tasks: Arc<dyn TaskQueue>) -> Self {
        Self {
            tasks,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn poll(&self) -> anyhow::Result<PollOutcome> {
        let started = Instant::now();
        let deadline = started
            .checked_add(self.timeout)
            .ok_or_else(|| anyhow!("poll timeout {:?} is out of range", self.timeout))?;
        let expires_at = chrono::Duration::from_std(self.timeout)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| anyhow!("task expiry {:?} is out of range", self.timeout))?;

        // Submission counts against the deadline too; a hung broker expires.
        let outcome = match timeout_at(deadline, self.submit_and_wait(expires_at)).await {
            Ok(Ok(())) => PollOutcome::Succeeded(started.elapsed()),
            Ok(Err(e)) => PollOutcome::Faulted(e),
            Err(_) => PollOutcome::Expired,
        };
        Ok(outcome)
    }

    async fn submit_and_wait(&self, expires_at: DateTime<Utc>) -> Result<(), TaskError> {
        let handle = self.tasks.submit(Task::new(SAMPLE_TASK), expires_at).await?;
        debug!(task_id = handle.id(), "sample task submitted, polling until {}", expires_at);
        self.wait_for_success(handle.as_ref()).await
    }

    /// Resolves once the task has finished with the success sentinel.
    async fn wait_for_success(&self, handle: &dyn TaskHandle) -> Result<(), TaskError> {
        loop {
            if handle.is_complete().await?
                && handle.result().await? == Some(serde_json::Value::Bool(true))
            {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl CheckFunction for AsyncPollCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
        Ok(match self.poll().await? {
            PollOutcome::Succeeded(elapsed) => {
                let message = serde_json::json!({ "time": elapsed.as_secs_f64() });
                CheckResult::ok_with(Self::NAME, message.to_string())
            }
            PollOutcome::Expired => CheckResult::failed(Self::NAME, "expired"),
            PollOutcome::Faulted(e) => CheckResult::failed(Self::NAME, e.to_string()),
        })
    }
}
