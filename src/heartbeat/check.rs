// src/heartbeat/check.rs
use super::{CheckResult, RequestContext};
use async_trait::async_trait;

/// A probe against one dependency.
///
/// Expected failures of the dependency must come back as
/// `Ok(CheckResult { ok: false, .. })`. An `Err` (or a panic) is an
/// unexpected fault and is handled by the dispatcher's fault policy.
#[async_trait]
pub trait CheckFunction: Send + Sync {
    /// Name the result is reported under.
    fn name(&self) -> &str;

    async fn check(&self, ctx: &RequestContext) -> anyhow::Result<CheckResult>;
}
