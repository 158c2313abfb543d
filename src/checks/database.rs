// src/checks/database.rs
use crate::backends::Datastore;
use crate::heartbeat::{CheckFunction, CheckResult, RequestContext};
use async_trait::async_trait;
use std::sync::Arc;

const PROBE_QUERY: &str = "SELECT CURRENT_DATE";

pub struct DatabaseCheck {
    datastore: Arc<dyn Datastore>,
}

impl DatabaseCheck {
    pub const NAME: &'static str = "database-health";

    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }
}

#[async_trait]
impl CheckFunction for DatabaseCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
        Ok(match self.datastore.fetch_one(PROBE_QUERY).await {
            Ok(Some(_)) => CheckResult::ok(Self::NAME),
            Ok(None) => CheckResult::failed(Self::NAME, "query returned no rows"),
            Err(e) => CheckResult::failed(Self::NAME, e.to_string()),
        })
    }
}
