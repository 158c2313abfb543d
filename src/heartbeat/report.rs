// src/heartbeat/report.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OK_MESSAGE: &str = "OK";

/// Outcome of one check function invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
    pub message: String,
}

impl CheckResult {
    pub fn ok(name: impl Into<String>) -> Self {
        Self::ok_with(name, OK_MESSAGE)
    }

    pub fn ok_with(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            message: message.into(),
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatus {
    pub status: bool,
    pub message: String,
}

/// Check name to status, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthReport {
    entries: BTreeMap<String, CheckStatus>,
}

impl HealthReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later results for the same name replace earlier ones.
    pub fn insert(&mut self, result: CheckResult) -> Option<CheckStatus> {
        self.entries.insert(
            result.name,
            CheckStatus {
                status: result.ok,
                message: result.message,
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&CheckStatus> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_healthy(&self) -> bool {
        self.entries.values().all(|s| s.status)
    }

    pub fn failing(&self) -> impl Iterator<Item = (&str, &CheckStatus)> {
        self.entries
            .iter()
            .filter(|(_, s)| !s.status)
            .map(|(name, s)| (name.as_str(), s))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CheckStatus)> {
        self.entries.iter().map(|(name, s)| (name.as_str(), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_serializes_as_flat_object() {
        let mut report = HealthReport::new();
        report.insert(CheckResult::ok("cache-set"));
        report.insert(CheckResult::failed("cache-get", "value check failed"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cache-set": {"status": true, "message": "OK"},
                "cache-get": {"status": false, "message": "value check failed"},
            })
        );
        assert!(!report.is_healthy());
        assert_eq!(report.failing().count(), 1);
    }

    #[test]
    fn test_empty_report_is_healthy() {
        assert!(HealthReport::new().is_healthy());
    }

    proptest! {
        #[test]
        fn prop_last_write_wins(
            results in prop::collection::vec(("[a-d]", any::<bool>(), "[a-z]{0,8}"), 0..32)
        ) {
            let mut report = HealthReport::new();
            for (name, ok, message) in &results {
                report.insert(CheckResult { name: name.clone(), ok: *ok, message: message.clone() });
            }

            let distinct: std::collections::HashSet<_> = results.iter().map(|r| &r.0).collect();
            prop_assert_eq!(report.len(), distinct.len());

            for name in distinct {
                let (_, ok, message) = results.iter().rev().find(|r| &r.0 == name).unwrap();
                let entry = report.get(name).unwrap();
                prop_assert_eq!(entry.status, *ok);
                prop_assert_eq!(&entry.message, message);
            }
        }
    }
}
