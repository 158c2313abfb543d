// src/heartbeat/dispatcher.rs
use super::{
    CheckFunction, CheckRegistry, CheckResult, ConfigurationError, DispatchError, HealthReport,
    RequestContext,
};
use crate::config::{Config, FaultPolicy};
use crate::metrics::{MetricsCollector, Timer};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs the configured check set for one request and assembles the report.
pub struct Dispatcher {
    registry: Arc<CheckRegistry>,
    checks: Vec<String>,
    extended_checks: Vec<String>,
    fault_policy: FaultPolicy,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CheckRegistry>,
        config: &Config,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            registry,
            checks: config.checks.clone(),
            extended_checks: config.extended_checks.clone(),
            fault_policy: config.dispatcher.fault_policy,
            metrics,
        }
    }

    pub fn with_checks(
        registry: Arc<CheckRegistry>,
        checks: Vec<String>,
        extended_checks: Vec<String>,
    ) -> Self {
        Self {
            registry,
            checks,
            extended_checks,
            fault_policy: FaultPolicy::default(),
            metrics: None,
        }
    }

    pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    /// Base checks, followed by the extended ones when requested.
    pub fn check_set(&self, want_extended: bool) -> Vec<&str> {
        let extended: &[String] = if want_extended {
            &self.extended_checks
        } else {
            &[]
        };

        self.checks
            .iter()
            .chain(extended.iter())
            .map(String::as_str)
            .collect()
    }

    /// Resolve both configured lists up front.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.registry.validate(&self.check_set(true))
    }

    /// Every identifier is resolved before the first check runs, so a bad
    /// entry aborts the dispatch without side effects on any dependency.
    #[tracing::instrument(skip_all, fields(request_id = %ctx.request_id, extended = want_extended))]
    pub async fn run(
        &self,
        ctx: &RequestContext,
        want_extended: bool,
    ) -> Result<HealthReport, DispatchError> {
        let timer = Timer::new();

        let checks = match self.registry.resolve_all(&self.check_set(want_extended)) {
            Ok(checks) => checks,
            Err(e) => {
                error!("Heartbeat misconfigured: {}", e);
                self.record_dispatch(want_extended, "misconfigured", &timer);
                return Err(e.into());
            }
        };

        let mut report = HealthReport::new();
        for check in checks {
            let result = match self.invoke(check.as_ref(), ctx).await {
                Ok(result) => result,
                Err(e) => {
                    self.record_dispatch(want_extended, "faulted", &timer);
                    return Err(e);
                }
            };

            if let Some(previous) = report.insert(result) {
                debug!(check = check.name(), previous = ?previous, "check result overwritten");
            }
        }

        let outcome = if report.is_healthy() { "healthy" } else { "unhealthy" };
        self.record_dispatch(want_extended, outcome, &timer);
        info!(
            "Heartbeat complete: {} checks, {} failing, took {:?}",
            report.len(),
            report.failing().count(),
            timer.elapsed()
        );

        Ok(report)
    }

    async fn invoke(
        &self,
        check: &dyn CheckFunction,
        ctx: &RequestContext,
    ) -> Result<CheckResult, DispatchError> {
        let timer = Timer::new();

        let result = match AssertUnwindSafe(check.check(ctx)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => self.fault(check.name(), format!("{:#}", e))?,
            Err(panic) => self.fault(check.name(), panic_message(panic))?,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_check(&result.name, result.ok, timer.elapsed());
        }

        if result.ok {
            debug!(check = %result.name, "check passed in {:?}", timer.elapsed());
        } else {
            warn!(check = %result.name, "check failed: {}", result.message);
        }

        Ok(result)
    }

    fn fault(&self, name: &str, message: String) -> Result<CheckResult, DispatchError> {
        error!(check = name, "check faulted: {}", message);

        match self.fault_policy {
            FaultPolicy::Isolate => Ok(CheckResult::failed(name, message)),
            FaultPolicy::Propagate => Err(DispatchError::CheckFaulted {
                name: name.to_string(),
                message,
            }),
        }
    }

    fn record_dispatch(&self, extended: bool, outcome: &str, timer: &Timer) {
        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(extended, outcome, timer.elapsed());
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    format!("check panicked: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        ok: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CheckFunction for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.ok {
                Ok(CheckResult::ok(self.name))
            } else {
                Ok(CheckResult::failed(self.name, "down"))
            }
        }
    }

    struct Faulty;

    #[async_trait]
    impl CheckFunction for Faulty {
        fn name(&self) -> &str {
            "faulty"
        }

        async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
            anyhow::bail!("serializer exploded")
        }
    }

    struct Panicky;

    #[async_trait]
    impl CheckFunction for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn check(&self, _ctx: &RequestContext) -> anyhow::Result<CheckResult> {
            panic!("index out of range")
        }
    }

    fn setup() -> (Arc<CheckRegistry>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CheckRegistry::new();
        registry
            .register(".t", "up", Arc::new(Fixed { name: "up", ok: true, calls: calls.clone() }))
            .register(".t", "down", Arc::new(Fixed { name: "down", ok: false, calls: calls.clone() }))
            .register(".t", "faulty", Arc::new(Faulty))
            .register(".t", "panicky", Arc::new(Panicky));
        (Arc::new(registry), calls)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_check_set_concatenates_in_order() {
        let (registry, _) = setup();
        let dispatcher = Dispatcher::with_checks(registry, ids(&[".t.up"]), ids(&[".t.down", ".t.up"]));

        assert_eq!(dispatcher.check_set(false), vec![".t.up"]);
        assert_eq!(dispatcher.check_set(true), vec![".t.up", ".t.down", ".t.up"]);
    }

    #[tokio::test]
    async fn test_extended_only_when_requested() {
        let (registry, _) = setup();
        let dispatcher = Dispatcher::with_checks(registry, ids(&[".t.up"]), ids(&[".t.down"]));
        let ctx = RequestContext::new();

        let base = dispatcher.run(&ctx, false).await.unwrap();
        assert_eq!(base.len(), 1);
        assert!(base.is_healthy());

        let extended = dispatcher.run(&ctx, true).await.unwrap();
        assert_eq!(extended.len(), 2);
        assert!(!extended.get("down").unwrap().status);
    }

    #[tokio::test]
    async fn test_bad_identifier_runs_nothing() {
        let (registry, calls) = setup();
        let dispatcher =
            Dispatcher::with_checks(registry, ids(&[".t.up", ".t.missing"]), Vec::new());

        let err = dispatcher.run(&RequestContext::new(), false).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Configuration(ConfigurationError::CallableNotDefined { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.validate().is_err());
    }

    #[tokio::test]
    async fn test_faults_are_isolated_by_default() {
        let (registry, _) = setup();
        let dispatcher = Dispatcher::with_checks(
            registry,
            ids(&[".t.faulty", ".t.panicky", ".t.up"]),
            Vec::new(),
        );

        let report = dispatcher.run(&RequestContext::new(), false).await.unwrap();
        assert_eq!(report.len(), 3);

        let faulty = report.get("faulty").unwrap();
        assert!(!faulty.status);
        assert_eq!(faulty.message, "serializer exploded");

        let panicky = report.get("panicky").unwrap();
        assert!(!panicky.status);
        assert!(panicky.message.contains("index out of range"));

        assert!(report.get("up").unwrap().status);
    }

    #[tokio::test]
    async fn test_propagate_policy_aborts() {
        let (registry, calls) = setup();
        let dispatcher = Dispatcher::with_checks(
            registry,
            ids(&[".t.faulty", ".t.up"]),
            Vec::new(),
        )
        .with_fault_policy(FaultPolicy::Propagate);

        let err = dispatcher.run(&RequestContext::new(), false).await.unwrap_err();
        match err {
            DispatchError::CheckFaulted { name, message } => {
                assert_eq!(name, "faulty");
                assert_eq!(message, "serializer exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeated_check_runs_twice_reports_once() {
        let (registry, calls) = setup();
        let dispatcher =
            Dispatcher::with_checks(registry, ids(&[".t.up", ".t.up"]), Vec::new());

        let report = dispatcher.run(&RequestContext::new(), false).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
