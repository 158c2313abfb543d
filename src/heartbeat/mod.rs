// src/heartbeat/mod.rs
mod check;
mod context;
mod dispatcher;
mod error;
mod registry;
mod report;

pub use check::CheckFunction;
pub use context::RequestContext;
pub use dispatcher::Dispatcher;
pub use error::{ConfigurationError, DispatchError};
pub use registry::{CheckRegistry, NAMESPACE};
pub use report::{CheckResult, CheckStatus, HealthReport, OK_MESSAGE};
