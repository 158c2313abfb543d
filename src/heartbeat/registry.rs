// src/heartbeat/registry.rs
use super::{CheckFunction, ConfigurationError};
use std::collections::HashMap;
use std::sync::Arc;

/// Namespace that relative locators (leading `.`) resolve against.
pub const NAMESPACE: &str = "heartbeat";

/// Maps `<module locator>.<callable>` identifiers to check functions.
///
/// Populated once at startup; lookups never touch anything but the map.
#[derive(Default, Clone)]
pub struct CheckRegistry {
    modules: HashMap<String, HashMap<String, Arc<dyn CheckFunction>>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` as `attribute` inside module `locator`. A relative
    /// locator lands in this crate's namespace. Replaces any previous entry.
    pub fn register(
        &mut self,
        locator: &str,
        attribute: &str,
        check: Arc<dyn CheckFunction>,
    ) -> &mut Self {
        let module = absolute_locator(locator);
        tracing::debug!(module = %module, attribute, check = check.name(), "registering check");
        self.modules
            .entry(module)
            .or_default()
            .insert(attribute.to_string(), check);
        self
    }

    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn CheckFunction>, ConfigurationError> {
        let (locator, attribute) = split_identifier(identifier)?;

        let callables = self
            .modules
            .get(&absolute_locator(locator))
            .ok_or_else(|| ConfigurationError::ModuleNotFound {
                locator: locator.to_string(),
            })?;

        callables
            .get(attribute)
            .cloned()
            .ok_or_else(|| ConfigurationError::CallableNotDefined {
                locator: locator.to_string(),
                attribute: attribute.to_string(),
            })
    }

    /// Resolve every identifier, stopping at the first bad one.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        identifiers: &[S],
    ) -> Result<Vec<Arc<dyn CheckFunction>>, ConfigurationError> {
        identifiers
            .iter()
            .map(|id| self.resolve(id.as_ref()))
            .collect()
    }

    pub fn validate<S: AsRef<str>>(&self, identifiers: &[S]) -> Result<(), ConfigurationError> {
        self.resolve_all(identifiers).map(|_| ())
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

/// Split at the last separator: everything after it is the attribute.
fn split_identifier(identifier: &str) -> Result<(&str, &str), ConfigurationError> {
    let i = identifier
        .rfind('.')
        .ok_or_else(|| ConfigurationError::MissingSeparator(identifier.to_string()))?;
    Ok((&identifier[..i], &identifier[i + 1..]))
}

fn absolute_locator(locator: &str) -> String {
    if locator.starts_with('.') {
        format!("{}{}", NAMESPACE, locator)
    } else {
        locator.to_string()
    }
}
