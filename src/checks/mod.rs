// src/checks/mod.rs
//
// Built-in checks, exposed to configuration as `.checks.<callable>`.
mod async_poll;
mod cache;
mod database;
mod storage;
mod user;

pub use async_poll::{AsyncPollCheck, SAMPLE_TASK};
pub use cache::{CacheGetCheck, CacheSetCheck, CACHE_KEY, CACHE_TTL, CACHE_VALUE};
pub use database::DatabaseCheck;
pub use storage::StorageCheck;
pub use user::UserExistsCheck;

use crate::backends::Dependencies;
use crate::config::AsyncPollConfig;
use crate::heartbeat::CheckRegistry;
use std::sync::Arc;

/// Module locator the built-in checks live under.
pub const MODULE: &str = ".checks";

/// Register every built-in check against `deps`.
pub fn register_builtin(
    registry: &mut CheckRegistry,
    deps: &Dependencies,
    async_poll: &AsyncPollConfig,
) {
    registry
        .register(MODULE, "check_storage", Arc::new(StorageCheck::new(deps.storage.clone())))
        .register(MODULE, "check_database", Arc::new(DatabaseCheck::new(deps.datastore.clone())))
        .register(MODULE, "check_cache_set", Arc::new(CacheSetCheck::new(deps.cache.clone())))
        .register(MODULE, "check_cache_get", Arc::new(CacheGetCheck::new(deps.cache.clone())))
        .register(MODULE, "check_user_exists", Arc::new(UserExistsCheck::new(deps.users.clone())))
        .register(
            MODULE,
            "check_async_poll",
            Arc::new(
                AsyncPollCheck::new(deps.tasks.clone())
                    .with_timeout(async_poll.timeout())
                    .with_poll_interval(async_poll.poll_interval()),
            ),
        );
}

/// A registry holding only the built-in checks.
pub fn builtin_registry(deps: &Dependencies, async_poll: &AsyncPollConfig) -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    register_builtin(&mut registry, deps, async_poll);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_CHECKS, DEFAULT_EXTENDED_CHECKS};

    #[test]
    fn test_default_identifiers_resolve() {
        let registry = builtin_registry(&Dependencies::in_memory(), &AsyncPollConfig::default());
        assert!(registry.validate(DEFAULT_CHECKS).is_ok());
        assert!(registry.validate(DEFAULT_EXTENDED_CHECKS).is_ok());
    }
}
