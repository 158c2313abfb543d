// src/checks/user.rs
use crate::backends::UserDirectory;
use crate::heartbeat::{CheckFunction, CheckResult, RequestContext};
use async_trait::async_trait;
use std::sync::Arc;

pub const USERNAME_PARAM: &str = "username";

pub struct UserExistsCheck {
    users: Arc<dyn UserDirectory>,
}

impl UserExistsCheck {
    pub const NAME: &'static str = "user-exists";

    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CheckFunction for UserExistsCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self, ctx: &RequestContext) -> anyhow::Result<CheckResult> {
        // A missing parameter is looked up as the empty name.
        let username = ctx.param(USERNAME_PARAM).unwrap_or_default();

        Ok(match self.users.get_by_username(username).await {
            Ok(_) => CheckResult::ok(Self::NAME),
            Err(e) => CheckResult::failed(Self::NAME, e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryUserDirectory;

    fn check() -> UserExistsCheck {
        UserExistsCheck::new(Arc::new(MemoryUserDirectory::with_users([
            "staff", "dup", "dup",
        ])))
    }

    #[tokio::test]
    async fn test_exactly_one_match() {
        let ctx = RequestContext::new().with_param("username", "staff");
        assert!(check().check(&ctx).await.unwrap().ok);
    }

    #[tokio::test]
    async fn test_zero_or_many_matches_fail() {
        let missing = RequestContext::new().with_param("username", "ghost");
        let result = check().check(&missing).await.unwrap();
        assert!(!result.ok);
        assert!(result.message.contains("does not exist"));

        let dup = RequestContext::new().with_param("username", "dup");
        let result = check().check(&dup).await.unwrap();
        assert!(!result.ok);
        assert!(result.message.contains("expected exactly one"));
    }

    #[tokio::test]
    async fn test_missing_parameter_fails() {
        assert!(!check().check(&RequestContext::new()).await.unwrap().ok);
    }
}
