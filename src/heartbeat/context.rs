// src/heartbeat/context.rs
use uuid::Uuid;

/// The inbound request as seen by check functions: its query parameters and
/// an id for log correlation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    params: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            params: Vec::new(),
        }
    }

    /// Build from a raw query string such as `extended&username=alice`.
    pub fn from_query(query: Option<&str>) -> Self {
        let params = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            request_id: Uuid::new_v4(),
            params,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// First value for `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Presence test; `?extended` and `?extended=0` both count.
    pub fn has_param(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    pub fn wants_extended(&self) -> bool {
        self.has_param("extended")
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        let ctx = RequestContext::from_query(Some("extended&username=al%20ice&username=bob"));
        assert!(ctx.wants_extended());
        assert_eq!(ctx.param("username"), Some("al ice"));
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn test_extended_is_presence_based() {
        assert!(RequestContext::from_query(Some("extended=false")).wants_extended());
        assert!(!RequestContext::from_query(Some("username=x")).wants_extended());
        assert!(!RequestContext::from_query(None).wants_extended());
    }
}
