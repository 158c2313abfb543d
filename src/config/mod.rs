// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

const ENV_PREFIX: &str = "HEARTBEAT";

/// Load configuration from a file (YAML or JSON), then apply
/// `HEARTBEAT__*` environment overrides on top.
///
/// A missing file is not an error; defaults are used instead.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let file_config = if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let contents = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        parse_config(path, &contents)?
    } else {
        tracing::info!("No config file at {}, using defaults", path.display());
        Config::default()
    };

    let config = apply_env_overrides(file_config)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let ext = path.extension().and_then(|s| s.to_str());
    let config = if ext == Some("yaml") || ext == Some("yml") {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}

fn apply_env_overrides(base: Config) -> Result<Config> {
    let env = ::config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("checks")
        .with_list_parse_key("extended_checks")
        .with_list_parse_key("backends.users")
        .try_parsing(true);

    ::config::Config::builder()
        .add_source(::config::Config::try_from(&base).context("Failed to layer config")?)
        .add_source(env)
        .build()
        .context("Failed to read environment overrides")?
        .try_deserialize()
        .context("Failed to apply environment overrides")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.checks.len(), 4);
        assert_eq!(config.extended_checks.len(), 2);
        assert_eq!(config.dispatcher.fault_policy, FaultPolicy::Isolate);
    }

    #[test]
    fn test_parse_yaml_keeps_defaults_for_missing_sections() {
        let yaml = r#"
checks:
  - .checks.check_database
async_poll:
  timeout_secs: 10
dispatcher:
  fault_policy: propagate
"#;
        let config = parse_config(&PathBuf::from("heartbeat.yaml"), yaml).unwrap();
        assert_eq!(config.checks, vec![".checks.check_database".to_string()]);
        assert_eq!(config.extended_checks.len(), 2);
        assert_eq!(config.async_poll.timeout_secs, 10);
        assert_eq!(config.async_poll.poll_interval_ms, 250);
        assert_eq!(config.dispatcher.fault_policy, FaultPolicy::Propagate);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"server": {"port": 9000}, "backends": {"users": ["alice"]}}"#;
        let config = parse_config(&PathBuf::from("heartbeat.json"), json).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.path, "/heartbeat");
        assert_eq!(config.backends.users, vec!["alice".to_string()]);
    }

    #[test]
    fn test_validate_rejects_bad_poll_settings() {
        let mut config = Config::default();
        config.async_poll.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.async_poll.timeout_secs = 1;
        config.async_poll.poll_interval_ms = 1000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.async_poll.timeout_secs = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.async_poll.timeout_secs = MAX_POLL_TIMEOUT_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_identifier() {
        let mut config = Config::default();
        config.extended_checks.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let config = load_config("/nonexistent/heartbeat.yaml").await.unwrap();
        assert_eq!(config.server.path, "/heartbeat");
    }
}
