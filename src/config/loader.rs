//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, Environment};
use crate::config::validation::{validate_config, ValidationError};

/// Connection string for the remote document store tier.
pub const ENV_REMOTE_URL: &str = "DOCUMENT_STORE_URL";
/// API key for the remote document store tier.
pub const ENV_REMOTE_API_KEY: &str = "DOCUMENT_STORE_API_KEY";
/// Override for the users file path.
pub const ENV_USERS_FILE: &str = "USERS_FILE";
/// Deployment environment override.
pub const ENV_APP_ENV: &str = "APP_ENV";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, reason } => write!(f, "Invalid {}: {}", key, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: AppConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
    finalize(config, |key| std::env::var(key).ok())
}

/// Build configuration from defaults plus environment only.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    finalize(AppConfig::default(), |key| std::env::var(key).ok())
}

fn finalize<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides on top of file values.
///
/// Empty variables are treated as unset: a missing connection string is a
/// valid configuration that simply skips the remote tier.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_REMOTE_URL) {
        config.store.remote.url = Some(url);
    }
    if let Some(key) = get(ENV_REMOTE_API_KEY) {
        config.store.remote.api_key = Some(key);
    }
    if let Some(path) = get(ENV_USERS_FILE) {
        config.store.data_path = Some(path);
    }
    if let Some(env) = get(ENV_APP_ENV) {
        config.environment = env
            .parse::<Environment>()
            .map_err(|reason| ConfigError::Env { key: ENV_APP_ENV, reason })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_remote_url() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[(ENV_REMOTE_URL, "http://127.0.0.1:9999"), (ENV_APP_ENV, "production")]),
        )
        .unwrap();
        assert_eq!(config.store.remote.url.as_deref(), Some("http://127.0.0.1:9999"));
        assert!(config.environment.is_production());
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, lookup_from(&[(ENV_REMOTE_URL, "  ")])).unwrap();
        assert!(config.store.remote.url.is_none());
    }

    #[test]
    fn test_bad_environment_name() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, lookup_from(&[(ENV_APP_ENV, "staging")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_APP_ENV));
    }

    #[test]
    fn test_load_config_reports_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hashing]\ncost = 40").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
