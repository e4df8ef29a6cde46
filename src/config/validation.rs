//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Returns every error found,
//! not just the first, so an operator can fix a config file in one pass.

use std::net::SocketAddr;

use crate::config::schema::AppConfig;
use crate::security::password::{MAX_COST, MIN_COST};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("hashing.cost must be within 4..=31, got {0}")]
    HashCost(u32),

    #[error("retries.{field}: {reason}")]
    Retry { field: &'static str, reason: String },

    #[error("circuit_breaker.failure_threshold must be greater than zero")]
    FailureThreshold,

    #[error("pool.{0} must be greater than zero")]
    Pool(&'static str),

    #[error("rate_limit.{0} must be greater than zero")]
    RateLimit(&'static str),

    #[error("store.remote.url '{url}' is invalid: {reason}")]
    RemoteUrl { url: String, reason: String },

    #[error("store.demo_users[{0}] needs a non-empty email and password")]
    DemoUser(usize),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !(MIN_COST..=MAX_COST).contains(&config.hashing.cost) {
        errors.push(ValidationError::HashCost(config.hashing.cost));
    }

    let retries = &config.retries;
    if retries.max_retries == 0 {
        errors.push(ValidationError::Retry {
            field: "max_retries",
            reason: "must allow at least one attempt".into(),
        });
    }
    if retries.multiplier.is_nan() || retries.multiplier < 1.0 {
        errors.push(ValidationError::Retry {
            field: "multiplier",
            reason: format!("must be >= 1.0, got {}", retries.multiplier),
        });
    }
    if retries.initial_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::Retry {
            field: "initial_delay_ms",
            reason: "must not exceed max_delay_ms".into(),
        });
    }
    if retries.jitter_percent > 100 {
        errors.push(ValidationError::Retry {
            field: "jitter_percent",
            reason: "must be at most 100".into(),
        });
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::FailureThreshold);
    }

    if config.pool.max_connections == 0 {
        errors.push(ValidationError::Pool("max_connections"));
    }
    if config.pool.health_check_interval_secs == 0 {
        errors.push(ValidationError::Pool("health_check_interval_secs"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::RateLimit("max_requests"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::RateLimit("window_secs"));
        }
    }

    if let Some(raw) = &config.store.remote.url {
        match url::Url::parse(raw) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => errors.push(ValidationError::RemoteUrl {
                url: raw.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            }),
            Err(e) => errors.push(ValidationError::RemoteUrl {
                url: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    for (i, demo) in config.store.demo_users.iter().enumerate() {
        if demo.email.trim().is_empty() || demo.password.is_empty() {
            errors.push(ValidationError::DemoUser(i));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DemoUserConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.hashing.cost = 2;
        config.retries.multiplier = 0.5;
        config.circuit_breaker.failure_threshold = 0;
        config.store.remote.url = Some("mongodb://localhost:27017".into());
        config.store.demo_users.push(DemoUserConfig {
            email: " ".into(),
            password: "x".into(),
            name: "Nobody".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::HashCost(2)));
        assert!(errors.contains(&ValidationError::FailureThreshold));
        assert!(errors.contains(&ValidationError::DemoUser(0)));
    }

    #[test]
    fn test_initial_delay_above_max_rejected() {
        let mut config = AppConfig::default();
        config.retries.initial_delay_ms = 10_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Retry { field: "initial_delay_ms", .. }));
    }

    #[test]
    fn test_rate_limit_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.rate_limit.max_requests = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::RateLimit("max_requests")]);

        config.rate_limit.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
