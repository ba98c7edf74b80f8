//! Configuration for the order engine.
//!
//! YAML with `${VAR}` / `${VAR:-default}` interpolation. Every section is
//! optional; missing keys take their defaults.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::config::load_config;
//!
//! // ORDER_ENGINE_CONFIG, else ./config.yaml, else built-in defaults
//! let config = load_config(None)?;
//!
//! let config = load_config(Some("deploy/order-engine.yaml"))?;
//! println!("tick interval: {:?}", config.engine.tick_poll_interval());
//! ```

mod admission;
mod engine;
mod iceberg;
mod observability;
mod retry;
mod triggers;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use admission::AdmissionConfig;
pub use engine::EngineConfig;
pub use iceberg::IcebergConfig;
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use retry::RetryConfig;
pub use triggers::TriggersConfig;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ORDER_ENGINE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task intervals and channel sizes.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Trigger evaluation.
    #[serde(default)]
    pub triggers: TriggersConfig,
    /// Iceberg slicing.
    #[serde(default)]
    pub iceberg: IcebergConfig,
    /// Admission rules.
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// Execution adapter retries.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// With `path` unset, reads `$ORDER_ENGINE_CONFIG` or `config.yaml`; when
/// neither exists the defaults are used.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let explicit = path
        .map(str::to_string)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.is_empty()));

    let path = match explicit {
        Some(p) => p,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH.to_string(),
        None => {
            tracing::debug!("No config file found, using defaults");
            let config = Config::default();
            validate_config(&config)?;
            return Ok(config);
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    if interpolated.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.engine.tick_poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "engine.tick_poll_interval_ms must be positive".to_string(),
        ));
    }

    if config.engine.expiry_sweep_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "engine.expiry_sweep_interval_ms must be positive".to_string(),
        ));
    }

    if config.engine.execution_channel_capacity == 0 || config.engine.event_channel_capacity == 0
    {
        return Err(ConfigError::ValidationError(
            "engine channel capacities must be positive".to_string(),
        ));
    }

    if config.iceberg.max_slices == 0 {
        return Err(ConfigError::ValidationError(
            "iceberg.max_slices must be positive".to_string(),
        ));
    }

    if config.admission.max_quantity <= 0 {
        return Err(ConfigError::ValidationError(
            "admission.max_quantity must be positive".to_string(),
        ));
    }
    config.admission.to_limits()?;

    let retry = &config.retry;
    if retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "retry.backoff_multiplier must be at least 1.0".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&retry.jitter_factor) {
        return Err(ConfigError::ValidationError(
            "retry.jitter_factor must be between 0.0 and 1.0".to_string(),
        ));
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(ConfigError::ValidationError(
            "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
        ));
    }

    let valid_formats = ["json", "text"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    if config.observability.metrics.enabled
        && config
            .observability
            .metrics
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        return Err(ConfigError::ValidationError(format!(
            "observability.metrics.listen_addr is not a socket address: {}",
            config.observability.metrics.listen_addr
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{Exchange, Quantity};

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.engine.tick_poll_interval_ms, 500);
        assert!(config.engine.reconcile_on_startup);
        assert_eq!(config.triggers.max_tick_age_ms, 5_000);
        assert_eq!(config.iceberg.max_slices, 500);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.observability.logging.level, "info");
        assert!(!config.observability.metrics.enabled);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_minimal_config() {
        let yaml = r"
engine:
  tick_poll_interval_ms: 250
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };
        assert_eq!(config.engine.tick_poll_interval_ms, 250);
        assert_eq!(config.engine.expiry_sweep_interval_ms, 1_000);
        assert_eq!(config.iceberg.max_slices, 500);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = load_config_from_string("").unwrap();
        assert_eq!(config.retry.initial_backoff_ms, 100);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "level: ${ORDER_ENGINE_CONFIG_TEST_NONEXISTENT_VAR:-warn}";
        let result = interpolate_env_vars(input);

        assert_eq!(result, "level: warn");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);

        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "listen_addr: ${ORDER_ENGINE_CONFIG_TEST_UNLIKELY_TO_EXIST}";
        let result = interpolate_env_vars(input);

        assert_eq!(result, "listen_addr: ");
    }

    #[test]
    fn test_admission_limits_conversion() {
        let yaml = r"
admission:
  allowed_exchanges: [NSE, NFO]
  max_quantity: 5000
";
        let config = load_config_from_string(yaml).unwrap();
        let limits = config.admission.to_limits().unwrap();

        assert_eq!(limits.allowed_exchanges, vec![Exchange::Nse, Exchange::Nfo]);
        assert_eq!(limits.max_quantity, Quantity::from_i64(5_000));
    }

    #[test]
    fn test_validation_unknown_exchange() {
        let yaml = r"
admission:
  allowed_exchanges: [NYSE]
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for unknown exchange");
        };
        assert!(err.to_string().contains("admission"));
    }

    #[test]
    fn test_validation_zero_tick_interval() {
        let yaml = r"
engine:
  tick_poll_interval_ms: 0
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero interval");
        };
        assert!(err.to_string().contains("tick_poll_interval_ms"));
    }

    #[test]
    fn test_validation_invalid_jitter() {
        let yaml = r"
retry:
  jitter_factor: 1.5
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for jitter");
        };
        assert!(err.to_string().contains("jitter_factor"));
    }

    #[test]
    fn test_validation_invalid_log_format() {
        let yaml = r"
observability:
  logging:
    format: pretty
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for log format");
        };
        assert!(err.to_string().contains("format"));
    }

    #[test]
    fn test_retry_section_to_policy() {
        let yaml = r"
retry:
  max_attempts: 2
  initial_backoff_ms: 10
  max_backoff_ms: 40
";
        let config = load_config_from_string(yaml).unwrap();
        let policy = config.retry.to_policy();

        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.initial_backoff, std::time::Duration::from_millis(10));
        assert_eq!(policy.max_backoff, std::time::Duration::from_millis(40));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "iceberg:\n  max_slices: 50\n").unwrap();

        let config = load_config(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.iceberg.max_slices, 50);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = load_config(Some("/nonexistent/order-engine.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
