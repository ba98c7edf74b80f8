//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate. Output is plain text or one JSON object per line.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Error type for tracing setup.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// Directive that failed.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber was already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Build the filter: `RUST_LOG` if set, else `order_engine=<level>`.
///
/// # Errors
///
/// Returns `InvalidFilter` if the configured level is not a valid directive.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TracingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = format!("order_engine={}", config.level);
    EnvFilter::try_new(&directive).map_err(|e| TracingError::InvalidFilter {
        directive,
        message: e.to_string(),
    })
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.format == "json" {
        builder
            .json()
            .with_current_span(config.include_spans)
            .try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TracingError::SubscriberError(e.to_string()))
}
