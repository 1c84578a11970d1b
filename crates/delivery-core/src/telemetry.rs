//! Tracing initialisation for services embedding the verifier.
//!
//! Call [`init_tracing_from`] once at program start with the service's
//! [`VerifierConfig`], or [`init_tracing`] for a plain level. `RUST_LOG`
//! overrides the configured filter when set.
//!
//! Subsequent calls are silently ignored (the global subscriber can only be
//! set once per process).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigError, VerifierConfig};

/// Parse `EnvFilter` directives such as `"info,delivery_core=debug"`.
pub fn parse_filter(directives: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(directives).map_err(|e| ConfigError::InvalidValue {
        var: "log_filter".to_string(),
        value: directives.to_string(),
        reason: e.to_string(),
    })
}

/// Initialise the global subscriber from `config.log_filter` and
/// `config.log_json`.
pub fn init_tracing_from(config: &VerifierConfig) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.log_filter)?,
    };
    install(config.log_json, filter);
    Ok(())
}

/// Initialise the global subscriber at `level` unless `RUST_LOG` is set.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    install(json, filter);
}

fn install(json: bool, filter: EnvFilter) {
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().with_target(false).json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
