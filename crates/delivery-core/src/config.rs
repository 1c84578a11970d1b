//! Verifier configuration.
//!
//! Defaults suit a production marketplace polling a public inventory API.
//! Values can come from a TOML/JSON document via serde or from `DELIVERY_*`
//! environment variables via [`VerifierConfig::from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors produced while building a [`VerifierConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("invalid verifier configuration: {0}")]
    Invalid(String),
}

/// Tunables for the verification engine and its cooldown gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Bound on one whole chain walk (milliseconds).
    pub deadline_ms: u64,
    /// Per-subject suppression after a private or failed fetch (seconds).
    pub retry_after_secs: u64,
    /// Minimum spacing between fetches against one source (milliseconds, 0 = off).
    pub crawl_interval_ms: u64,
    /// How long an inventory digest is remembered (seconds).
    pub hash_ttl_secs: u64,
    /// Keep consulting later sources until the strongest attainable status.
    pub escalate: bool,
    /// Upper bound on concurrent verifications in a batch.
    pub max_concurrency: usize,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Emit newline-delimited JSON instead of human-readable lines.
    pub log_json: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 10_000,
            retry_after_secs: 300,
            crawl_interval_ms: 0,
            hash_ttl_secs: 86_400,
            escalate: true,
            max_concurrency: 8,
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

impl VerifierConfig {
    pub const ENV_DEADLINE_MS: &'static str = "DELIVERY_DEADLINE_MS";
    pub const ENV_RETRY_AFTER_SECS: &'static str = "DELIVERY_RETRY_AFTER_SECS";
    pub const ENV_CRAWL_INTERVAL_MS: &'static str = "DELIVERY_CRAWL_INTERVAL_MS";
    pub const ENV_HASH_TTL_SECS: &'static str = "DELIVERY_HASH_TTL_SECS";
    pub const ENV_ESCALATE: &'static str = "DELIVERY_ESCALATE";
    pub const ENV_MAX_CONCURRENCY: &'static str = "DELIVERY_MAX_CONCURRENCY";
    pub const ENV_LOG: &'static str = "DELIVERY_LOG";
    pub const ENV_LOG_JSON: &'static str = "DELIVERY_LOG_JSON";

    /// Defaults overridden by any `DELIVERY_*` variables present in the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = parse_var(&lookup, Self::ENV_DEADLINE_MS)? {
            cfg.deadline_ms = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_RETRY_AFTER_SECS)? {
            cfg.retry_after_secs = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_CRAWL_INTERVAL_MS)? {
            cfg.crawl_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_HASH_TTL_SECS)? {
            cfg.hash_ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_ESCALATE)? {
            cfg.escalate = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_MAX_CONCURRENCY)? {
            cfg.max_concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_LOG)? {
            cfg.log_filter = v;
        }
        if let Some(v) = parse_var(&lookup, Self::ENV_LOG_JSON)? {
            cfg.log_json = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deadline_ms == 0 {
            return Err(ConfigError::Invalid("deadline_ms must be positive".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be positive".into(),
            ));
        }
        crate::telemetry::parse_filter(&self.log_filter)?;
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_secs)
    }

    pub fn crawl_interval(&self) -> Duration {
        Duration::from_millis(self.crawl_interval_ms)
    }

    pub fn hash_ttl(&self) -> Duration {
        Duration::from_secs(self.hash_ttl_secs)
    }
}

fn parse_var<F, T>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_verifier_config_default() {
        let cfg = VerifierConfig::default();
        assert_eq!(cfg.deadline(), Duration::from_secs(10));
        assert_eq!(cfg.retry_after(), Duration::from_secs(300));
        assert!(cfg.crawl_interval().is_zero());
        assert!(cfg.escalate);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DELIVERY_DEADLINE_MS", "2500"),
            ("DELIVERY_ESCALATE", "false"),
            ("DELIVERY_CRAWL_INTERVAL_MS", " 750 "),
        ]
        .into_iter()
        .collect();

        let cfg = VerifierConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.deadline_ms, 2500);
        assert!(!cfg.escalate);
        assert_eq!(cfg.crawl_interval_ms, 750);
        assert_eq!(cfg.retry_after_secs, 300);
    }

    #[test]
    fn test_from_lookup_rejects_malformed() {
        let err = VerifierConfig::from_lookup(|k| {
            (k == "DELIVERY_RETRY_AFTER_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "DELIVERY_RETRY_AFTER_SECS"));
    }

    #[test]
    fn test_from_lookup_rejects_zero_deadline() {
        let err = VerifierConfig::from_lookup(|k| {
            (k == "DELIVERY_DEADLINE_MS").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_lookup_reads_logging() {
        let cfg = VerifierConfig::from_lookup(|k| match k {
            "DELIVERY_LOG" => Some("delivery_core=debug,warn".to_string()),
            "DELIVERY_LOG_JSON" => Some("true".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.log_filter, "delivery_core=debug,warn");
        assert!(cfg.log_json);
    }

    #[test]
    fn test_validate_rejects_bad_log_filter() {
        let cfg = VerifierConfig {
            log_filter: "delivery_core=loud".to_string(),
            ..VerifierConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "log_filter"));
    }

    #[test]
    fn test_toml_partial_document() {
        let cfg: VerifierConfig = toml::from_str(
            r#"
            deadline_ms = 5000
            max_concurrency = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.deadline_ms, 5000);
        assert_eq!(cfg.max_concurrency, 2);
        assert_eq!(cfg.hash_ttl_secs, 86_400);
    }
}
