// pattern-config/src/lib.rs
// ============================================================================
// Crate: pattern-config
// Description: Fail-closed configuration loading for the pattern pipeline.
// Purpose: Resolve operator-supplied bus, store, pool, and lifecycle
//          threshold settings with no silently-applied defaults.
// Dependencies: pattern-core, serde, toml, thiserror
// ============================================================================

//! ## Overview
//!
//! Configuration comes from an environment-variable prefix (default
//! `PATTERN_`) overlaid on an optional TOML file: the file supplies a base,
//! and any environment variable with the resolved prefix takes precedence
//! over the same key from the file. Every field named in
//! [`PatternConfig`] is required; a value absent from both the file and the
//! environment is a startup [`ConfigError::MissingRequiredField`], never a
//! silently-applied default.

use std::env;
use std::fs;
use std::path::Path;

use pattern_core::runtime::LifecycleThresholds;
use serde::Deserialize;
use thiserror::Error;

/// Default environment-variable prefix when none is supplied.
pub const DEFAULT_ENV_PREFIX: &str = "PATTERN_";

/// Error taxonomy for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field had no value in either the TOML overlay or the
    /// environment.
    #[error("missing required config field: {0}")]
    MissingRequiredField(String),
    /// A supplied value failed to parse into its target type or failed
    /// range validation.
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The TOML overlay file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The TOML overlay file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Optional TOML overlay shape. Every field is optional here; requiredness
/// is enforced after merging with the environment, not at this layer.
#[derive(Debug, Clone, Default, Deserialize)]
struct TomlOverlay {
    /// See [`PatternConfig::bus_source_uri`].
    #[serde(default)]
    bus_source_uri: Option<String>,
    /// See [`PatternConfig::bus_sink_uri`].
    #[serde(default)]
    bus_sink_uri: Option<String>,
    /// See [`PatternConfig::store_connection_string`].
    #[serde(default)]
    store_connection_string: Option<String>,
    /// See [`PatternConfig::worker_pool_size`].
    #[serde(default)]
    worker_pool_size: Option<usize>,
    /// See [`PatternConfig::rolling_window`].
    #[serde(default)]
    rolling_window: Option<usize>,
    /// See [`LifecycleThresholds::injection_count_min`].
    #[serde(default)]
    c_min: Option<u64>,
    /// See [`LifecycleThresholds::success_rate_min`].
    #[serde(default)]
    r_min: Option<f64>,
    /// See [`LifecycleThresholds::consecutive_failures_max`].
    #[serde(default)]
    f_max: Option<u32>,
    /// See [`LifecycleThresholds::demotion_success_rate`].
    #[serde(default)]
    r_demote: Option<f64>,
    /// See [`LifecycleThresholds::demotion_consecutive_failures`].
    #[serde(default)]
    f_max_demote: Option<u32>,
}

/// Resolved, validated configuration for one pattern-pipeline process.
///
/// Every field is required at load time; there is no `Default` impl, per
/// the fail-closed configuration philosophy this crate exists to enforce.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternConfig {
    /// Environment-variable prefix this configuration was resolved under.
    pub env_prefix: String,
    /// URI of the bus source this process polls inbound envelopes from.
    pub bus_source_uri: String,
    /// URI of the bus sink this process publishes outbound envelopes to.
    pub bus_sink_uri: String,
    /// Connection string for the durable pattern store.
    pub store_connection_string: String,
    /// Worker pool size per topic subscription.
    pub worker_pool_size: usize,
    /// Rolling window size `N` used for pattern outcome metrics.
    pub rolling_window: usize,
    /// Lifecycle promotion/demotion thresholds.
    pub thresholds: LifecycleThresholds,
}

impl PatternConfig {
    /// Loads configuration from an optional TOML overlay file plus the
    /// process environment, using `env_prefix` (or [`DEFAULT_ENV_PREFIX`]
    /// if `None`) to scope environment variable lookups.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] if `toml_path`
    /// is supplied but cannot be read or parsed, [`ConfigError::InvalidValue`]
    /// if a value fails to parse into its target type or fails range
    /// validation, and [`ConfigError::MissingRequiredField`] if a required
    /// field has no value from either source.
    pub fn load(env_prefix: Option<&str>, toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let prefix = env_prefix.unwrap_or(DEFAULT_ENV_PREFIX).to_string();
        let overlay = load_overlay(toml_path)?;
        let bus_source_uri = resolve_string(&prefix, "BUS_SOURCE_URI", overlay.bus_source_uri)?;
        let bus_sink_uri = resolve_string(&prefix, "BUS_SINK_URI", overlay.bus_sink_uri)?;
        let store_connection_string =
            resolve_string(&prefix, "STORE_CONNECTION_STRING", overlay.store_connection_string)?;
        let worker_pool_size = resolve_parsed(&prefix, "WORKER_POOL_SIZE", overlay.worker_pool_size)?;
        let rolling_window = resolve_parsed(&prefix, "ROLLING_WINDOW", overlay.rolling_window)?;
        let injection_count_min = resolve_parsed(&prefix, "C_MIN", overlay.c_min)?;
        let success_rate_min = resolve_parsed(&prefix, "R_MIN", overlay.r_min)?;
        let consecutive_failures_max = resolve_parsed(&prefix, "F_MAX", overlay.f_max)?;
        let demotion_success_rate = resolve_parsed(&prefix, "R_DEMOTE", overlay.r_demote)?;
        let demotion_consecutive_failures = resolve_parsed(&prefix, "F_MAX_DEMOTE", overlay.f_max_demote)?;

        if worker_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker_pool_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if rolling_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rolling_window".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&success_rate_min) {
            return Err(ConfigError::InvalidValue {
                field: "r_min".to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&demotion_success_rate) {
            return Err(ConfigError::InvalidValue {
                field: "r_demote".to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }

        Ok(Self {
            env_prefix: prefix,
            bus_source_uri,
            bus_sink_uri,
            store_connection_string,
            worker_pool_size,
            rolling_window,
            thresholds: LifecycleThresholds {
                injection_count_min,
                success_rate_min,
                consecutive_failures_max,
                demotion_success_rate,
                demotion_consecutive_failures,
            },
        })
    }
}

/// Reads and parses the optional TOML overlay file, if supplied.
fn load_overlay(toml_path: Option<&Path>) -> Result<TomlOverlay, ConfigError> {
    let Some(path) = toml_path else {
        return Ok(TomlOverlay::default());
    };
    let text = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Resolves a required string field: the environment variable
/// `{prefix}{suffix}` wins over the overlay value, either of which satisfy
/// the requirement.
fn resolve_string(prefix: &str, suffix: &str, overlay_value: Option<String>) -> Result<String, ConfigError> {
    let key = format!("{prefix}{suffix}");
    match env::var(&key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => overlay_value.ok_or_else(|| ConfigError::MissingRequiredField(key.clone())),
    }
}

/// Resolves a required field parsed from its string form: the environment
/// variable `{prefix}{suffix}` wins over the overlay value.
fn resolve_parsed<T>(prefix: &str, suffix: &str, overlay_value: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let key = format!("{prefix}{suffix}");
    match env::var(&key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            field: key.clone(),
            reason: "failed to parse environment value".to_string(),
        }),
        Err(_) => overlay_value.ok_or_else(|| ConfigError::MissingRequiredField(key.clone())),
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test assertions may unwrap, expect, or panic on failure"
    )]
    #![allow(unsafe_code, reason = "tests mutate process env vars, which is unsafe as of this edition")]
    use std::io::Write;
    use std::sync::Mutex;

    use super::*;

    /// Serializes access to the process environment across tests in this
    /// module, since `std::env::set_var`/`remove_var` are process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_pattern_env() {
        for suffix in [
            "BUS_SOURCE_URI",
            "BUS_SINK_URI",
            "STORE_CONNECTION_STRING",
            "WORKER_POOL_SIZE",
            "ROLLING_WINDOW",
            "C_MIN",
            "R_MIN",
            "F_MAX",
            "R_DEMOTE",
            "F_MAX_DEMOTE",
        ] {
            // SAFETY: guarded by `ENV_LOCK`; no other thread touches these
            // keys concurrently.
            unsafe {
                env::remove_var(format!("PATTERN_{suffix}"));
            }
        }
    }

    fn write_complete_overlay() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            bus_source_uri = "inline://source"
            bus_sink_uri = "inline://sink"
            store_connection_string = "sqlite:///tmp/patterns.db"
            worker_pool_size = 4
            rolling_window = 20
            c_min = 5
            r_min = 0.6
            f_max = 3
            r_demote = 0.4
            f_max_demote = 5
            "#
        )
        .expect("write overlay");
        file
    }

    #[test]
    fn loads_complete_configuration_from_toml_overlay() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clear_pattern_env();
        let overlay = write_complete_overlay();
        let config = PatternConfig::load(None, Some(overlay.path())).expect("loads");
        assert_eq!(config.env_prefix, DEFAULT_ENV_PREFIX);
        assert_eq!(config.bus_source_uri, "inline://source");
        assert_eq!(config.worker_pool_size, 4);
        assert_eq!(config.thresholds.injection_count_min, 5);
    }

    #[test]
    fn environment_variable_overrides_toml_overlay_value() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clear_pattern_env();
        let overlay = write_complete_overlay();
        // SAFETY: guarded by `ENV_LOCK`.
        unsafe {
            env::set_var("PATTERN_WORKER_POOL_SIZE", "9");
        }
        let config = PatternConfig::load(None, Some(overlay.path())).expect("loads");
        assert_eq!(config.worker_pool_size, 9);
        clear_pattern_env();
    }

    #[test]
    fn missing_required_field_fails_closed() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clear_pattern_env();
        let result = PatternConfig::load(None, None);
        assert!(matches!(result, Err(ConfigError::MissingRequiredField(_))));
    }

    #[test]
    fn rejects_success_rate_outside_unit_interval() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clear_pattern_env();
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            bus_source_uri = "inline://source"
            bus_sink_uri = "inline://sink"
            store_connection_string = "sqlite:///tmp/patterns.db"
            worker_pool_size = 4
            rolling_window = 20
            c_min = 5
            r_min = 1.4
            f_max = 3
            r_demote = 0.4
            f_max_demote = 5
            "#
        )
        .expect("write overlay");
        let result = PatternConfig::load(None, Some(file.path()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
