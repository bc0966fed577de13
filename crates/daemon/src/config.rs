//! Daemon configuration from environment variables

use anyhow::{bail, Context, Result};
use remedy_core::application::constants::{DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_SWEEP_ON_START};
use remedy_core::application::SweepConfig;

pub const DEFAULT_DB_PATH: &str = "~/.remedy/admin.db";

pub const ENV_DB_PATH: &str = "REMEDY_DB_PATH";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "REMEDY_SWEEP_INTERVAL_SECS";
pub const ENV_SWEEP_ON_START: &str = "REMEDY_SWEEP_ON_START";
pub const ENV_LOG_FORMAT: &str = "REMEDY_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Production: JSON structured logging
    Json,
    /// Development: Pretty formatting with colors
    Pretty,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub sweep: SweepConfig,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup (unset keys fall back to defaults)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&db_path).into_owned();

        let interval_secs = match lookup(ENV_SWEEP_INTERVAL_SECS) {
            Some(raw) => raw.trim().parse::<u64>().with_context(|| {
                format!("{} must be a whole number of seconds", ENV_SWEEP_INTERVAL_SECS)
            })?,
            None => DEFAULT_SWEEP_INTERVAL_SECS,
        };

        let run_on_start = match lookup(ENV_SWEEP_ON_START) {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("{} must be true or false", ENV_SWEEP_ON_START))?,
            None => DEFAULT_SWEEP_ON_START,
        };

        let log_format = match lookup(ENV_LOG_FORMAT).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let sweep = SweepConfig {
            interval_secs,
            run_on_start,
        };
        sweep.validate()?;

        Ok(Self {
            db_path,
            sweep,
            log_format,
        })
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.db_path.ends_with(".remedy/admin.db"));
        assert_eq!(config.sweep.interval_secs, 300);
        assert!(config.sweep.run_on_start);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            (ENV_DB_PATH, "/var/lib/remedy/admin.db"),
            (ENV_SWEEP_INTERVAL_SECS, "60"),
            (ENV_SWEEP_ON_START, "no"),
            (ENV_LOG_FORMAT, "json"),
        ])
        .unwrap();

        assert_eq!(config.db_path, "/var/lib/remedy/admin.db");
        assert_eq!(config.sweep.interval_secs, 60);
        assert!(!config.sweep.run_on_start);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_db_path_from_env_is_tilde_expanded() {
        let config = load(&[(ENV_DB_PATH, "~/x.db")]).unwrap();

        assert_eq!(config.db_path, shellexpand::tilde("~/x.db"));
        assert!(config.db_path.ends_with("/x.db"));
        if std::env::var_os("HOME").is_some() {
            assert!(!config.db_path.starts_with('~'));
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(load(&[(ENV_SWEEP_INTERVAL_SECS, "0")]).is_err());
    }

    #[test]
    fn test_garbage_values_rejected() {
        assert!(load(&[(ENV_SWEEP_INTERVAL_SECS, "soon")]).is_err());
        assert!(load(&[(ENV_SWEEP_ON_START, "maybe")]).is_err());
    }
}
