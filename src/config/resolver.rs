//! Precedence resolution for configuration and the data directory.
//!
//! ## Config Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Session config.kdl (`<data-dir>/config.kdl`)
//! 3. System config.kdl (`~/.config/brokerage/config.kdl`)
//! 4. Built-in defaults
//!
//! ## Data Directory Precedence
//!
//! 1. `--data-dir` flag
//! 2. `BK_DATA_DIR` environment variable
//! 3. `~/.local/share/brokerage`

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{BrokerConfig, OutputFormat};
use crate::service::ServiceSettings;
use crate::{Error, Result};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "BK_DATA_DIR";

/// Environment variable naming the directory holding the system config.kdl.
pub const CONFIG_DIR_ENV: &str = "BK_CONFIG_DIR";

pub const CONFIG_FILE: &str = "config.kdl";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the data directory's config.kdl
    Session,
    /// Value from the user-wide config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub default_commission_rate: Resolved<f64>,
    pub page_size: Resolved<usize>,
    pub deadline_days: Resolved<i64>,
    pub action_log: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let defaults = ServiceSettings::default();
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            default_commission_rate: Resolved::new(
                defaults.default_commission_rate,
                ValueSource::Default,
            ),
            page_size: Resolved::new(defaults.page_size, ValueSource::Default),
            deadline_days: Resolved::new(defaults.deadline_days, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }
}

/// One row of `bk config show`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

impl ResolvedConfig {
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    pub fn action_log_enabled(&self) -> bool {
        self.action_log.value
    }

    /// Settings handed to the service layer.
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            default_commission_rate: self.default_commission_rate.value,
            page_size: self.page_size.value,
            deadline_days: self.deadline_days.value,
        }
    }

    /// Every key with its effective value and source.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        fn entry<T: ToString>(key: &'static str, resolved: &Resolved<T>) -> ConfigEntry {
            ConfigEntry {
                key,
                value: resolved.value.to_string(),
                source: resolved.source.to_string(),
            }
        }
        vec![
            entry("output-format", &self.output_format),
            entry("default-commission-rate", &self.default_commission_rate),
            entry("page-size", &self.page_size),
            entry("deadline-days", &self.deadline_days),
            entry("action-log", &self.action_log),
        ]
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub default_commission_rate: Option<f64>,
    pub page_size: Option<usize>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_default_commission_rate(mut self, rate: f64) -> Self {
        self.default_commission_rate = Some(rate);
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// Path of the user-wide config.kdl, if a config directory can be found.
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join(CONFIG_FILE));
        }
    }
    dirs::config_dir().map(|d| d.join("brokerage").join(CONFIG_FILE))
}

/// Path of the data directory's config.kdl.
pub fn session_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Resolve the data directory from the flag, the environment, or the default.
pub fn resolve_data_dir(flag: Option<&Path>) -> Result<Resolved<PathBuf>> {
    if let Some(path) = flag {
        return Ok(Resolved::new(path.to_path_buf(), ValueSource::CliFlag));
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(Resolved::new(
                PathBuf::from(dir),
                ValueSource::EnvVar(DATA_DIR_ENV.to_string()),
            ));
        }
    }
    dirs::data_dir()
        .map(|d| Resolved::new(d.join("brokerage"), ValueSource::Default))
        .ok_or_else(|| Error::Config("cannot determine a data directory".to_string()))
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => BrokerConfig::load(&path)?,
        None => BrokerConfig::default(),
    };
    let session = BrokerConfig::load(&session_config_path(data_dir))?;
    let resolved = resolve_from(&system, &session, overrides);
    tracing::debug!(
        data_dir = %data_dir.display(),
        output_format = %resolved.output_format.value,
        commission_rate = resolved.default_commission_rate.value,
        "resolved config"
    );
    Ok(resolved)
}

/// Pick each value from the highest-precedence layer that sets it.
pub fn resolve_from(
    system: &BrokerConfig,
    session: &BrokerConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(value) = pick(
        overrides.output_format.clone(),
        session.output_format.clone(),
        system.output_format.clone(),
    ) {
        result.output_format = value;
    }
    if let Some(value) = pick(
        overrides.default_commission_rate,
        session.default_commission_rate,
        system.default_commission_rate,
    ) {
        result.default_commission_rate = value;
    }
    if let Some(value) = pick(overrides.page_size, session.page_size, system.page_size) {
        result.page_size = value;
    }
    if let Some(value) = pick(None, session.deadline_days, system.deadline_days) {
        result.deadline_days = value;
    }
    if let Some(value) = pick(None, session.action_log, system.action_log) {
        result.action_log = value;
    }

    result
}

fn pick<T>(cli: Option<T>, session: Option<T>, system: Option<T>) -> Option<Resolved<T>> {
    cli.map(|v| Resolved::new(v, ValueSource::CliFlag))
        .or_else(|| session.map(|v| Resolved::new(v, ValueSource::Session)))
        .or_else(|| system.map(|v| Resolved::new(v, ValueSource::System)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_value_source_display() {
        assert_eq!(
            format!("{}", ValueSource::EnvVar("FOO".to_string())),
            "env:FOO"
        );
        assert_eq!(format!("{}", ValueSource::Session), "session");
        assert_eq!(format!("{}", ValueSource::System), "system");
        assert_eq!(format!("{}", ValueSource::CliFlag), "cli");
        assert_eq!(format!("{}", ValueSource::Default), "default");
    }

    #[test]
    fn test_resolve_defaults() {
        let config = resolve_from(
            &BrokerConfig::default(),
            &BrokerConfig::default(),
            &ConfigOverrides::default(),
        );
        assert_eq!(*config.output_format(), OutputFormat::Json);
        assert_eq!(config.output_format.source, ValueSource::Default);
        assert_eq!(config.service_settings(), ServiceSettings::default());
        assert!(config.action_log_enabled());
    }

    #[test]
    fn test_session_overrides_system() {
        let system = BrokerConfig {
            page_size: Some(10),
            deadline_days: Some(30),
            ..Default::default()
        };
        let session = BrokerConfig {
            page_size: Some(50),
            ..Default::default()
        };
        let config = resolve_from(&system, &session, &ConfigOverrides::default());
        assert_eq!(config.page_size.value, 50);
        assert_eq!(config.page_size.source, ValueSource::Session);
        assert_eq!(config.deadline_days.value, 30);
        assert_eq!(config.deadline_days.source, ValueSource::System);
    }

    #[test]
    fn test_cli_overrides_everything() {
        let session = BrokerConfig {
            output_format: Some(OutputFormat::Json),
            default_commission_rate: Some(2.0),
            ..Default::default()
        };
        let overrides = ConfigOverrides::new()
            .with_output_format(OutputFormat::Human)
            .with_default_commission_rate(4.0);
        let config = resolve_from(&BrokerConfig::default(), &session, &overrides);
        assert_eq!(*config.output_format(), OutputFormat::Human);
        assert_eq!(config.output_format.source, ValueSource::CliFlag);
        assert_eq!(config.default_commission_rate.value, 4.0);
    }

    #[test]
    fn test_entries_report_sources() {
        let session = BrokerConfig {
            action_log: Some(false),
            ..Default::default()
        };
        let config = resolve_from(&BrokerConfig::default(), &session, &ConfigOverrides::default());
        let entries = config.entries();
        assert_eq!(entries.len(), 5);
        let action_log = entries.iter().find(|e| e.key == "action-log").unwrap();
        assert_eq!(action_log.value, "false");
        assert_eq!(action_log.source, "session");
    }

    #[test]
    fn test_resolve_config_reads_session_file() {
        let temp = TempDir::new().unwrap();
        BrokerConfig {
            page_size: Some(5),
            ..Default::default()
        }
        .save(&session_config_path(temp.path()))
        .unwrap();

        let config = resolve_config(temp.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.page_size.value, 5);
        assert_eq!(config.page_size.source, ValueSource::Session);
    }

    #[test]
    fn test_data_dir_flag_wins() {
        let temp = TempDir::new().unwrap();
        let resolved = resolve_data_dir(Some(temp.path())).unwrap();
        assert_eq!(resolved.value, temp.path());
        assert_eq!(resolved.source, ValueSource::CliFlag);
    }
}
