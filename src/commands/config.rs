use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{Output, to_json};
use crate::config::{BrokerConfig, CONFIG_KEYS, ConfigEntry, ResolvedConfig};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
pub struct ConfigShow {
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{:<24} {:<8} ({})", e.key, e.value, e.source))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: String,
    pub source: String,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        self.value.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

pub fn config_show(resolved: &ResolvedConfig) -> ConfigShow {
    ConfigShow {
        entries: resolved.entries(),
    }
}

/// Effective value of one key.
pub fn config_get(resolved: &ResolvedConfig, key: &str) -> Result<ConfigValue> {
    resolved
        .entries()
        .into_iter()
        .find(|e| e.key == key)
        .map(|e| ConfigValue {
            key: e.key.to_string(),
            value: e.value,
            source: e.source,
        })
        .ok_or_else(|| {
            Error::Config(format!(
                "unknown config key: {} (expected one of: {})",
                key,
                CONFIG_KEYS.join(", ")
            ))
        })
}

/// Validate and store `key = value` in the config file at `path`.
pub fn config_set(path: &Path, key: &str, value: &str) -> Result<ConfigSet> {
    let mut config = BrokerConfig::load(path)?;
    config.set(key, value)?;
    config.save(path)?;
    tracing::info!(key, value, path = %path.display(), "config updated");

    let stored = config.get(key)?.unwrap_or_else(|| value.to_string());
    Ok(ConfigSet {
        key: key.to_string(),
        value: stored,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, resolve_from};
    use tempfile::TempDir;

    #[test]
    fn test_get_reports_source() {
        let session = BrokerConfig {
            page_size: Some(50),
            ..Default::default()
        };
        let resolved = resolve_from(&BrokerConfig::default(), &session, &ConfigOverrides::default());
        let value = config_get(&resolved, "page-size").unwrap();
        assert_eq!(value.value, "50");
        assert_eq!(value.source, "session");
        assert!(matches!(config_get(&resolved, "colour"), Err(Error::Config(_))));
    }

    #[test]
    fn test_set_writes_normalized_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.kdl");
        let set = config_set(&path, "output-format", "HUMAN").unwrap();
        assert_eq!(set.value, "human");
        assert_eq!(
            BrokerConfig::load(&path).unwrap().get("output-format").unwrap(),
            Some("human".to_string())
        );
    }

    #[test]
    fn test_set_rejects_invalid_value_without_writing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.kdl");
        assert!(config_set(&path, "page-size", "0").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_show_lists_every_key() {
        let resolved = ResolvedConfig::default();
        let show = config_show(&resolved);
        assert_eq!(show.entries.len(), CONFIG_KEYS.len());
        assert!(show.to_human().contains("default-commission-rate"));
    }
}
