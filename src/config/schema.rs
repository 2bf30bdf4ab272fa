//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The [`BrokerConfig`] struct representing the file
//! - Conversion to and from KDL documents
//! - Validation and key-based access for `bk config get/set`

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys recognised in config.kdl.
pub const CONFIG_KEYS: &[&str] = &[
    "output-format",
    "default-commission-rate",
    "page-size",
    "deadline-days",
    "action-log",
];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"          // or "json"
/// default-commission-rate 3.0    // percent
/// page-size 20
/// deadline-days 7
/// action-log #true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub output_format: Option<OutputFormat>,

    /// Commission percent applied when a transaction omits a rate (0-100)
    pub default_commission_rate: Option<f64>,

    /// Default list page size (at least 1)
    pub page_size: Option<usize>,

    /// Default horizon for upcoming deadlines, in days
    pub deadline_days: Option<i64>,

    /// Whether CLI invocations are appended to the action log
    pub action_log: Option<bool>,
}

impl BrokerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(rate) = self.default_commission_rate {
            if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
                return Err(format!(
                    "default-commission-rate must be 0-100, got {}",
                    rate
                ));
            }
        }
        if self.page_size == Some(0) {
            return Err("page-size must be at least 1".to_string());
        }
        if let Some(days) = self.deadline_days {
            if days < 0 {
                return Err(format!("deadline-days must not be negative, got {}", days));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes and ill-typed values are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(value) = first_value(doc, "output-format") {
            config.output_format = value.as_string().and_then(OutputFormat::parse);
        }

        if let Some(value) = first_value(doc, "default-commission-rate") {
            config.default_commission_rate = value
                .as_float()
                .or_else(|| value.as_integer().map(|i| i as f64));
        }

        if let Some(value) = first_value(doc, "page-size") {
            config.page_size = value
                .as_integer()
                .filter(|i| *i >= 1)
                .and_then(|i| usize::try_from(i).ok());
        }

        if let Some(value) = first_value(doc, "deadline-days") {
            config.deadline_days = value.as_integer().and_then(|i| i64::try_from(i).ok());
        }

        if let Some(value) = first_value(doc, "action-log") {
            config.action_log = value.as_bool();
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref format) = self.output_format {
            push_node(&mut doc, "output-format", KdlValue::String(format.as_str().to_string()));
        }
        if let Some(rate) = self.default_commission_rate {
            push_node(&mut doc, "default-commission-rate", KdlValue::Float(rate));
        }
        if let Some(size) = self.page_size {
            push_node(&mut doc, "page-size", KdlValue::Integer(size as i128));
        }
        if let Some(days) = self.deadline_days {
            push_node(&mut doc, "deadline-days", KdlValue::Integer(days as i128));
        }
        if let Some(enabled) = self.action_log {
            push_node(&mut doc, "action-log", KdlValue::Bool(enabled));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &BrokerConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format.clone();
        }
        if other.default_commission_rate.is_some() {
            self.default_commission_rate = other.default_commission_rate;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
        if other.deadline_days.is_some() {
            self.deadline_days = other.deadline_days;
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
    }

    /// Current value of `key` as text, if set.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "output-format" => self.output_format.as_ref().map(|f| f.to_string()),
            "default-commission-rate" => self.default_commission_rate.map(|r| r.to_string()),
            "page-size" => self.page_size.map(|s| s.to_string()),
            "deadline-days" => self.deadline_days.map(|d| d.to_string()),
            "action-log" => self.action_log.map(|b| b.to_string()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Parse `value` and store it under `key`, rejecting invalid values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();
        match key {
            "output-format" => {
                next.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                    Error::Config(format!("output-format must be json or human, got {}", value))
                })?);
            }
            "default-commission-rate" => {
                next.default_commission_rate = Some(parse_value(key, value)?);
            }
            "page-size" => next.page_size = Some(parse_value(key, value)?),
            "deadline-days" => next.deadline_days = Some(parse_value(key, value)?),
            "action-log" => next.action_log = Some(parse_value(key, value)?),
            _ => return Err(unknown_key(key)),
        }
        next.validate().map_err(Error::Config)?;
        *self = next;
        Ok(())
    }

    /// Read config.kdl at `path`. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let doc: KdlDocument = content.parse()?;
        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Write config.kdl to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_kdl().to_string())?;
        Ok(())
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: {}", key, value)))
}

fn unknown_key(key: &str) -> Error {
    Error::Config(format!(
        "unknown config key: {} (expected one of: {})",
        key,
        CONFIG_KEYS.join(", ")
    ))
}
