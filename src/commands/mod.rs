//! Command implementations for the `bk` CLI.
//!
//! Each command turns parsed arguments into service calls and returns a
//! result that renders as JSON or human-readable text. Commands are
//! organized by entity type:
//! - `property` - Listing CRUD, status and statistics
//! - `client` - Client CRUD, notes, follow-ups and interests
//! - `transaction` - Deals, milestones, commission, analytics and deadlines
//! - `config` - Show, get and set configuration values

mod client;
mod config;
mod property;
mod transaction;

pub use client::*;
pub use config::*;
pub use property::*;
pub use transaction::*;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::engine::Statistics;
use crate::models::EntityKind;
use crate::remote::FileBackend;
use crate::service::{Brokerage, ServiceSettings};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Open the file-backed service for `data_dir` and load every record.
pub fn open_brokerage(data_dir: &Path, settings: ServiceSettings) -> Result<Brokerage<FileBackend>> {
    let backend = FileBackend::open(data_dir)?;
    let mut brokerage = Brokerage::new(backend, Arc::new(SystemClock), settings);
    brokerage.hydrate()?;
    Ok(brokerage)
}

// === System ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub data_dir: PathBuf,
    /// False when the directory was already initialized
    pub created: bool,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Initialized brokerage data in {}", self.data_dir.display())
        } else {
            format!("Already initialized: {}", self.data_dir.display())
        }
    }
}

/// Create the data directory and empty record files.
pub fn system_init(data_dir: &Path) -> Result<InitResult> {
    let created = !FileBackend::exists(data_dir);
    FileBackend::init(data_dir)?;
    Ok(InitResult {
        data_dir: data_dir.to_path_buf(),
        created,
    })
}

// === Shared results ===

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub entity: EntityKind,
    pub id: String,
    pub deleted: bool,
}

impl Output for Deleted {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted {} {}", self.entity, self.id)
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResult {
    pub entity: EntityKind,
    #[serde(flatten)]
    pub stats: Statistics,
}

impl Output for StatsResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        let stats = &self.stats;
        let mut lines = vec![format!("{} statistics: {} total", self.entity, stats.total)];
        if stats.total == 0 {
            return lines.join("\n");
        }

        lines.push("By status:".to_string());
        for (status, count) in &stats.by_status {
            lines.push(format!(
                "  {:<18} {:>4} ({:.1}%)",
                status,
                count,
                stats.status_share(status) * 100.0
            ));
        }
        lines.push("By type:".to_string());
        for (kind, count) in &stats.by_type {
            lines.push(format!(
                "  {:<18} {:>4} ({:.1}%)",
                kind,
                count,
                stats.type_share(kind) * 100.0
            ));
        }
        if stats.measured > 0 {
            lines.push(format!(
                "Total: {:.2} across {}, average {:.2}",
                stats.sum, stats.measured, stats.mean
            ));
        }
        if stats.needs_attention > 0 {
            lines.push(format!("Needs attention: {}", stats.needs_attention));
        }
        lines.join("\n")
    }
}

// === Argument parsing helpers ===

/// Parse a date given as RFC 3339 or as `YYYY-MM-DD` (midnight UTC).
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            Error::Validation(format!(
                "invalid date '{}' (expected YYYY-MM-DD or RFC 3339)",
                value
            ))
        })
}

fn parse_optional_datetime(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_datetime).transpose()
}

fn parse_labels<T: FromStr<Err = Error>>(values: &[String]) -> Result<Vec<T>> {
    values.iter().map(|v| v.parse()).collect()
}

fn parse_optional<T: FromStr<Err = Error>>(value: Option<&str>) -> Result<Option<T>> {
    value.map(str::parse).transpose()
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}
