//! Configuration for the `bk` CLI.
//!
//! Preferences live in KDL `config.kdl` files at two levels:
//! - System: `~/.config/brokerage/config.kdl` (or `$BK_CONFIG_DIR/config.kdl`)
//! - Session: `<data-dir>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `default-commission-rate` - Percent used when a transaction omits a rate
//! - `page-size` - Default list page size
//! - `deadline-days` - Default horizon for upcoming deadlines
//! - `action-log` - Whether CLI invocations are logged
//!
//! ## Precedence
//!
//! CLI flag > session config > system config > defaults.
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_DIR_ENV, CONFIG_FILE, ConfigEntry, ConfigOverrides, DATA_DIR_ENV, Resolved,
    ResolvedConfig, ValueSource, resolve_config, resolve_data_dir, resolve_from,
    session_config_path, system_config_path,
};
pub use schema::{BrokerConfig, CONFIG_KEYS, OutputFormat};
