//! Brokerage - lifecycle, filtering and statistics engine for real-estate records.
//!
//! This library provides the core functionality for the `bk` CLI tool:
//! property listings, client relationships and sale/rental transactions,
//! with guarded status transitions, milestone tracking and derived statistics.

pub mod action_log;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod engine;
#[macro_use]
pub mod models;
pub mod remote;
pub mod service;
pub mod store;


use crate::models::EntityKind;
use crate::remote::OperationKind;

/// Library-level error type for brokerage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("KDL error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("Not initialized: run `bk system init` first")]
    NotInitialized,

    /// Malformed or missing input, rejected before any mutation is applied.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Status change not present in the entity's transition table.
    #[error("Illegal {entity} transition for {id}: {from} -> {to}")]
    IllegalTransition {
        entity: EntityKind,
        id: String,
        from: String,
        to: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("Milestone already completed: {milestone}")]
    AlreadyCompleted { milestone: String },

    /// Opaque failure reported by the remote persistence boundary.
    #[error("Transport error during {kind}: {message}")]
    Transport {
        kind: OperationKind,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for brokerage operations.
pub type Result<T> = std::result::Result<T, Error>;
