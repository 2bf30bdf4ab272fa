//! Remote persistence boundary.
//!
//! The engine hydrates its stores from, and pushes mutations to, a
//! [`RemoteBackend`]. Records cross the boundary as JSON documents so a
//! backend never needs to know the entity types:
//! - `MemoryBackend` - in-process records with per-operation failure injection
//! - `FileBackend` - one JSON document per entity kind in a data directory

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use serde_json::Value;

use crate::Result;
use crate::models::EntityKind;

labeled_enum! {
    /// Kinds of remote call. Each kind has an independent error slot.
    pub enum OperationKind {
        Fetch => "fetch",
        Create => "create",
        Update => "update",
        Delete => "delete",
    }
}

/// Request/response boundary used to hydrate stores and persist mutations.
pub trait RemoteBackend {
    /// Every stored record of `kind`.
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>>;

    /// Store a new record under `id`.
    fn create(&mut self, kind: EntityKind, id: &str, record: &Value) -> Result<()>;

    /// Replace the record stored under `id`.
    fn update(&mut self, kind: EntityKind, id: &str, record: &Value) -> Result<()>;

    fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()>;

    /// Where records live (for display purposes).
    fn location(&self) -> String;

    fn backend_type(&self) -> &'static str;
}
