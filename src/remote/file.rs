//! File backend: one JSON array document per entity kind.
//!
//! Layout of the data directory:
//! - `properties.json`
//! - `clients.json`
//! - `transactions.json`
//!
//! Every write replaces the whole document through a temporary file in the
//! same directory, so a crash never leaves a half-written document behind.

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::RemoteBackend;
use crate::models::EntityKind;
use crate::{Error, Result};

/// JSON documents stored under a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Document file name for an entity kind.
    pub fn file_name(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Property => "properties.json",
            EntityKind::Client => "clients.json",
            EntityKind::Transaction => "transactions.json",
        }
    }

    /// Create the data directory and empty documents. Existing documents are kept.
    pub fn init(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let backend = Self {
            root: root.to_path_buf(),
        };
        for kind in EntityKind::ALL {
            let path = backend.path(*kind);
            if !path.exists() {
                backend.write_records(*kind, &[])?;
            }
        }
        tracing::info!(root = %root.display(), "initialized data directory");
        Ok(backend)
    }

    /// Open an initialized data directory.
    pub fn open(root: &Path) -> Result<Self> {
        if !Self::exists(root) {
            return Err(Error::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn exists(root: &Path) -> bool {
        EntityKind::ALL
            .iter()
            .all(|kind| root.join(Self::file_name(*kind)).is_file())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: EntityKind) -> PathBuf {
        self.root.join(Self::file_name(kind))
    }

    fn read_records(&self, kind: EntityKind) -> Result<Vec<Value>> {
        let content = fs::read_to_string(self.path(kind))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_records(&self, kind: EntityKind, records: &[Value]) -> Result<()> {
        let mut temp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut temp, records)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(self.path(kind)).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn position(records: &[Value], id: &str) -> Option<usize> {
        records
            .iter()
            .position(|r| r.get("id").and_then(Value::as_str) == Some(id))
    }
}

impl RemoteBackend for FileBackend {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>> {
        self.read_records(kind)
    }

    fn create(&mut self, kind: EntityKind, id: &str, record: &Value) -> Result<()> {
        let mut records = self.read_records(kind)?;
        if Self::position(&records, id).is_some() {
            return Err(Error::Other(format!("{} already exists: {}", kind, id)));
        }
        records.push(record.clone());
        self.write_records(kind, &records)
    }

    fn update(&mut self, kind: EntityKind, id: &str, record: &Value) -> Result<()> {
        let mut records = self.read_records(kind)?;
        let index = Self::position(&records, id)
            .ok_or_else(|| Error::NotFound(format!("{} not found: {}", kind, id)))?;
        records[index] = record.clone();
        self.write_records(kind, &records)
    }

    fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        let mut records = self.read_records(kind)?;
        let index = Self::position(&records, id)
            .ok_or_else(|| Error::NotFound(format!("{} not found: {}", kind, id)))?;
        records.remove(index);
        self.write_records(kind, &records)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}
