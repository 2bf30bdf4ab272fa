//! In-process backend.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::{OperationKind, RemoteBackend};
use crate::models::EntityKind;
use crate::{Error, Result};

/// Records held in memory. Any operation kind can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: BTreeMap<EntityKind, BTreeMap<String, Value>>,
    failing: BTreeSet<OperationKind>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing failure injection.
    pub fn seed(&mut self, kind: EntityKind, id: &str, record: Value) {
        self.records
            .entry(kind)
            .or_default()
            .insert(id.to_string(), record);
    }

    /// Make every subsequent `operation` call fail.
    pub fn fail(&mut self, operation: OperationKind) {
        self.failing.insert(operation);
    }

    pub fn recover(&mut self, operation: OperationKind) {
        self.failing.remove(&operation);
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.records.get(&kind).map_or(0, BTreeMap::len)
    }

    pub fn record(&self, kind: EntityKind, id: &str) -> Option<&Value> {
        self.records.get(&kind).and_then(|r| r.get(id))
    }

    fn check(&self, operation: OperationKind) -> Result<()> {
        if self.failing.contains(&operation) {
            return Err(Error::Transport {
                kind: operation,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteBackend for MemoryBackend {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>> {
        self.check(OperationKind::Fetch)?;
        Ok(self
            .records
            .get(&kind)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default())
    }

    fn create(&mut self, kind: EntityKind, id: &str, record: &Value) -> Result<()> {
        self.check(OperationKind::Create)?;
        let records = self.records.entry(kind).or_default();
        if records.contains_key(id) {
            return Err(Error::Other(format!("{} already exists: {}", kind, id)));
        }
        records.insert(id.to_string(), record.clone());
        Ok(())
    }

    fn update(&mut self, kind: EntityKind, id: &str, record: &Value) -> Result<()> {
        self.check(OperationKind::Update)?;
        let slot = self
            .records
            .get_mut(&kind)
            .and_then(|r| r.get_mut(id))
            .ok_or_else(|| Error::NotFound(format!("{} not found: {}", kind, id)))?;
        *slot = record.clone();
        Ok(())
    }

    fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        self.check(OperationKind::Delete)?;
        self.records
            .get_mut(&kind)
            .and_then(|r| r.remove(id))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("{} not found: {}", kind, id)))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
