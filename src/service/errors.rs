//! Per-operation-kind transport error slots.

use serde::Serialize;
use std::collections::BTreeMap;

use super::OperationKind;
use crate::models::EntityKind;
use crate::{Error, Result};

/// Last transport failure for each `(entity kind, operation kind)` pair.
///
/// A success clears only its own slot, so a failing update never blocks a
/// retry of a create or fetch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorSlots {
    slots: BTreeMap<EntityKind, BTreeMap<OperationKind, String>>,
}

impl ErrorSlots {
    pub fn get(&self, kind: EntityKind, operation: OperationKind) -> Option<&str> {
        self.slots
            .get(&kind)
            .and_then(|ops| ops.get(&operation))
            .map(String::as_str)
    }

    pub fn is_clear(&self) -> bool {
        self.slots.values().all(BTreeMap::is_empty)
    }

    pub fn clear(&mut self, kind: EntityKind, operation: OperationKind) {
        if let Some(ops) = self.slots.get_mut(&kind) {
            ops.remove(&operation);
        }
    }

    pub fn record(&mut self, kind: EntityKind, operation: OperationKind, message: impl Into<String>) {
        self.slots
            .entry(kind)
            .or_default()
            .insert(operation, message.into());
    }

    /// Fold a backend outcome into the slots.
    ///
    /// Success clears the slot. Any failure is recorded and surfaced as
    /// [`Error::Transport`] tagged with `operation`.
    pub fn settle<T>(&mut self, kind: EntityKind, operation: OperationKind, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.clear(kind, operation);
                Ok(value)
            }
            Err(err) => {
                let message = match err {
                    Error::Transport { message, .. } => message,
                    other => other.to_string(),
                };
                tracing::warn!(
                    entity = %kind,
                    operation = %operation,
                    error = %message,
                    "remote call failed"
                );
                self.record(kind, operation, message.clone());
                Err(Error::Transport {
                    kind: operation,
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_wraps_and_clears() {
        let mut slots = ErrorSlots::default();
        let failed: Result<()> = Err(Error::NotFound("client not found: cli-1".to_string()));
        let err = slots
            .settle(EntityKind::Client, OperationKind::Update, failed)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport {
                kind: OperationKind::Update,
                ..
            }
        ));
        assert_eq!(
            slots.get(EntityKind::Client, OperationKind::Update),
            Some("client not found: cli-1")
        );
        assert_eq!(slots.get(EntityKind::Client, OperationKind::Create), None);

        slots
            .settle(EntityKind::Client, OperationKind::Update, Ok(()))
            .unwrap();
        assert!(slots.is_clear());
    }
}
