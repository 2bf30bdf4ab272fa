//! In-memory collection stores.
//!
//! A [`Collection`] owns the authoritative identity map for one entity kind,
//! together with the active filter, the filtered view, statistics over that
//! view and the bulk-selection set. Every mutation re-derives the view and
//! statistics before returning.
//!
//! Entities carry a sync tag: local mutations are [`SyncState::Pending`]
//! until the caller confirms them, and may be rolled back to the prior
//! confirmed version.

pub mod client;
pub mod property;
pub mod transaction;

pub use client::ClientStore;
pub use property::PropertyStore;
pub use transaction::TransactionStore;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::clock::Clock;
use crate::engine::{Aggregatable, FilterSpec, Filterable, Statistics, aggregate, matches, validate_spec};
use crate::models::Entity;
use crate::{Error, Result};

/// Generate a hash-based ID with the given prefix.
///
/// Format: `{prefix}-{8 hex chars}`.
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..8])
}

/// Whether a stored entity has been acknowledged by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone)]
enum SyncTag<E> {
    Confirmed,
    /// `previous` is the last confirmed version, `None` for a local create.
    Pending { previous: Option<E> },
}

#[derive(Debug, Clone)]
struct Tracked<E> {
    entity: E,
    sync: SyncTag<E>,
}

impl<E> Tracked<E> {
    fn state(&self) -> SyncState {
        match self.sync {
            SyncTag::Confirmed => SyncState::Confirmed,
            SyncTag::Pending { .. } => SyncState::Pending,
        }
    }
}

/// Identity-keyed store for one entity kind.
pub struct Collection<E> {
    records: BTreeMap<String, Tracked<E>>,
    filter: FilterSpec,
    view: Vec<String>,
    stats: Statistics,
    selection: BTreeSet<String>,
    clock: Arc<dyn Clock>,
}

impl<E> Collection<E>
where
    E: Entity + Filterable + Aggregatable,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: BTreeMap::new(),
            filter: FilterSpec::new(),
            view: Vec::new(),
            stats: Statistics::default(),
            selection: BTreeSet::new(),
            clock,
        }
    }

    /// Replace the whole collection with remotely fetched records, all confirmed.
    pub fn hydrate(&mut self, entities: Vec<E>) {
        self.records = entities
            .into_iter()
            .map(|entity| {
                (
                    entity.id().to_string(),
                    Tracked {
                        entity,
                        sync: SyncTag::Confirmed,
                    },
                )
            })
            .collect();
        let records = &self.records;
        self.selection.retain(|id| records.contains_key(id));
        self.refresh();
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn find(&self, id: &str) -> Option<&E> {
        self.records.get(id).map(|t| &t.entity)
    }

    pub fn get(&self, id: &str) -> Result<&E> {
        self.find(id).ok_or_else(|| Self::not_found(id))
    }

    /// Every entity, newest first.
    pub fn all(&self) -> Vec<&E> {
        let mut items: Vec<&E> = self.records.values().map(|t| &t.entity).collect();
        sort_newest_first(&mut items);
        items
    }

    /// Entities matching `spec`, newest first. Independent of the active filter.
    pub fn list(&self, spec: &FilterSpec) -> Result<Vec<&E>> {
        validate_spec::<E>(spec)?;
        let mut items: Vec<&E> = self
            .records
            .values()
            .map(|t| &t.entity)
            .filter(|e| matches(*e, spec))
            .collect();
        sort_newest_first(&mut items);
        Ok(items)
    }

    /// Statistics over the entities matching `spec`.
    pub fn stats_for(&self, spec: &FilterSpec) -> Result<Statistics> {
        let items = self.list(spec)?;
        Ok(aggregate(items, self.now()))
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// Replace the active filter and re-derive the view.
    pub fn set_filter(&mut self, spec: FilterSpec) -> Result<()> {
        validate_spec::<E>(&spec)?;
        self.filter = spec;
        self.refresh();
        Ok(())
    }

    pub fn clear_filter(&mut self) {
        self.filter = FilterSpec::new();
        self.refresh();
    }

    /// Entities passing the active filter, newest first.
    pub fn visible(&self) -> Vec<&E> {
        self.view.iter().filter_map(|id| self.find(id)).collect()
    }

    /// Statistics over the active view.
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn sync_state(&self, id: &str) -> Option<SyncState> {
        self.records.get(id).map(Tracked::state)
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|(_, t)| t.state() == SyncState::Pending)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether `id` was created locally and never acknowledged remotely.
    pub fn is_local_create(&self, id: &str) -> bool {
        matches!(
            self.records.get(id).map(|t| &t.sync),
            Some(SyncTag::Pending { previous: None })
        )
    }

    /// Mark a pending entity as acknowledged.
    pub fn confirm(&mut self, id: &str) -> Result<()> {
        let tracked = self.records.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        tracked.sync = SyncTag::Confirmed;
        Ok(())
    }

    /// Undo the pending local mutation of `id`.
    ///
    /// Restores the last confirmed version, or drops the entity entirely when
    /// it was created locally. Returns the restored entity, if any. Rolling
    /// back a confirmed entity is a no-op.
    pub fn rollback(&mut self, id: &str) -> Result<Option<E>> {
        let current = self.records.get(id).ok_or_else(|| Self::not_found(id))?;
        if let SyncTag::Confirmed = current.sync {
            return Ok(Some(current.entity.clone()));
        }

        let tracked = self.records.remove(id).ok_or_else(|| Self::not_found(id))?;
        let restored = match tracked.sync {
            SyncTag::Pending { previous: Some(previous) } => {
                self.records.insert(
                    id.to_string(),
                    Tracked {
                        entity: previous.clone(),
                        sync: SyncTag::Confirmed,
                    },
                );
                Some(previous)
            }
            _ => {
                self.selection.remove(id);
                None
            }
        };
        tracing::info!(entity = %E::KIND, id, "rolled back local change");
        self.refresh();
        Ok(restored)
    }

    /// Add a new entity as pending.
    pub(crate) fn insert(&mut self, entity: E) -> Result<E> {
        entity.validate()?;
        let id = entity.id().to_string();
        if self.records.contains_key(&id) {
            return Err(Error::Validation(format!(
                "{} already exists: {}",
                E::KIND,
                id
            )));
        }
        self.records.insert(
            id.clone(),
            Tracked {
                entity: entity.clone(),
                sync: SyncTag::Pending { previous: None },
            },
        );
        tracing::info!(entity = %E::KIND, id = %id, "created");
        self.refresh();
        Ok(entity)
    }

    /// Replace an existing entity by identity, marking it pending.
    pub(crate) fn replace(&mut self, entity: E) -> Result<E> {
        entity.validate()?;
        let id = entity.id().to_string();
        let tracked = self.records.get_mut(&id).ok_or_else(|| Self::not_found(&id))?;
        let previous = match std::mem::replace(&mut tracked.sync, SyncTag::Confirmed) {
            SyncTag::Confirmed => Some(tracked.entity.clone()),
            SyncTag::Pending { previous } => previous,
        };
        tracked.sync = SyncTag::Pending { previous };
        tracked.entity = entity.clone();
        tracing::info!(entity = %E::KIND, id = %id, "updated");
        self.refresh();
        Ok(entity)
    }

    /// Derive a new version of `id` with `change` and store it.
    ///
    /// Nothing is stored when `change` fails.
    pub(crate) fn modify<F>(&mut self, id: &str, change: F) -> Result<E>
    where
        F: FnOnce(&E, chrono::DateTime<chrono::Utc>) -> Result<E>,
    {
        let now = self.now();
        let next = change(self.get(id)?, now)?;
        self.replace(next)
    }

    pub(crate) fn remove_entry(&mut self, id: &str) -> Result<E> {
        let tracked = self.records.remove(id).ok_or_else(|| Self::not_found(id))?;
        self.selection.remove(id);
        tracing::info!(entity = %E::KIND, id, "removed");
        self.refresh();
        Ok(tracked.entity)
    }

    /// A fresh identity that is not yet in use.
    pub(crate) fn next_id(&self, seed: &str) -> String {
        let prefix = E::KIND.id_prefix();
        let mut attempt = 0u32;
        loop {
            let id = generate_id(prefix, &format!("{}:{}", seed, attempt));
            if !self.records.contains_key(&id) {
                return id;
            }
            attempt += 1;
        }
    }

    // Selection

    /// Add `id` to the selection. Unknown identities are rejected.
    pub fn select(&mut self, id: &str) -> Result<()> {
        if !self.contains(id) {
            return Err(Self::not_found(id));
        }
        self.selection.insert(id.to_string());
        Ok(())
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.selection.remove(id)
    }

    /// Flip membership of `id`; returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        if self.selection.remove(id) {
            return Ok(false);
        }
        self.select(id)?;
        Ok(true)
    }

    /// Select everything in the current view.
    pub fn select_all_visible(&mut self) {
        self.selection.extend(self.view.iter().cloned());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Selected identities, in sorted order.
    pub fn selected(&self) -> Vec<&str> {
        self.selection.iter().map(String::as_str).collect()
    }

    /// Re-derive the view and statistics, e.g. after the clock has moved.
    pub fn refresh(&mut self) {
        let now = self.now();
        let mut items: Vec<&E> = self
            .records
            .values()
            .map(|t| &t.entity)
            .filter(|e| matches(*e, &self.filter))
            .collect();
        sort_newest_first(&mut items);
        self.stats = aggregate(items.iter().copied(), now);
        self.view = items.into_iter().map(|e| e.id().to_string()).collect();
        tracing::debug!(
            entity = %E::KIND,
            total = self.records.len(),
            visible = self.view.len(),
            "refreshed view"
        );
    }

    fn not_found(id: &str) -> Error {
        Error::NotFound(format!("{} not found: {}", E::KIND, id))
    }
}

fn sort_newest_first<E: Entity>(items: &mut [&E]) {
    items.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Constraint;
    use crate::models::{Property, PropertyDraft, PropertyPatch, PropertyStatus, PropertyType};
    use crate::test_utils::{test_clock, test_now};
    use chrono::Duration;

    fn listing(id: &str, price: f64, status: PropertyStatus, kind: PropertyType, age_days: i64) -> Property {
        PropertyDraft {
            title: format!("Listing {}", id),
            price,
            property_type: kind,
            status: Some(status),
            agent_id: "agent-1".to_string(),
            ..Default::default()
        }
        .into_property(id.to_string(), test_now() - Duration::days(age_days))
    }

    fn store() -> Collection<Property> {
        let mut store = Collection::new(test_clock());
        store.hydrate(vec![
            listing("prop-a", 500_000.0, PropertyStatus::Active, PropertyType::House, 3),
            listing("prop-b", 750_000.0, PropertyStatus::Active, PropertyType::Condo, 2),
            listing("prop-c", 1_000_000.0, PropertyStatus::Sold, PropertyType::House, 1),
        ]);
        store
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("prop", "seed");
        assert!(id.starts_with("prop-"));
        assert_eq!(id.len(), 13);
        assert!(id[5..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hydrated_records_are_confirmed() {
        let store = store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.sync_state("prop-a"), Some(SyncState::Confirmed));
        assert!(store.pending_ids().is_empty());
    }

    #[test]
    fn test_all_is_newest_first() {
        let store = store();
        let ids: Vec<&str> = store.all().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["prop-c", "prop-b", "prop-a"]);
    }

    #[test]
    fn test_unfiltered_stats_cover_whole_collection() {
        let store = store();
        let stats = store.stats();
        assert_eq!(stats.total, store.len());
        assert_eq!(stats.by_status.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_type.values().sum::<usize>(), stats.total);
        assert_eq!(stats.sum, 2_250_000.0);
    }

    #[test]
    fn test_view_is_rederived_after_mutation() {
        let mut store = store();
        store
            .set_filter(FilterSpec::new().with("status", Constraint::any_of(["active"])))
            .unwrap();
        assert_eq!(store.visible().len(), 2);
        assert_eq!(store.stats().total, 2);

        store
            .modify("prop-a", |p, now| {
                let mut next = p.clone();
                next.status = PropertyStatus::Pending;
                next.updated_at = now;
                Ok(next)
            })
            .unwrap();
        assert_eq!(store.visible().len(), 1);
        assert_eq!(store.stats().total, 1);
        assert_eq!(store.stats().sum, 750_000.0);
    }

    #[test]
    fn test_set_filter_rejects_unknown_field() {
        let mut store = store();
        let spec = FilterSpec::new().with("colour", Constraint::any_of(["red"]));
        assert!(matches!(store.set_filter(spec), Err(Error::Validation(_))));
        assert!(store.filter().is_empty());
    }

    #[test]
    fn test_replace_unknown_identity_is_not_found() {
        let mut store = store();
        let ghost = listing("prop-z", 1.0, PropertyStatus::Active, PropertyType::Land, 0);
        assert!(matches!(store.replace(ghost), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_insert_duplicate_is_rejected() {
        let mut store = store();
        let dup = listing("prop-a", 1.0, PropertyStatus::Active, PropertyType::Land, 0);
        assert!(store.insert(dup).is_err());
        assert_eq!(store.get("prop-a").unwrap().price, 500_000.0);
    }

    #[test]
    fn test_invalid_update_leaves_entity_untouched() {
        let mut store = store();
        let result = store.modify("prop-a", |p, _| {
            let mut next = p.clone();
            PropertyPatch {
                price: Some(-5.0),
                ..Default::default()
            }
            .apply(&mut next);
            Ok(next)
        });
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.get("prop-a").unwrap().price, 500_000.0);
        assert_eq!(store.sync_state("prop-a"), Some(SyncState::Confirmed));
    }

    #[test]
    fn test_rollback_restores_confirmed_version() {
        let mut store = store();
        for price in [600_000.0, 650_000.0] {
            store
                .modify("prop-a", |p, _| {
                    let mut next = p.clone();
                    next.price = price;
                    Ok(next)
                })
                .unwrap();
        }
        assert_eq!(store.sync_state("prop-a"), Some(SyncState::Pending));

        let restored = store.rollback("prop-a").unwrap().unwrap();
        assert_eq!(restored.price, 500_000.0);
        assert_eq!(store.get("prop-a").unwrap().price, 500_000.0);
        assert_eq!(store.sync_state("prop-a"), Some(SyncState::Confirmed));
    }

    #[test]
    fn test_rollback_of_local_create_drops_entity() {
        let mut store = store();
        let fresh = listing("prop-new", 300_000.0, PropertyStatus::Active, PropertyType::Land, 0);
        store.insert(fresh).unwrap();
        store.select("prop-new").unwrap();
        assert_eq!(store.stats().total, 4);

        assert!(store.rollback("prop-new").unwrap().is_none());
        assert!(!store.contains("prop-new"));
        assert!(store.selected().is_empty());
        assert_eq!(store.stats().total, 3);
    }

    #[test]
    fn test_confirm_clears_pending() {
        let mut store = store();
        let fresh = listing("prop-new", 300_000.0, PropertyStatus::Active, PropertyType::Land, 0);
        store.insert(fresh).unwrap();
        assert_eq!(store.pending_ids(), vec!["prop-new".to_string()]);
        store.confirm("prop-new").unwrap();
        assert!(store.pending_ids().is_empty());
        assert!(store.confirm("prop-missing").is_err());
    }

    #[test]
    fn test_selection_is_pruned_on_remove() {
        let mut store = store();
        store.select("prop-a").unwrap();
        store.select("prop-b").unwrap();
        store.remove_entry("prop-a").unwrap();
        assert_eq!(store.selected(), vec!["prop-b"]);
    }

    #[test]
    fn test_selection_is_independent_of_view() {
        let mut store = store();
        store.select("prop-c").unwrap();
        store
            .set_filter(FilterSpec::new().with("status", Constraint::any_of(["active"])))
            .unwrap();
        assert!(store.is_selected("prop-c"));

        store.select_all_visible();
        assert_eq!(store.selected(), vec!["prop-a", "prop-b", "prop-c"]);

        assert!(!store.toggle("prop-b").unwrap());
        assert!(store.toggle("prop-b").unwrap());
        assert!(store.toggle("prop-missing").is_err());

        store.clear_selection();
        assert!(store.selected().is_empty());
    }

    #[test]
    fn test_hydrate_prunes_stale_selection() {
        let mut store = store();
        store.select("prop-a").unwrap();
        store.hydrate(vec![listing("prop-b", 1.0, PropertyStatus::Active, PropertyType::Land, 0)]);
        assert!(store.selected().is_empty());
    }

    #[test]
    fn test_next_id_uses_kind_prefix() {
        let store = store();
        let id = store.next_id("Harbor loft");
        assert!(id.starts_with("prop-"));
        assert!(!store.contains(&id));
    }
}
