//! Property listings store.

use super::Collection;
use crate::engine::transition;
use crate::models::{Entity, Property, PropertyDraft, PropertyPatch, PropertyStatus};
use crate::Result;

pub type PropertyStore = Collection<Property>;

impl Collection<Property> {
    /// Validate and add a new listing.
    pub fn create(&mut self, draft: PropertyDraft) -> Result<Property> {
        let id = self.next_id(&draft.title);
        let property = draft.into_property(id, self.now());
        self.insert(property)
    }

    /// Apply `patch` to a copy of the listing and store it if it still validates.
    pub fn update(&mut self, id: &str, patch: &PropertyPatch) -> Result<Property> {
        self.modify(id, |current, now| {
            let mut next = current.clone();
            patch.apply(&mut next);
            next.touch(now);
            Ok(next)
        })
    }

    pub fn set_status(&mut self, id: &str, status: PropertyStatus) -> Result<Property> {
        self.modify(id, |current, now| transition(current, status, now))
    }

    pub fn remove(&mut self, id: &str) -> Result<Property> {
        self.remove_entry(id)
    }
}
