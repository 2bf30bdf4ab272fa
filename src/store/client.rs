//! Client relationship store.

use chrono::{DateTime, Utc};

use super::Collection;
use crate::engine::transition;
use crate::models::{Client, ClientDraft, ClientPatch, ClientStatus, Entity, Note, NoteType, insert_unique};
use crate::Result;

pub type ClientStore = Collection<Client>;

impl Collection<Client> {
    pub fn create(&mut self, draft: ClientDraft) -> Result<Client> {
        let id = self.next_id(&format!("{}{}", draft.email, draft.first_name));
        let client = draft.into_client(id, self.now());
        self.insert(client)
    }

    pub fn update(&mut self, id: &str, patch: &ClientPatch) -> Result<Client> {
        self.modify(id, |current, now| {
            let mut next = current.clone();
            patch.apply(&mut next);
            next.touch(now);
            Ok(next)
        })
    }

    pub fn set_status(&mut self, id: &str, status: ClientStatus) -> Result<Client> {
        self.modify(id, |current, now| transition(current, status, now))
    }

    pub fn remove(&mut self, id: &str) -> Result<Client> {
        self.remove_entry(id)
    }

    /// Append a note. Existing notes are never edited.
    pub fn add_note(
        &mut self,
        id: &str,
        content: &str,
        note_type: NoteType,
        author: &str,
    ) -> Result<Client> {
        self.modify(id, |current, now| {
            let note = Note::new(content, note_type, author, now);
            note.validate()?;
            let mut next = current.clone();
            next.notes.push(note);
            next.touch(now);
            Ok(next)
        })
    }

    /// Set or clear the next follow-up date.
    pub fn schedule_follow_up(&mut self, id: &str, when: Option<DateTime<Utc>>) -> Result<Client> {
        self.modify(id, |current, now| {
            let mut next = current.clone();
            next.next_follow_up = when;
            next.touch(now);
            Ok(next)
        })
    }

    /// Add a property to the client's interests. Already present is a no-op.
    pub fn add_property_interest(&mut self, id: &str, property_id: &str) -> Result<Client> {
        let current = self.get(id)?;
        if current.property_interests.iter().any(|p| p == property_id) {
            return Ok(current.clone());
        }
        self.modify(id, |current, now| {
            let mut next = current.clone();
            insert_unique(&mut next.property_interests, property_id);
            next.touch(now);
            Ok(next)
        })
    }

    /// Drop a property from the client's interests. Absent is a no-op.
    pub fn remove_property_interest(&mut self, id: &str, property_id: &str) -> Result<Client> {
        let current = self.get(id)?;
        if !current.property_interests.iter().any(|p| p == property_id) {
            return Ok(current.clone());
        }
        self.modify(id, |current, now| {
            let mut next = current.clone();
            next.property_interests.retain(|p| p != property_id);
            next.touch(now);
            Ok(next)
        })
    }

    /// Record a transaction against the client, once.
    pub fn link_transaction(&mut self, id: &str, transaction_id: &str) -> Result<Client> {
        let current = self.get(id)?;
        if current.transactions.iter().any(|t| t == transaction_id) {
            return Ok(current.clone());
        }
        self.modify(id, |current, now| {
            let mut next = current.clone();
            insert_unique(&mut next.transactions, transaction_id);
            next.touch(now);
            Ok(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::clock::FixedClock;
    use crate::engine::ClientFilter;
    use crate::models::{Budget, ClientType};
    use crate::test_utils::{test_clock, test_now};
    use chrono::Duration;
    use std::sync::Arc;

    fn draft(first: &str, min: f64, max: f64) -> ClientDraft {
        ClientDraft {
            first_name: first.to_string(),
            last_name: "Buyer".to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            client_type: ClientType::Buyer,
            budget: Some(Budget {
                min: Some(min),
                max: Some(max),
                pre_approved: true,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_rejects_bad_email() {
        let mut store = ClientStore::new(test_clock());
        let mut bad = draft("Ana", 1.0, 2.0);
        bad.email = "not-an-address".to_string();
        assert!(matches!(store.create(bad), Err(Error::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_min_budget_filter() {
        let mut store = ClientStore::new(test_clock());
        store.create(draft("Ana", 1_800_000.0, 2_800_000.0)).unwrap();
        let wanted = store.create(draft("Ben", 2_500_000.0, 4_000_000.0)).unwrap();

        let filter = ClientFilter {
            min_budget: Some(2_000_000.0),
            ..Default::default()
        };
        let found = store.list(&filter.to_spec()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, wanted.id);
    }

    #[test]
    fn test_notes_are_appended_in_order() {
        let mut store = ClientStore::new(test_clock());
        let client = store.create(draft("Ana", 1.0, 2.0)).unwrap();

        store
            .add_note(&client.id, "Intro call", NoteType::Call, "agent-1")
            .unwrap();
        let updated = store
            .add_note(&client.id, "Sent listings", NoteType::Email, "agent-1")
            .unwrap();

        let contents: Vec<&str> = updated.notes.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["Intro call", "Sent listings"]);
        assert_eq!(updated.notes[0].created_at, test_now());

        let empty = store.add_note(&client.id, "", NoteType::General, "agent-1");
        assert!(matches!(empty, Err(Error::Validation(_))));
        assert_eq!(store.get(&client.id).unwrap().notes.len(), 2);
    }

    #[test]
    fn test_follow_up_drives_attention_count() {
        let clock = Arc::new(FixedClock::new(test_now()));
        let mut store = ClientStore::new(clock.clone());
        let client = store.create(draft("Ana", 1.0, 2.0)).unwrap();

        store
            .schedule_follow_up(&client.id, Some(test_now() + Duration::days(1)))
            .unwrap();
        assert_eq!(store.stats().needs_attention, 0);

        clock.advance(Duration::days(2));
        assert_eq!(store.stats().needs_attention, 0);
        store.refresh();
        assert_eq!(store.stats().needs_attention, 1);

        store.schedule_follow_up(&client.id, None).unwrap();
        assert_eq!(store.stats().needs_attention, 0);
    }

    #[test]
    fn test_property_interests_have_set_semantics() {
        let mut store = ClientStore::new(test_clock());
        let client = store.create(draft("Ana", 1.0, 2.0)).unwrap();

        store.add_property_interest(&client.id, "prop-1").unwrap();
        store.add_property_interest(&client.id, "prop-2").unwrap();
        let updated = store.add_property_interest(&client.id, "prop-1").unwrap();
        assert_eq!(updated.property_interests, vec!["prop-1", "prop-2"]);

        let updated = store.remove_property_interest(&client.id, "prop-1").unwrap();
        assert_eq!(updated.property_interests, vec!["prop-2"]);
    }

    #[test]
    fn test_link_transaction_once() {
        let mut store = ClientStore::new(test_clock());
        let client = store.create(draft("Ana", 1.0, 2.0)).unwrap();
        store.link_transaction(&client.id, "txn-1").unwrap();
        let updated = store.link_transaction(&client.id, "txn-1").unwrap();
        assert_eq!(updated.transactions, vec!["txn-1"]);
    }

    #[test]
    fn test_unchanged_sets_keep_client_confirmed() {
        let mut store = ClientStore::new(test_clock());
        let client = store.create(draft("Ana", 1.0, 2.0)).unwrap();
        store.add_property_interest(&client.id, "prop-1").unwrap();
        store.link_transaction(&client.id, "txn-1").unwrap();
        store.confirm(&client.id).unwrap();

        store.add_property_interest(&client.id, "prop-1").unwrap();
        store.remove_property_interest(&client.id, "prop-9").unwrap();
        store.link_transaction(&client.id, "txn-1").unwrap();
        assert_eq!(store.sync_state(&client.id), Some(crate::store::SyncState::Confirmed));
    }

    #[test]
    fn test_update_and_status() {
        let mut store = ClientStore::new(test_clock());
        let client = store.create(draft("Ana", 1.0, 2.0)).unwrap();
        let patch = ClientPatch {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        let updated = store.update(&client.id, &patch).unwrap();
        assert_eq!(updated.phone, "555-0100");

        let closed = store.set_status(&client.id, ClientStatus::Closed).unwrap();
        assert_eq!(closed.status, ClientStatus::Closed);
        assert_eq!(store.stats().status_count("closed"), 1);
    }
}
