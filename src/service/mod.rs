//! Brokerage service: the operations exposed to callers.
//!
//! A [`Brokerage`] owns one store per entity kind and a [`RemoteBackend`].
//! Creates and updates are applied to the store first and then pushed to the
//! backend; a successful push confirms the local change. A failed push leaves
//! the change pending, records the failure in the error slot for that
//! operation kind and returns [`Error::Transport`]. Reconciliation is up to
//! the caller through [`Brokerage::rollback`], or by retrying: a later write
//! to a record whose create never landed is sent as that create. Deletes reach
//! the backend before the local record is removed, except for records the
//! backend never saw.

mod errors;
mod page;

pub use crate::remote::OperationKind;
pub use errors::ErrorSlots;
pub use page::{Page, paginate};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::engine::{
    Aggregatable, DateRange, Deadline, FilterSpec, Filterable, MilestoneSpec, Statistics,
    TransactionAnalytics,
};
use crate::models::{
    Client, ClientDraft, ClientPatch, ClientStatus, Entity, EntityKind, FinancialsPatch, NoteType,
    Property, PropertyDraft, PropertyPatch, PropertyStatus, Transaction, TransactionDraft,
    TransactionStatus,
};
use crate::remote::RemoteBackend;
use crate::store::{ClientStore, Collection, PropertyStore, SyncState, TransactionStore};
use crate::{Error, Result};

/// Tunables supplied by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Percent applied when a new transaction carries no rate
    pub default_commission_rate: f64,
    /// Page size used when a list call passes none
    pub page_size: usize,
    /// Horizon for upcoming deadlines when a call passes none
    pub deadline_days: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_commission_rate: 3.0,
            page_size: 20,
            deadline_days: 7,
        }
    }
}

/// Stores plus the remote boundary they synchronize with.
pub struct Brokerage<B: RemoteBackend> {
    backend: B,
    settings: ServiceSettings,
    properties: PropertyStore,
    clients: ClientStore,
    transactions: TransactionStore,
    errors: ErrorSlots,
}

impl<B: RemoteBackend> Brokerage<B> {
    pub fn new(backend: B, clock: Arc<dyn Clock>, settings: ServiceSettings) -> Self {
        Self {
            backend,
            settings,
            properties: PropertyStore::new(clock.clone()),
            clients: ClientStore::new(clock.clone()),
            transactions: TransactionStore::new(clock),
            errors: ErrorSlots::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Direct store access. Mutations made here bypass the backend and the
    /// error slots; use it for filter and selection state.
    pub fn properties_mut(&mut self) -> &mut PropertyStore {
        &mut self.properties
    }

    pub fn clients(&self) -> &ClientStore {
        &self.clients
    }

    /// See [`Brokerage::properties_mut`].
    pub fn clients_mut(&mut self) -> &mut ClientStore {
        &mut self.clients
    }

    pub fn transactions(&self) -> &TransactionStore {
        &self.transactions
    }

    /// See [`Brokerage::properties_mut`].
    pub fn transactions_mut(&mut self) -> &mut TransactionStore {
        &mut self.transactions
    }

    pub fn errors(&self) -> &ErrorSlots {
        &self.errors
    }

    pub fn last_error(&self, kind: EntityKind, operation: OperationKind) -> Option<&str> {
        self.errors.get(kind, operation)
    }

    /// Load every store from the backend.
    pub fn hydrate(&mut self) -> Result<()> {
        let properties = Self::fetch(&self.backend, &mut self.errors)?;
        let clients = Self::fetch(&self.backend, &mut self.errors)?;
        let transactions = Self::fetch(&self.backend, &mut self.errors)?;
        self.properties.hydrate(properties);
        self.clients.hydrate(clients);
        self.transactions.hydrate(transactions);
        tracing::debug!(
            properties = self.properties.len(),
            clients = self.clients.len(),
            transactions = self.transactions.len(),
            location = %self.backend.location(),
            "hydrated stores"
        );
        Ok(())
    }

    /// Identities with unconfirmed local changes.
    pub fn pending(&self, kind: EntityKind) -> Vec<String> {
        match kind {
            EntityKind::Property => self.properties.pending_ids(),
            EntityKind::Client => self.clients.pending_ids(),
            EntityKind::Transaction => self.transactions.pending_ids(),
        }
    }

    pub fn sync_state(&self, kind: EntityKind, id: &str) -> Option<SyncState> {
        match kind {
            EntityKind::Property => self.properties.sync_state(id),
            EntityKind::Client => self.clients.sync_state(id),
            EntityKind::Transaction => self.transactions.sync_state(id),
        }
    }

    /// Discard an unconfirmed local change. Returns whether the entity still exists.
    pub fn rollback(&mut self, kind: EntityKind, id: &str) -> Result<bool> {
        let restored = match kind {
            EntityKind::Property => self.properties.rollback(id)?.is_some(),
            EntityKind::Client => self.clients.rollback(id)?.is_some(),
            EntityKind::Transaction => self.transactions.rollback(id)?.is_some(),
        };
        Ok(restored)
    }

    // Properties

    pub fn list_properties(
        &self,
        filter: &FilterSpec,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<Property>> {
        let items = self.properties.list(filter)?;
        paginate(&items, page, limit.unwrap_or(self.settings.page_size))
    }

    pub fn get_property(&self, id: &str) -> Result<Property> {
        self.properties.get(id).cloned()
    }

    pub fn create_property(&mut self, draft: PropertyDraft) -> Result<Property> {
        let property = self.properties.create(draft)?;
        self.push_property(OperationKind::Create, &property)?;
        Ok(property)
    }

    pub fn update_property(&mut self, id: &str, patch: &PropertyPatch) -> Result<Property> {
        let property = self.properties.update(id, patch)?;
        self.push_property(OperationKind::Update, &property)?;
        Ok(property)
    }

    pub fn set_property_status(&mut self, id: &str, status: PropertyStatus) -> Result<Property> {
        let property = self.properties.set_status(id, status)?;
        self.push_property(OperationKind::Update, &property)?;
        Ok(property)
    }

    pub fn delete_property(&mut self, id: &str) -> Result<Property> {
        self.properties.get(id)?;
        if self.properties.is_local_create(id) {
            return self.properties.remove(id);
        }
        let result = self.backend.delete(EntityKind::Property, id);
        self.errors
            .settle(EntityKind::Property, OperationKind::Delete, result)?;
        self.properties.remove(id)
    }

    pub fn property_stats(&self, filter: &FilterSpec) -> Result<Statistics> {
        self.properties.stats_for(filter)
    }

    // Clients

    pub fn list_clients(
        &self,
        filter: &FilterSpec,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<Client>> {
        let items = self.clients.list(filter)?;
        paginate(&items, page, limit.unwrap_or(self.settings.page_size))
    }

    pub fn get_client(&self, id: &str) -> Result<Client> {
        self.clients.get(id).cloned()
    }

    pub fn create_client(&mut self, draft: ClientDraft) -> Result<Client> {
        let client = self.clients.create(draft)?;
        self.push_client(OperationKind::Create, &client)?;
        Ok(client)
    }

    pub fn update_client(&mut self, id: &str, patch: &ClientPatch) -> Result<Client> {
        let client = self.clients.update(id, patch)?;
        self.push_client(OperationKind::Update, &client)?;
        Ok(client)
    }

    pub fn set_client_status(&mut self, id: &str, status: ClientStatus) -> Result<Client> {
        let client = self.clients.set_status(id, status)?;
        self.push_client(OperationKind::Update, &client)?;
        Ok(client)
    }

    pub fn delete_client(&mut self, id: &str) -> Result<Client> {
        self.clients.get(id)?;
        if self.clients.is_local_create(id) {
            return self.clients.remove(id);
        }
        let result = self.backend.delete(EntityKind::Client, id);
        self.errors
            .settle(EntityKind::Client, OperationKind::Delete, result)?;
        self.clients.remove(id)
    }

    pub fn add_client_note(
        &mut self,
        id: &str,
        content: &str,
        note_type: NoteType,
        author: &str,
    ) -> Result<Client> {
        let client = self.clients.add_note(id, content, note_type, author)?;
        self.push_client(OperationKind::Update, &client)?;
        Ok(client)
    }

    pub fn schedule_follow_up(
        &mut self,
        id: &str,
        when: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Client> {
        let client = self.clients.schedule_follow_up(id, when)?;
        self.push_client(OperationKind::Update, &client)?;
        Ok(client)
    }

    pub fn add_property_interest(&mut self, id: &str, property_id: &str) -> Result<Client> {
        let client = self.clients.add_property_interest(id, property_id)?;
        self.push_client(OperationKind::Update, &client)?;
        Ok(client)
    }

    pub fn remove_property_interest(&mut self, id: &str, property_id: &str) -> Result<Client> {
        let client = self.clients.remove_property_interest(id, property_id)?;
        self.push_client(OperationKind::Update, &client)?;
        Ok(client)
    }

    pub fn client_stats(&self, filter: &FilterSpec) -> Result<Statistics> {
        self.clients.stats_for(filter)
    }

    // Transactions

    pub fn list_transactions(&self, filter: &FilterSpec) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .list(filter)?
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get_transaction(&self, id: &str) -> Result<Transaction> {
        self.transactions.get(id).cloned()
    }

    /// Open a transaction and, when the client is known locally, record it
    /// on the client.
    pub fn create_transaction(&mut self, draft: TransactionDraft) -> Result<Transaction> {
        let transaction = self
            .transactions
            .create(draft, self.settings.default_commission_rate)?;
        self.push_transaction(OperationKind::Create, &transaction)?;

        if self.clients.contains(&transaction.client_id) {
            let client = self
                .clients
                .link_transaction(&transaction.client_id, &transaction.id)?;
            self.push_client(OperationKind::Update, &client)?;
        }
        Ok(transaction)
    }

    pub fn update_transaction_status(
        &mut self,
        id: &str,
        status: TransactionStatus,
    ) -> Result<Transaction> {
        let transaction = self.transactions.update_status(id, status)?;
        self.push_transaction(OperationKind::Update, &transaction)?;
        Ok(transaction)
    }

    pub fn add_milestone(&mut self, id: &str, spec: MilestoneSpec) -> Result<Transaction> {
        let transaction = self.transactions.add_milestone(id, spec)?;
        self.push_transaction(OperationKind::Update, &transaction)?;
        Ok(transaction)
    }

    pub fn complete_milestone(&mut self, id: &str, milestone_id: &str) -> Result<Transaction> {
        let transaction = self.transactions.complete_milestone(id, milestone_id)?;
        self.push_transaction(OperationKind::Update, &transaction)?;
        Ok(transaction)
    }

    pub fn add_transaction_note(
        &mut self,
        id: &str,
        content: &str,
        note_type: NoteType,
        author: &str,
    ) -> Result<Transaction> {
        let transaction = self.transactions.add_note(id, content, note_type, author)?;
        self.push_transaction(OperationKind::Update, &transaction)?;
        Ok(transaction)
    }

    pub fn update_financials(&mut self, id: &str, patch: &FinancialsPatch) -> Result<Transaction> {
        let transaction = self.transactions.update_financials(id, patch)?;
        self.push_transaction(OperationKind::Update, &transaction)?;
        Ok(transaction)
    }

    pub fn mark_commission_paid(&mut self, id: &str) -> Result<Transaction> {
        let transaction = self.transactions.mark_commission_paid(id)?;
        self.push_transaction(OperationKind::Update, &transaction)?;
        Ok(transaction)
    }

    pub fn transaction_stats(&self, filter: &FilterSpec) -> Result<Statistics> {
        self.transactions.stats_for(filter)
    }

    pub fn get_analytics(&self, agent_id: &str, range: DateRange) -> TransactionAnalytics {
        self.transactions.analytics(agent_id, range)
    }

    pub fn get_upcoming_deadlines(&self, agent_id: &str, days: Option<i64>) -> Vec<Deadline> {
        self.transactions
            .upcoming_deadlines(agent_id, days.unwrap_or(self.settings.deadline_days))
    }

    // Remote plumbing

    fn push_property(&mut self, operation: OperationKind, property: &Property) -> Result<()> {
        Self::push(
            &mut self.backend,
            &mut self.errors,
            &mut self.properties,
            operation,
            property,
        )
    }

    fn push_client(&mut self, operation: OperationKind, client: &Client) -> Result<()> {
        Self::push(
            &mut self.backend,
            &mut self.errors,
            &mut self.clients,
            operation,
            client,
        )
    }

    fn push_transaction(
        &mut self,
        operation: OperationKind,
        transaction: &Transaction,
    ) -> Result<()> {
        Self::push(
            &mut self.backend,
            &mut self.errors,
            &mut self.transactions,
            operation,
            transaction,
        )
    }

    /// Send a create or update, confirming the local copy on success.
    ///
    /// An update to a record the backend never acknowledged is sent as its
    /// create. An update that left the record confirmed sends nothing.
    fn push<E>(
        backend: &mut B,
        errors: &mut ErrorSlots,
        store: &mut Collection<E>,
        operation: OperationKind,
        entity: &E,
    ) -> Result<()>
    where
        E: Entity + Filterable + Aggregatable,
    {
        let operation = match operation {
            OperationKind::Update if store.is_local_create(entity.id()) => OperationKind::Create,
            OperationKind::Update if store.sync_state(entity.id()) == Some(SyncState::Confirmed) => {
                return Ok(());
            }
            other => other,
        };
        let record = serde_json::to_value(entity)?;
        let result = match operation {
            OperationKind::Create => backend.create(E::KIND, entity.id(), &record),
            OperationKind::Update => backend.update(E::KIND, entity.id(), &record),
            other => {
                return Err(Error::Other(format!("{} is not a write operation", other)));
            }
        };
        errors.settle(E::KIND, operation, result)?;
        store.confirm(entity.id())
    }

    fn fetch<E: Entity>(backend: &B, errors: &mut ErrorSlots) -> Result<Vec<E>> {
        let records = errors.settle(E::KIND, OperationKind::Fetch, backend.fetch_all(E::KIND))?;
        records
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(Error::from))
            .collect()
    }
}
