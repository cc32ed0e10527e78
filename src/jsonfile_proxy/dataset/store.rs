use super::record::SharedAdapter;
use super::{Change, Dataset, DatasetKind, Mutation, MutationHandler, MutationKind, Observable, Observers, Record};
use crate::envelope::{Envelope, Payload};
use crate::error::{ProxyError, Result};
use crate::proxy::PersistenceAdapter;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// An ordered collection of records. Insertion order is the persisted order.
#[derive(Default)]
pub struct RecordStore {
    records: Vec<Record>,
    observers: Observers,
    proxy: Option<SharedAdapter>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proxy<P>(mut self, proxy: P) -> Self
    where
        P: PersistenceAdapter + Send + Sync + 'static,
    {
        self.proxy = Some(Arc::new(proxy));
        self
    }

    /// Append a record built from a JSON object and emit `record.create`.
    ///
    /// The record stays in the collection even when a handler fails; the error
    /// reports the failed follow-up (typically a live-sync save).
    pub fn add(&mut self, value: Value) -> Result<Uuid> {
        let record = Record::from_value(value)?;
        let id = record.id();
        let data = record.data();
        self.records.push(record);
        self.notify(Mutation::new(MutationKind::RecordCreate).with_record(data))?;
        Ok(id)
    }

    /// Change one field of a record and emit `record.update`.
    pub fn update(&mut self, id: Uuid, field: &str, value: Value) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(ProxyError::RecordNotFound(id))?;

        let old = record.get(field).cloned().unwrap_or(Value::Null);
        if old == value {
            return Ok(());
        }
        record.set_silent(field, value.clone())?;
        let data = record.data();

        self.notify(
            Mutation::new(MutationKind::RecordUpdate)
                .with_record(data)
                .with_change(Change {
                    field: field.to_string(),
                    old,
                    new: value,
                }),
        )
    }

    /// Remove a record and emit `record.delete` with its last known fields.
    pub fn remove(&mut self, id: Uuid) -> Result<Record> {
        let position = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or(ProxyError::RecordNotFound(id))?;
        let removed = self.records.remove(position);
        self.notify(Mutation::new(MutationKind::RecordDelete).with_record(removed.data()))?;
        Ok(removed)
    }

    /// Drop every record and emit `clear`.
    pub fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.notify(Mutation::new(MutationKind::Clear))
    }

    /// Replace the whole collection, keeping the input order.
    pub fn reload(&mut self, records: Vec<crate::envelope::Fields>) {
        self.records = records.into_iter().map(Record::from_fields).collect();
    }

    pub fn get(&self, id: Uuid) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn notify(&self, mutation: Mutation) -> Result<()> {
        self.observers.notify(&mutation, self)
    }

    fn adapter(&self) -> Result<SharedAdapter> {
        self.proxy.clone().ok_or_else(|| {
            ProxyError::Configuration("store has no persistence adapter".to_string())
        })
    }

    pub fn save(&self) -> Result<()> {
        self.adapter()?.save(self)
    }

    pub fn fetch(&mut self) -> Result<Envelope> {
        let adapter = self.adapter()?;
        adapter.fetch(self)
    }

    pub fn enable_live_sync(&mut self) -> Result<()> {
        let adapter = self.adapter()?;
        adapter.enable_live_sync(self)
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("records", &self.records)
            .field("observers", &self.observers)
            .field("proxy", &self.proxy.is_some())
            .finish()
    }
}

impl Dataset for RecordStore {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Store
    }

    fn snapshot(&self) -> Payload {
        Payload::Records(self.records.iter().map(Record::data).collect())
    }

    fn apply(&mut self, data: Payload) -> Result<()> {
        self.reload(data.into_records()?);
        Ok(())
    }
}

impl Observable for RecordStore {
    fn subscribe(&mut self, kind: MutationKind, handler: MutationHandler) {
        self.observers.subscribe(kind, handler);
    }

    fn subscribe_as(&mut self, owner: Uuid, kind: MutationKind, handler: MutationHandler) {
        self.observers.subscribe_as(owner, kind, handler);
    }

    fn is_subscribed(&self, owner: Uuid) -> bool {
        self.observers.is_subscribed(owner)
    }

    fn subscriptions(&self) -> Vec<MutationKind> {
        self.observers.kinds()
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use serde_json::json;

    /// Two people, in insertion order: the Doctor, then the Master.
    pub fn people() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .add(json!({"firstname": "The", "lastname": "Doctor"}))
            .expect("fixture add");
        store
            .add(json!({"firstname": "The", "lastname": "Master"}))
            .expect("fixture add");
        store
    }

    /// The Doctor with a `pet` relationship.
    pub fn doctor_with_pet() -> Record {
        let mut record = Record::from_value(json!({
            "firstname": "The",
            "lastname": "Doctor",
            "val": 15,
        }))
        .expect("fixture record");
        let pet = Record::from_value(json!({"name": "K-9", "breed": "Robodog"}))
            .expect("fixture pet");
        record
            .add_relationship("pet", pet)
            .expect("fixture relationship");
        record
    }
}
