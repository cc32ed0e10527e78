//! # Datasets
//!
//! The adapter does not own any records. It talks to whatever holds them
//! through two small traits:
//!
//! - [`Dataset`]: a readable snapshot of the data plus a way to replace it
//!   wholesale (`load` for a single record, `reload` for a collection).
//! - [`Observable`]: registration of mutation handlers, used by live sync.
//!
//! A dataset is either a single record ([`DatasetKind::Model`]) or an ordered
//! collection of records ([`DatasetKind::Store`]).
//!
//! ## Implementations
//!
//! - [`record::Record`]: a single record with named fields and relationships
//! - [`store::RecordStore`]: an ordered collection of records
//!
//! Both emit the mutation names the live-sync bridge listens for:
//!
//! ```text
//! model: field.create  field.update  field.remove  relationship.create  relationship.remove
//! store: record.create record.update record.delete clear
//! ```

use crate::envelope::{Fields, Payload};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub mod record;
pub mod store;

pub use record::Record;
pub use store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Model,
    Store,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Model => write!(f, "model"),
            DatasetKind::Store => write!(f, "store"),
        }
    }
}

pub trait Dataset {
    fn kind(&self) -> DatasetKind;

    /// Current data, shaped for the envelope.
    fn snapshot(&self) -> Payload;

    /// Replace the in-memory data with `data`.
    fn apply(&mut self, data: Payload) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    FieldCreate,
    FieldUpdate,
    FieldRemove,
    RelationshipCreate,
    RelationshipRemove,
    RecordCreate,
    RecordUpdate,
    RecordDelete,
    Clear,
}

impl MutationKind {
    pub fn name(&self) -> &'static str {
        match self {
            MutationKind::FieldCreate => "field.create",
            MutationKind::FieldUpdate => "field.update",
            MutationKind::FieldRemove => "field.remove",
            MutationKind::RelationshipCreate => "relationship.create",
            MutationKind::RelationshipRemove => "relationship.remove",
            MutationKind::RecordCreate => "record.create",
            MutationKind::RecordUpdate => "record.update",
            MutationKind::RecordDelete => "record.delete",
            MutationKind::Clear => "clear",
        }
    }
}

/// A single field change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// What happened, handed to every subscribed handler after the data changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub kind: MutationKind,
    /// Field or relationship name, for model mutations.
    pub name: Option<String>,
    /// The affected record's fields, for store mutations.
    pub record: Option<Fields>,
    pub change: Option<Change>,
}

impl Mutation {
    pub fn new(kind: MutationKind) -> Self {
        Self {
            kind,
            name: None,
            record: None,
            change: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_record(mut self, record: Fields) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_change(mut self, change: Change) -> Self {
        self.change = Some(change);
        self
    }
}

pub type MutationHandler = Arc<dyn Fn(&Mutation, &dyn Dataset) -> Result<()> + Send + Sync>;

pub trait Observable: Dataset {
    fn subscribe(&mut self, kind: MutationKind, handler: MutationHandler);

    /// Subscribe on behalf of `owner`, so the registration can be recognized
    /// later through [`Observable::is_subscribed`].
    fn subscribe_as(&mut self, owner: Uuid, kind: MutationKind, handler: MutationHandler);

    /// Whether `owner` registered any handler on this dataset.
    fn is_subscribed(&self, owner: Uuid) -> bool;

    /// Mutation kinds that currently have at least one handler.
    fn subscriptions(&self) -> Vec<MutationKind>;
}

struct Subscription {
    owner: Option<Uuid>,
    handler: MutationHandler,
}

/// Handler lists keyed by mutation kind.
#[derive(Default)]
pub struct Observers {
    handlers: HashMap<MutationKind, Vec<Subscription>>,
}

impl Observers {
    pub fn subscribe(&mut self, kind: MutationKind, handler: MutationHandler) {
        self.push(kind, None, handler);
    }

    pub fn subscribe_as(&mut self, owner: Uuid, kind: MutationKind, handler: MutationHandler) {
        self.push(kind, Some(owner), handler);
    }

    fn push(&mut self, kind: MutationKind, owner: Option<Uuid>, handler: MutationHandler) {
        self.handlers
            .entry(kind)
            .or_default()
            .push(Subscription { owner, handler });
    }

    pub fn is_subscribed(&self, owner: Uuid) -> bool {
        self.handlers
            .values()
            .flatten()
            .any(|sub| sub.owner == Some(owner))
    }

    pub fn kinds(&self) -> Vec<MutationKind> {
        self.handlers
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Run every handler for `mutation.kind` in registration order, stopping at
    /// the first failure.
    pub fn notify(&self, mutation: &Mutation, dataset: &dyn Dataset) -> Result<()> {
        if let Some(list) = self.handlers.get(&mutation.kind) {
            for sub in list {
                (sub.handler)(mutation, dataset)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// A detached copy of whatever a data file holds. Used where the kind of the
/// data is only known after reading it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    data: Payload,
}

impl Snapshot {
    pub fn new(data: Payload) -> Self {
        Self { data }
    }
}

impl Dataset for Snapshot {
    fn kind(&self) -> DatasetKind {
        self.data.kind()
    }

    fn snapshot(&self) -> Payload {
        self.data.clone()
    }

    fn apply(&mut self, data: Payload) -> Result<()> {
        self.data = data;
        Ok(())
    }
}
