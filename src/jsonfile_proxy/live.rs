//! # Live Sync
//!
//! Once enabled, every mutation the dataset reports triggers a full save, and
//! the matching `live.*` event is emitted after that save completes:
//!
//! | model mutation        | store mutation  | emitted       |
//! |-----------------------|-----------------|---------------|
//! | `field.create`        | `record.create` | `live.create` |
//! | `field.update`        | `record.update` | `live.update` |
//! | `field.remove`        | `record.delete` | `live.delete` |
//! | `relationship.remove` | `clear`         | `live.delete` |
//!
//! `relationship.create` is left out on purpose: a new relationship carries no
//! data yet, and filling it in already produces a `field.update`. Listening to
//! both would write twice.
//!
//! Saves are neither coalesced nor debounced; N mutations give N complete
//! lock/write/unlock cycles, each finished before its event goes out.

use crate::dataset::{Dataset, DatasetKind, Mutation, MutationHandler, MutationKind, Observable};
use crate::error::Result;
use crate::events::ProxyEvent;
use crate::proxy::JsonFileProxy;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Create,
    Update,
    Delete,
}

impl Outcome {
    fn event(self, mutation: &Mutation) -> ProxyEvent {
        let record = mutation.record.clone();
        match self {
            Outcome::Create => ProxyEvent::LiveCreate { record },
            Outcome::Update => ProxyEvent::LiveUpdate {
                record,
                change: mutation.change.clone(),
            },
            Outcome::Delete => ProxyEvent::LiveDelete { record },
        }
    }
}

const MODEL_TRIGGERS: &[(MutationKind, Outcome)] = &[
    (MutationKind::FieldCreate, Outcome::Create),
    (MutationKind::FieldUpdate, Outcome::Update),
    (MutationKind::FieldRemove, Outcome::Delete),
    (MutationKind::RelationshipRemove, Outcome::Delete),
];

const STORE_TRIGGERS: &[(MutationKind, Outcome)] = &[
    (MutationKind::RecordCreate, Outcome::Create),
    (MutationKind::RecordUpdate, Outcome::Update),
    (MutationKind::RecordDelete, Outcome::Delete),
    (MutationKind::Clear, Outcome::Delete),
];

fn triggers(kind: DatasetKind) -> &'static [(MutationKind, Outcome)] {
    match kind {
        DatasetKind::Model => MODEL_TRIGGERS,
        DatasetKind::Store => STORE_TRIGGERS,
    }
}

/// Mutation kinds live sync subscribes to for a dataset of `kind`.
pub fn triggered_by(kind: DatasetKind) -> Vec<MutationKind> {
    triggers(kind).iter().map(|(trigger, _)| *trigger).collect()
}

impl JsonFileProxy {
    /// Subscribe to `dataset`'s mutations so each one is saved immediately.
    ///
    /// Enabling twice on the same dataset through this proxy (or any of its
    /// clones) is a no-op; other datasets sharing the proxy get their own handlers.
    /// A failed save is returned from the mutation call that triggered it.
    pub fn enable_live_sync(&self, dataset: &mut dyn Observable) -> Result<()> {
        let kind = dataset.kind();
        self.bind(kind)?;

        let owner = self.id();
        if dataset.is_subscribed(owner) {
            debug!("live sync already enabled for this dataset");
            return Ok(());
        }

        for &(trigger, outcome) in triggers(kind) {
            let proxy = self.clone();
            let handler: MutationHandler =
                Arc::new(move |mutation: &Mutation, current: &dyn Dataset| {
                    debug!(mutation = mutation.kind.name(), "live sync save");
                    proxy.save_with(current, || proxy.emit(outcome.event(mutation)))
                });
            dataset.subscribe_as(owner, trigger, handler);
        }

        debug!(
            path = %self.target().full_path().display(),
            %kind,
            "live sync enabled"
        );
        Ok(())
    }
}
