//! Adapter notifications.
//!
//! Listeners are registered by event name (`save`, `fetch`, `live.create`,
//! `live.update`, `live.delete`) and receive the emitted [`ProxyEvent`].
//! Emission snapshots the listener list before invoking anything, so a listener
//! may register further listeners without deadlocking.

use crate::dataset::Change;
use crate::envelope::{Envelope, Fields};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub const SAVE: &str = "save";
pub const FETCH: &str = "fetch";
pub const LIVE_CREATE: &str = "live.create";
pub const LIVE_UPDATE: &str = "live.update";
pub const LIVE_DELETE: &str = "live.delete";

#[derive(Debug, Clone, PartialEq)]
pub enum ProxyEvent {
    Save,
    Fetch(Envelope),
    LiveCreate {
        record: Option<Fields>,
    },
    LiveUpdate {
        record: Option<Fields>,
        change: Option<Change>,
    },
    LiveDelete {
        record: Option<Fields>,
    },
}

impl ProxyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProxyEvent::Save => SAVE,
            ProxyEvent::Fetch(_) => FETCH,
            ProxyEvent::LiveCreate { .. } => LIVE_CREATE,
            ProxyEvent::LiveUpdate { .. } => LIVE_UPDATE,
            ProxyEvent::LiveDelete { .. } => LIVE_DELETE,
        }
    }

    /// The record carried by a live event, if any.
    pub fn record(&self) -> Option<&Fields> {
        match self {
            ProxyEvent::LiveCreate { record }
            | ProxyEvent::LiveUpdate { record, .. }
            | ProxyEvent::LiveDelete { record } => record.as_ref(),
            _ => None,
        }
    }
}

pub type Listener = Arc<dyn Fn(&ProxyEvent) + Send + Sync>;

struct Entry {
    listener: Listener,
    once: bool,
}

#[derive(Default)]
pub struct EventRegistry {
    listeners: Mutex<HashMap<String, Vec<Entry>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, name: &str, listener: F)
    where
        F: Fn(&ProxyEvent) + Send + Sync + 'static,
    {
        self.register(name, Arc::new(listener), false);
    }

    /// Like [`EventRegistry::on`], but the listener is dropped after its first call.
    pub fn once<F>(&self, name: &str, listener: F)
    where
        F: Fn(&ProxyEvent) + Send + Sync + 'static,
    {
        self.register(name, Arc::new(listener), true);
    }

    fn register(&self, name: &str, listener: Listener, once: bool) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(Entry { listener, once });
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }

    pub fn emit(&self, event: &ProxyEvent) {
        let due: Vec<Listener> = {
            let mut map = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match map.get_mut(event.name()) {
                Some(entries) => {
                    let due = entries.iter().map(|e| Arc::clone(&e.listener)).collect();
                    entries.retain(|e| !e.once);
                    due
                }
                None => Vec::new(),
            }
        };

        for listener in due {
            listener(event);
        }
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = map.keys().cloned().collect();
        names.sort();
        f.debug_struct("EventRegistry")
            .field("events", &names)
            .finish()
    }
}
