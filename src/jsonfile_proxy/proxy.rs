//! # JSON File Proxy
//!
//! [`JsonFileProxy`] persists one [`Dataset`] to one JSON file.
//!
//! ## Save
//!
//! ```text
//! locked? ──yes──▶ LockHeld (nothing written)
//!    │no
//!    ▼
//! ensure directory ─▶ serialize {"data": ...} ─▶ encrypt? ─▶ lock ─▶ write ─▶ unlock ─▶ `save`
//! ```
//!
//! The write goes to a temporary sibling file that is then renamed over the
//! target, so a failed save leaves the previous file intact. The lock is
//! released even when the write fails.
//!
//! ## Fetch
//!
//! A missing or empty file is an empty dataset, not an error. Otherwise the
//! content is decrypted when it does not start with `{`, parsed, checked
//! against the dataset kind and applied. Nothing is applied unless the whole
//! file decodes, so a failed fetch leaves the in-memory data untouched.
//!
//! ## Binding
//!
//! The first save, fetch or live-sync call binds the proxy to the dataset's
//! kind; using it with the other kind afterwards is a configuration error.

use crate::cipher::{self, Cipher};
use crate::config::ProxyConfig;
use crate::dataset::{Dataset, DatasetKind, Observable};
use crate::envelope::{Envelope, Payload};
use crate::error::{ProxyError, Result};
use crate::events::{EventRegistry, ProxyEvent};
use crate::lock;
use crate::target::{ensure_directory, Target};
use std::fs;
use std::io;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// The operations a dataset needs from whatever persists it.
pub trait PersistenceAdapter {
    fn save(&self, dataset: &dyn Dataset) -> Result<()>;

    fn fetch(&self, dataset: &mut dyn Dataset) -> Result<Envelope>;

    fn enable_live_sync(&self, dataset: &mut dyn Observable) -> Result<()>;
}

/// Cheap to clone: clones share the target, key, binding and listeners.
#[derive(Clone, Debug)]
pub struct JsonFileProxy {
    inner: Arc<ProxyInner>,
}

#[derive(Debug)]
struct ProxyInner {
    target: Target,
    cipher: Option<Cipher>,
    kind: OnceLock<DatasetKind>,
    events: EventRegistry,
    id: Uuid,
}

impl JsonFileProxy {
    pub fn new(config: impl Into<ProxyConfig>) -> Result<Self> {
        let config = config.into().validate()?;
        let target = Target::resolve(&config.directory)?;

        if !target.full_path().exists() {
            warn!(
                path = %target.full_path().display(),
                "data file does not exist yet; it will be created on the first save"
            );
        }

        let cipher = config
            .encryption_key
            .as_deref()
            .map(Cipher::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(ProxyInner {
                target,
                cipher,
                kind: OnceLock::new(),
                events: EventRegistry::new(),
                id: Uuid::new_v4(),
            }),
        })
    }

    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    pub fn cipher(&self) -> Option<&Cipher> {
        self.inner.cipher.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.inner.cipher.is_some()
    }

    /// The dataset kind this proxy is bound to, once bound.
    pub fn kind(&self) -> Option<DatasetKind> {
        self.inner.kind.get().copied()
    }

    pub fn is_locked(&self) -> bool {
        lock::is_locked(&self.inner.target)
    }

    pub fn lock_owner(&self) -> Option<String> {
        lock::lock_owner(&self.inner.target)
    }

    pub fn on<F>(&self, name: &str, listener: F)
    where
        F: Fn(&ProxyEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(name, listener);
    }

    pub fn once<F>(&self, name: &str, listener: F)
    where
        F: Fn(&ProxyEvent) + Send + Sync + 'static,
    {
        self.inner.events.once(name, listener);
    }

    pub(crate) fn emit(&self, event: ProxyEvent) {
        self.inner.events.emit(&event);
    }

    /// Shared by all clones; tags the handlers live sync registers.
    pub(crate) fn id(&self) -> Uuid {
        self.inner.id
    }

    pub(crate) fn bind(&self, kind: DatasetKind) -> Result<()> {
        let bound = *self.inner.kind.get_or_init(|| kind);
        if bound != kind {
            return Err(ProxyError::Configuration(format!(
                "proxy for {} is bound to a {bound}, not a {kind}",
                self.inner.target.full_path().display()
            )));
        }
        Ok(())
    }

    pub fn save(&self, dataset: &dyn Dataset) -> Result<()> {
        self.save_with(dataset, || {})
    }

    /// Save, then emit `save`, then run `on_complete`.
    pub fn save_with<F: FnOnce()>(&self, dataset: &dyn Dataset, on_complete: F) -> Result<()> {
        self.bind(dataset.kind())?;
        let target = &self.inner.target;

        if lock::is_locked(target) {
            return Err(lock::lock_held(target));
        }

        ensure_directory(target.directory())?;

        let mut content = Envelope::new(dataset.snapshot()).to_json()?;
        if let Some(cipher) = &self.inner.cipher {
            content = cipher.encrypt(&content);
        }

        let guard = lock::acquire(target)?;
        let written = self.write_target(&content);
        let released = guard.release();
        written?;
        released?;

        debug!(path = %target.full_path().display(), bytes = content.len(), "saved");
        self.emit(ProxyEvent::Save);
        on_complete();
        Ok(())
    }

    fn write_target(&self, content: &str) -> Result<()> {
        let target = &self.inner.target;
        let tmp = target
            .directory()
            .join(format!(".{}-{}.tmp", target.filename(), Uuid::new_v4()));

        if let Err(e) = fs::write(&tmp, content) {
            let _ = fs::remove_file(&tmp);
            return Err(ProxyError::fs(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, target.full_path()) {
            let _ = fs::remove_file(&tmp);
            return Err(ProxyError::fs(target.full_path(), e));
        }
        Ok(())
    }

    pub fn fetch(&self, dataset: &mut dyn Dataset) -> Result<Envelope> {
        self.fetch_with(dataset, |_| {})
    }

    /// Fetch, then emit `fetch`, then run `on_complete` with the decoded envelope.
    pub fn fetch_with<F: FnOnce(&Envelope)>(
        &self,
        dataset: &mut dyn Dataset,
        on_complete: F,
    ) -> Result<Envelope> {
        let kind = dataset.kind();
        self.bind(kind)?;

        let envelope = match self.read_envelope()? {
            Some(envelope) => envelope,
            None => Envelope::new(Payload::empty(kind)),
        };

        if envelope.data.kind() != kind {
            return Err(ProxyError::Format(format!(
                "{} holds {} data but the dataset is a {kind}",
                self.inner.target.full_path().display(),
                envelope.data.kind()
            )));
        }

        dataset.apply(envelope.data.clone())?;

        debug!(
            path = %self.inner.target.full_path().display(),
            records = envelope.data.len(),
            "fetched"
        );
        self.emit(ProxyEvent::Fetch(envelope.clone()));
        on_complete(&envelope);
        Ok(envelope)
    }

    /// Read and decode the target without touching any dataset.
    /// `None` means there is nothing stored yet (missing or empty file).
    pub fn read_envelope(&self) -> Result<Option<Envelope>> {
        let path = self.inner.target.full_path();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ProxyError::fs(path, e)),
        };
        let content = String::from_utf8(bytes).map_err(|_| {
            ProxyError::Format(format!("{} is not UTF-8 text", path.display()))
        })?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let text = if cipher::looks_encrypted(&content) {
            let cipher = self.inner.cipher.as_ref().ok_or_else(|| {
                ProxyError::Format(
                    "Unrecognized or encrypted format detected. If the file is encrypted, \
                     the proxy must have an encryptionKey configured."
                        .to_string(),
                )
            })?;
            cipher
                .decrypt(&content)
                .map_err(|e| ProxyError::Format(e.to_string()))?
        } else {
            content
        };

        Envelope::from_json(&text).map(Some)
    }
}

impl PersistenceAdapter for JsonFileProxy {
    fn save(&self, dataset: &dyn Dataset) -> Result<()> {
        JsonFileProxy::save(self, dataset)
    }

    fn fetch(&self, dataset: &mut dyn Dataset) -> Result<Envelope> {
        JsonFileProxy::fetch(self, dataset)
    }

    fn enable_live_sync(&self, dataset: &mut dyn Observable) -> Result<()> {
        JsonFileProxy::enable_live_sync(self, dataset)
    }
}
