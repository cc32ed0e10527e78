//! # jsonfile-proxy
//!
//! Persist an in-memory dataset (a single record, or an ordered collection of
//! records) to one JSON file on disk, and load it back on demand.
//!
//! ```text
//! ┌──────────────────────────────┐   mutations   ┌──────────────────────────┐
//! │ Dataset (Record/RecordStore) │ ────────────▶ │ live sync (live.rs)      │
//! └──────────────────────────────┘               └──────────────────────────┘
//!              ▲  load / snapshot                              │ save
//!              │                                               ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │ JsonFileProxy (proxy.rs): save / fetch / notifications                   │
//! └──────────────────────────────────────────────────────────────────────────┘
//!        │                     │                       │
//!        ▼                     ▼                       ▼
//!   target.rs             lock.rs                 cipher.rs
//!   (paths, mkdir -p)     (<file>.lock, pid)      (hex AES-256-CBC)
//! ```
//!
//! ## On-disk format
//!
//! ```text
//! {"data": {...}}            single record (model)
//! {"data": [{...}, {...}]}   ordered records (store)
//! ```
//!
//! or the same text encrypted and hex encoded when an encryption key is
//! configured. The encryption is obfuscation only; see [`cipher`].
//!
//! ## Concurrency
//!
//! Writes are guarded by an advisory lock file next to the target. A save that
//! finds the lock held fails immediately with [`error::ProxyError::LockHeld`];
//! nothing in this crate waits or retries.
//!
//! ## Example
//!
//! ```no_run
//! use jsonfile_proxy::{JsonFileProxy, ProxyConfig, RecordStore};
//! use serde_json::json;
//!
//! # fn main() -> jsonfile_proxy::error::Result<()> {
//! let proxy = JsonFileProxy::new(ProxyConfig::from("./data/people.json").with_encryption_key("s3cr3t"))?;
//! let mut people = RecordStore::new().with_proxy(proxy.clone());
//! people.enable_live_sync()?;
//!
//! proxy.on("live.create", |event| println!("persisted {:?}", event.record()));
//! people.add(json!({"firstname": "The", "lastname": "Doctor"}))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`proxy`]: save / fetch lifecycle and the [`PersistenceAdapter`] trait
//! - [`live`]: mutation-triggered saves
//! - [`dataset`]: the dataset traits and the in-memory `Record` / `RecordStore`
//! - [`envelope`]: the `{"data": ...}` document
//! - [`lock`]: lock files
//! - [`cipher`]: at-rest obfuscation
//! - [`target`]: path resolution and directory creation
//! - [`events`]: adapter notifications
//! - [`config`]: configuration
//! - [`commands`]: maintenance commands behind the `jfp` binary
//! - [`error`]: error types

pub mod cipher;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod envelope;
pub mod error;
pub mod events;
pub mod live;
pub mod lock;
pub mod proxy;
pub mod target;

pub use config::ProxyConfig;
pub use dataset::{Dataset, DatasetKind, Observable, Record, RecordStore};
pub use envelope::{Envelope, Payload};
pub use error::{ProxyError, Result};
pub use events::ProxyEvent;
pub use proxy::{JsonFileProxy, PersistenceAdapter};
