//! # EntiState Core
//!
//! Observable, normalized in-memory entity collections.
//!
//! This crate provides:
//! - [`Store`], an observable container of immutable snapshots
//! - [`TransactionCoordinator`], which batches notifications across stores
//! - [`EntityStore`], a normalized collection with active-selection tracking
//! - [`Entity`], implemented by typed records and by the dynamic [`Record`]
//! - [`ActionFeed`] and [`StoreStats`] for observing what operations ran
//!
//! ## Usage
//!
//! ```
//! use entistate_core::{EntityStore, Patch, Record, StoreConfig, Target};
//! use serde_json::json;
//!
//! let todos = EntityStore::<Record>::new(StoreConfig::new().name("todos"));
//! let todo = Record::try_from(json!({"id": 1, "title": "write docs"})).unwrap();
//! todos.set(vec![todo]).unwrap();
//!
//! let done = Record::try_from(json!({"done": true})).unwrap();
//! todos.update(Target::id(1), Patch::merge(done)).unwrap();
//! assert_eq!(todos.count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action_feed;
mod collection;
mod config;
mod entity;
mod error;
mod stats;
mod store;
mod transaction;
mod types;

pub use action_feed::{ActionFeed, ActionKind, EntityAction};
pub use collection::{
    resolve_active, Active, ActiveTarget, AddOptions, CollectionMeta, EntityPredicate,
    EntityState, EntityStore, Factory, Patch, Resolved, SetOptions, SetSource, Target,
    UpsertManyOptions, UpsertOptions,
};
pub use config::{ActiveMode, StoreConfig};
pub use entity::{Entity, EntityHooks, EntityKey, Record, RecordId, DEFAULT_ID_KEY};
pub use error::{StoreError, StoreResult};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::{Store, Subscription};
pub use transaction::{TransactionCoordinator, TransactionGuard};
pub use types::{BatchId, SequenceNumber, StoreId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
