//! # EntiState Plugins
//!
//! Extensions that attach to an [`EntityStore`](entistate_core::EntityStore).
//!
//! This crate provides:
//! - [`EntityCollectionPlugin`], which keeps one satellite object per
//!   tracked entity in step with the store's id list
//! - [`EntityStateHistoryPlugin`], per-entity undo/redo built on it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entistate_plugins::{EntityStateHistoryPlugin, HistoryConfig};
//!
//! let history = EntityStateHistoryPlugin::new(Arc::clone(&todos), HistoryConfig::new().max_age(20));
//! todos.update(Target::id(1), Patch::merge(done))?;
//! history.undo(&RecordId::from(1))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod history;

pub use collection::{EntityCollectionPlugin, Satellite, SatelliteFactory, TrackedIds};
pub use history::{
    Comparator, EntityHistory, EntityStateHistoryPlugin, HistoryConfig, HistoryFactory,
    StateHistory, DEFAULT_MAX_AGE,
};
