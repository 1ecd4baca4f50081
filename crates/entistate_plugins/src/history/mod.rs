//! Undo/redo history.
//!
//! [`StateHistory`] is the plain past/present/future stack.
//! [`EntityHistory`] binds one stack to one entity of a store, and
//! [`EntityStateHistoryPlugin`] keeps one history per entity through the
//! [`EntityCollectionPlugin`](crate::EntityCollectionPlugin) engine.

mod config;
mod entity;
mod plugin;
mod stack;

pub use config::{Comparator, HistoryConfig};
pub use entity::EntityHistory;
pub use plugin::{EntityStateHistoryPlugin, HistoryFactory};
pub use stack::{StateHistory, DEFAULT_MAX_AGE};
