//! Error types for EntiState core.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// Malformed input (records without an id) is skipped rather than raised,
/// so the variants here cover lifecycle misuse and the few operations that
/// cannot proceed on partial input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store was destroyed and accepts no further mutations.
    #[error("store `{name}` has been destroyed")]
    Destroyed {
        /// Name of the store.
        name: String,
    },

    /// A record passed to a bulk operation carries no id.
    #[error("record at index {index} has no value under id key `{id_key}`")]
    MissingEntityId {
        /// Position of the offending record in the input.
        index: usize,
        /// The id key that was looked up.
        id_key: String,
    },

    /// `reset` was called on a store not configured as resettable.
    #[error("store `{name}` is not resettable")]
    NotResettable {
        /// Name of the store.
        name: String,
    },
}

impl StoreError {
    /// Creates a destroyed-store error.
    pub fn destroyed(name: impl Into<String>) -> Self {
        Self::Destroyed { name: name.into() }
    }

    /// Creates a missing-id error.
    pub fn missing_entity_id(index: usize, id_key: impl Into<String>) -> Self {
        Self::MissingEntityId {
            index,
            id_key: id_key.into(),
        }
    }

    /// Creates a not-resettable error.
    pub fn not_resettable(name: impl Into<String>) -> Self {
        Self::NotResettable { name: name.into() }
    }
}
