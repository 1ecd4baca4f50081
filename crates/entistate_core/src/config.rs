//! Store configuration.

use crate::entity::DEFAULT_ID_KEY;
use crate::transaction::TransactionCoordinator;
use std::sync::Arc;
use std::time::Duration;

/// Shape of a store's active selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveMode {
    /// At most one active id.
    #[default]
    Single,
    /// An ordered set of active ids.
    Multi,
}

/// Configuration for creating an entity store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store name, used in logs and errors.
    pub name: String,

    /// Field holding each entity's identifier.
    pub id_key: String,

    /// Single or multi active selection.
    pub active_mode: ActiveMode,

    /// Whether `reset` may restore the initial state.
    pub resettable: bool,

    /// How long the cache flag stays valid after `set` (None = forever).
    pub cache_ttl: Option<Duration>,

    /// Whether removals also drop the removed ids from the active selection.
    pub prune_active_on_remove: bool,

    /// Number of entity actions kept for polling.
    pub action_history: usize,

    /// Coordinator shared with every store that batches together.
    pub coordinator: Arc<TransactionCoordinator>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "entities".to_string(),
            id_key: DEFAULT_ID_KEY.to_string(),
            active_mode: ActiveMode::Single,
            resettable: false,
            cache_ttl: None,
            prune_active_on_remove: false,
            action_history: 1000,
            coordinator: TransactionCoordinator::global(),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the id key.
    #[must_use]
    pub fn id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    /// Sets the active selection mode.
    #[must_use]
    pub fn active_mode(mut self, mode: ActiveMode) -> Self {
        self.active_mode = mode;
        self
    }

    /// Sets whether the store is resettable.
    #[must_use]
    pub fn resettable(mut self, value: bool) -> Self {
        self.resettable = value;
        self
    }

    /// Sets the cache time-to-live.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets whether removals prune the active selection.
    #[must_use]
    pub fn prune_active_on_remove(mut self, value: bool) -> Self {
        self.prune_active_on_remove = value;
        self
    }

    /// Sets the action history size.
    #[must_use]
    pub fn action_history(mut self, size: usize) -> Self {
        self.action_history = size;
        self
    }

    /// Sets the transaction coordinator.
    #[must_use]
    pub fn coordinator(mut self, coordinator: Arc<TransactionCoordinator>) -> Self {
        self.coordinator = coordinator;
        self
    }
}
