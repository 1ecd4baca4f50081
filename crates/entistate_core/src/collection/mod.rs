//! Normalized entity collections.
//!
//! An [`EntityStore`] keeps entities in an [`EntityState`]: an ordered id
//! list plus a map from id to record. Every operation builds the next
//! snapshot from the previous one and commits it through the underlying
//! [`Store`], so observers and transactions behave the same way for
//! collections as for plain value stores.
//!
//! # Usage
//!
//! ```rust,ignore
//! use entistate_core::{EntityStore, Patch, Record, StoreConfig, Target};
//!
//! let todos = EntityStore::<Record>::new(StoreConfig::new().name("todos"));
//! todos.set(vec![todo(1), todo(2)])?;
//! todos.update(Target::id(1), Patch::merge(done()))?;
//! todos.remove(Target::id(2))?;
//! ```

mod active;
mod mutations;
mod ops;
mod options;
mod query;
mod state;

pub use active::{resolve_active, Resolved};
pub use options::{
    ActiveTarget, AddOptions, EntityPredicate, Factory, Patch, SetOptions, SetSource, Target,
    UpsertManyOptions, UpsertOptions,
};
pub use state::{Active, CollectionMeta, EntityState};

use crate::action_feed::{ActionFeed, ActionKind};
use crate::config::{ActiveMode, StoreConfig};
use crate::entity::{Entity, EntityHooks};
use crate::error::{StoreError, StoreResult};
use crate::stats::StoreStats;
use crate::store::Store;
use crate::transaction::TransactionCoordinator;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
struct CacheFlag {
    active: bool,
    since: Option<Instant>,
}

/// An observable, normalized collection of entities.
pub struct EntityStore<E: Entity> {
    store: Store<EntityState<E>>,
    config: StoreConfig,
    hooks: Option<Arc<dyn EntityHooks<E>>>,
    actions: ActionFeed<E::Id>,
    cache: Mutex<CacheFlag>,
}

impl<E: Entity> EntityStore<E> {
    /// Creates an empty collection.
    pub fn new(config: StoreConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates an empty collection whose entities pass through `hooks`.
    pub fn with_hooks(config: StoreConfig, hooks: Arc<dyn EntityHooks<E>>) -> Self {
        Self::build(config, Some(hooks))
    }

    fn build(config: StoreConfig, hooks: Option<Arc<dyn EntityHooks<E>>>) -> Self {
        let store = Store::new(
            config.name.clone(),
            EntityState::empty(config.active_mode),
            Arc::clone(&config.coordinator),
        );
        debug!(store = %config.name, id = %store.id(), "entity store created");
        Self {
            store,
            actions: ActionFeed::with_max_history(config.action_history),
            config,
            hooks,
            cache: Mutex::new(CacheFlag::default()),
        }
    }

    /// Returns the store name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the field holding entity ids.
    pub fn id_key(&self) -> &str {
        &self.config.id_key
    }

    /// Returns the active selection mode.
    pub fn active_mode(&self) -> ActiveMode {
        self.config.active_mode
    }

    /// Returns the underlying value store.
    pub fn store(&self) -> &Store<EntityState<E>> {
        &self.store
    }

    /// Returns the coordinator this collection batches with.
    pub fn coordinator(&self) -> &Arc<TransactionCoordinator> {
        self.store.coordinator()
    }

    /// Returns operation counters.
    pub fn stats(&self) -> &StoreStats {
        self.store.stats()
    }

    /// Returns the feed of entity actions.
    pub fn actions(&self) -> &ActionFeed<E::Id> {
        &self.actions
    }

    /// Runs `f` inside a transaction so observers see one notification.
    ///
    /// The result of `f`, including an `Err`, is returned unchanged after
    /// the transaction closes.
    pub fn batch<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        let coordinator = Arc::clone(self.coordinator());
        coordinator.run(|| f(self))
    }

    /// Returns true while the cache flag is set and not expired.
    pub fn has_cache(&self) -> bool {
        let mut cache = self.cache.lock();
        if let (Some(ttl), Some(since)) = (self.config.cache_ttl, cache.since) {
            if cache.active && since.elapsed() >= ttl {
                cache.active = false;
                cache.since = None;
            }
        }
        cache.active
    }

    /// Sets or clears the cache flag.
    pub fn set_has_cache(&self, value: bool) {
        let mut cache = self.cache.lock();
        cache.active = value;
        cache.since = value.then(Instant::now);
    }

    /// Restores the empty initial state.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotResettable`] unless the store was configured as
    /// resettable.
    pub fn reset(&self) -> StoreResult<()> {
        if !self.config.resettable {
            return Err(StoreError::not_resettable(self.config.name.clone()));
        }
        self.commit(EntityState::empty(self.config.active_mode))?;
        self.set_has_cache(false);
        self.actions.emit(ActionKind::Set, Vec::new());
        debug!(store = %self.config.name, "reset");
        Ok(())
    }

    /// Destroys the collection.
    ///
    /// Listeners are released and action subscribers disconnected; reads
    /// keep returning the last snapshot.
    pub fn destroy(&self) {
        self.store.destroy();
        self.actions.close();
    }

    /// Returns true once the collection has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.store.is_destroyed()
    }

    fn hooks(&self) -> Option<&dyn EntityHooks<E>> {
        self.hooks.as_deref()
    }

    fn commit(&self, next: EntityState<E>) -> StoreResult<()> {
        self.store.set_value(move |_| next)
    }
}

impl<E: Entity> fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("name", &self.config.name)
            .field("id", &self.store.id())
            .field("count", &self.store.value().len())
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests;
