//! Undo/redo history for every entity of a store.

use super::config::HistoryConfig;
use super::entity::EntityHistory;
use crate::collection::{EntityCollectionPlugin, SatelliteFactory, TrackedIds};
use entistate_core::{Entity, EntityStore, StoreResult};
use std::fmt;
use std::slice;
use std::sync::Arc;

/// Builds and activates one [`EntityHistory`] per entity.
pub struct HistoryFactory<E: Entity> {
    store: Arc<EntityStore<E>>,
    config: HistoryConfig<E>,
}

impl<E: Entity> HistoryFactory<E> {
    /// Returns the configuration handed to each history.
    pub fn config(&self) -> &HistoryConfig<E> {
        &self.config
    }
}

impl<E: Entity> SatelliteFactory<E> for HistoryFactory<E> {
    type Satellite = EntityHistory<E>;

    fn instantiate(&self, id: &E::Id) -> EntityHistory<E> {
        EntityHistory::new(Arc::clone(&self.store), id.clone(), self.config.clone())
    }

    fn after_add(&self, _id: &E::Id, satellite: &Arc<EntityHistory<E>>) {
        satellite.activate();
    }
}

/// Per-entity undo/redo over an [`EntityStore`].
///
/// ```rust,ignore
/// let history = EntityStateHistoryPlugin::new(Arc::clone(&todos), HistoryConfig::new());
/// todos.update(Target::id(1), Patch::merge(done()))?;
/// history.undo(&id)?;
/// ```
pub struct EntityStateHistoryPlugin<E: Entity> {
    plugin: EntityCollectionPlugin<E, HistoryFactory<E>>,
}

impl<E: Entity> EntityStateHistoryPlugin<E> {
    /// Tracks every entity of `store`.
    pub fn new(store: Arc<EntityStore<E>>, config: HistoryConfig<E>) -> Self {
        Self::with_tracking(store, TrackedIds::All, config)
    }

    /// Tracks only `ids`.
    pub fn for_ids(store: Arc<EntityStore<E>>, ids: Vec<E::Id>, config: HistoryConfig<E>) -> Self {
        Self::with_tracking(store, TrackedIds::Subset(ids), config)
    }

    fn with_tracking(
        store: Arc<EntityStore<E>>,
        tracked: TrackedIds<E::Id>,
        config: HistoryConfig<E>,
    ) -> Self {
        let factory = HistoryFactory {
            store: Arc::clone(&store),
            config,
        };
        let plugin = EntityCollectionPlugin::new(store, factory, tracked);
        plugin.attach();
        Self { plugin }
    }

    /// Returns the reconciliation engine.
    pub fn plugin(&self) -> &EntityCollectionPlugin<E, HistoryFactory<E>> {
        &self.plugin
    }

    /// Returns the history of `id`.
    pub fn history(&self, id: &E::Id) -> Option<Arc<EntityHistory<E>>> {
        self.plugin.get_entity(id)
    }

    fn each(
        &self,
        ids: Option<&[E::Id]>,
        mut f: impl FnMut(&EntityHistory<E>) -> StoreResult<bool>,
    ) -> StoreResult<()> {
        for history in self.plugin.satellites(ids) {
            f(history.as_ref())?;
        }
        Ok(())
    }

    /// Undoes the last change of `id`.
    pub fn undo(&self, id: &E::Id) -> StoreResult<()> {
        self.undo_many(Some(slice::from_ref(id)))
    }

    /// Undoes the last change of each of `ids` (or every tracked entity).
    pub fn undo_many(&self, ids: Option<&[E::Id]>) -> StoreResult<()> {
        self.each(ids, EntityHistory::undo)
    }

    /// Redoes the next change of `id`.
    pub fn redo(&self, id: &E::Id) -> StoreResult<()> {
        self.redo_many(Some(slice::from_ref(id)))
    }

    /// Redoes the next change of each of `ids` (or every tracked entity).
    pub fn redo_many(&self, ids: Option<&[E::Id]>) -> StoreResult<()> {
        self.each(ids, EntityHistory::redo)
    }

    /// Restores `past[index]` of `id`.
    pub fn jump_to_past(&self, id: &E::Id, index: usize) -> StoreResult<()> {
        self.each(Some(slice::from_ref(id)), |h| h.jump_to_past(index))
    }

    /// Restores `future[index]` of `id`.
    pub fn jump_to_future(&self, id: &E::Id, index: usize) -> StoreResult<()> {
        self.each(Some(slice::from_ref(id)), |h| h.jump_to_future(index))
    }

    /// Moves the history of `id` by `steps`.
    pub fn jump(&self, id: &E::Id, steps: isize) -> StoreResult<()> {
        self.each(Some(slice::from_ref(id)), |h| h.jump(steps))
    }

    /// Drops past and future of each of `ids` (or every tracked entity).
    pub fn clear(&self, ids: Option<&[E::Id]>) {
        self.plugin.for_each_id(ids, |h| h.clear());
    }

    /// Leaves the next change of each of `ids` unrecorded.
    pub fn ignore_next(&self, ids: Option<&[E::Id]>) {
        self.plugin.for_each_id(ids, |h| h.ignore_next());
    }

    /// Pauses recording for each of `ids`.
    pub fn pause(&self, ids: Option<&[E::Id]>) {
        self.plugin.for_each_id(ids, |h| h.pause());
    }

    /// Resumes recording for each of `ids`.
    pub fn resume(&self, ids: Option<&[E::Id]>) {
        self.plugin.for_each_id(ids, |h| h.resume());
    }

    /// Returns true if `id` can be undone.
    pub fn has_past(&self, id: &E::Id) -> bool {
        self.history(id).is_some_and(|h| h.has_past())
    }

    /// Returns true if `id` can be redone.
    pub fn has_future(&self, id: &E::Id) -> bool {
        self.history(id).is_some_and(|h| h.has_future())
    }

    /// Destroys the history of `id`, or every history and the store
    /// subscription when `id` is `None`. With `clear_history` the snapshots
    /// are dropped first.
    pub fn destroy(&self, id: Option<&E::Id>, clear_history: bool) {
        match id {
            Some(id) => {
                if let Some(history) = self.plugin.get_entity(id) {
                    if clear_history {
                        history.clear();
                    }
                    self.plugin.remove_entity(id);
                }
            }
            None => {
                if clear_history {
                    self.plugin.for_each_id(None, |h| h.clear());
                }
                self.plugin.destroy();
            }
        }
    }
}

impl<E: Entity> fmt::Debug for EntityStateHistoryPlugin<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStateHistoryPlugin")
            .field("plugin", &self.plugin)
            .finish()
    }
}

