//! Reads and projections.

use super::state::Active;
use super::EntityStore;
use crate::entity::Entity;
use crate::store::Subscription;

impl<E: Entity> EntityStore<E> {
    /// Returns a copy of the entity with `id`.
    pub fn get_entity(&self, id: &E::Id) -> Option<E> {
        self.store.value().entity(id).cloned()
    }

    /// Returns true if an entity with `id` exists.
    pub fn has_entity(&self, id: &E::Id) -> bool {
        self.store.value().contains(id)
    }

    /// Returns every entity in `ids` order.
    pub fn get_all(&self) -> Vec<E> {
        self.store.value().iter().cloned().collect()
    }

    /// Returns the ordered ids.
    pub fn ids(&self) -> Vec<E::Id> {
        self.store.value().ids.clone()
    }

    /// Returns the number of entities.
    pub fn count(&self) -> usize {
        self.store.value().len()
    }

    /// Returns true if the collection holds no entities.
    pub fn is_empty(&self) -> bool {
        self.store.value().is_empty()
    }

    /// Returns the active selection.
    pub fn active(&self) -> Active<E::Id> {
        self.store.value().active.clone()
    }

    /// Returns true if anything is selected.
    pub fn has_active(&self) -> bool {
        !self.store.value().active.is_empty()
    }

    /// Returns the selected entities that exist.
    pub fn get_active(&self) -> Vec<E> {
        self.store
            .value()
            .active_entities()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns the loading flag.
    pub fn loading(&self) -> bool {
        self.store.value().loading
    }

    /// Returns the last reported error.
    pub fn error(&self) -> Option<String> {
        self.store.value().error.clone()
    }

    /// Observes one entity, starting with its current value.
    pub fn select_entity(
        &self,
        id: E::Id,
        listener: impl Fn(&Option<E>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store
            .select(move |state| state.entity(&id).cloned(), listener)
    }

    /// Observes the id list, starting with the current ids.
    pub fn select_ids(
        &self,
        listener: impl Fn(&Vec<E::Id>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.select(|state| state.ids.clone(), listener)
    }

    /// Observes the entity count.
    pub fn select_count(&self, listener: impl Fn(&usize) + Send + Sync + 'static) -> Subscription {
        self.store.select(|state| state.len(), listener)
    }

    /// Observes the active selection.
    pub fn select_active(
        &self,
        listener: impl Fn(&Active<E::Id>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.select(|state| state.active.clone(), listener)
    }

    /// Observes the loading flag.
    pub fn select_loading(&self, listener: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.store.select(|state| state.loading, listener)
    }
}
