//! Entity mutations.

use super::ops::{self, dedup};
use super::options::{
    AddOptions, Patch, SetOptions, SetSource, Target, UpsertManyOptions, UpsertOptions,
};
use super::state::CollectionMeta;
use super::EntityStore;
use crate::action_feed::ActionKind;
use crate::entity::Entity;
use crate::error::StoreResult;
use tracing::debug;

impl<E: Entity> EntityStore<E> {
    /// Replaces the whole collection.
    ///
    /// Clears the loading flag and marks the cache as active.
    pub fn set(&self, source: impl Into<SetSource<E>>) -> StoreResult<()> {
        self.set_with(Some(source.into()), SetOptions::default())
    }

    /// Replaces the whole collection; `None` leaves it untouched.
    pub fn set_with(
        &self,
        source: Option<SetSource<E>>,
        options: SetOptions<E::Id>,
    ) -> StoreResult<()> {
        let Some(source) = source else {
            return Ok(());
        };
        let current = self.store.value();
        let outcome = ops::set_entities(&current, source, self.id_key(), self.hooks());
        let mut next = outcome.state;
        if let Some(active) = options.active {
            next.active = active;
        }
        let ids = next.ids.clone();

        self.commit(next)?;
        self.set_has_cache(true);
        self.stats().record_set();
        self.stats().record_skipped(outcome.skipped as u64);
        debug!(store = %self.name(), count = ids.len(), "set");
        self.actions.emit(ActionKind::Set, ids);
        Ok(())
    }

    /// Appends entities whose ids are not present yet.
    pub fn add(&self, entities: impl IntoIterator<Item = E>) -> StoreResult<()> {
        self.add_with(entities, AddOptions::default())
    }

    /// Adds entities, prepending them or setting the loading flag as
    /// requested. Entities whose id already exists are skipped.
    pub fn add_with(
        &self,
        entities: impl IntoIterator<Item = E>,
        options: AddOptions,
    ) -> StoreResult<()> {
        let entities: Vec<E> = entities.into_iter().collect();
        if entities.is_empty() {
            return Ok(());
        }
        let current = self.store.value();
        let outcome = ops::add_entities(
            &current,
            entities,
            self.id_key(),
            self.hooks(),
            options.prepend,
            options.loading,
        );
        self.stats().record_skipped(outcome.skipped as u64);
        let Some(next) = outcome.state else {
            return Ok(());
        };

        self.commit(next)?;
        self.stats().record_add();
        debug!(store = %self.name(), added = outcome.added.len(), prepend = options.prepend, "add");
        self.actions.emit(ActionKind::Add, outcome.added);
        Ok(())
    }

    /// Applies `patch` to every targeted entity that exists.
    pub fn update(&self, target: Target<E>, patch: Patch<E>) -> StoreResult<()> {
        let current = self.store.value();
        let ids = ops::resolve_target(&current, &target);
        self.update_ids(&ids, &patch)
    }

    fn update_ids(&self, ids: &[E::Id], patch: &Patch<E>) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let current = self.store.value();
        let outcome = ops::update_entities(&current, ids, patch, self.id_key(), self.hooks());
        if outcome.updated.is_empty() {
            return Ok(());
        }

        self.commit(outcome.state)?;
        self.stats().record_update();
        for (previous, renamed) in outcome.renamed {
            debug!(store = %self.name(), from = ?previous, to = ?renamed, "entity id changed");
            self.actions.emit_id_changed(previous, renamed);
        }
        self.actions.emit(ActionKind::Update, outcome.updated);
        Ok(())
    }

    /// Updates the existing ids and creates the missing ones.
    ///
    /// Observers see one notification.
    pub fn upsert<I, T>(&self, ids: I, patch: Patch<E>) -> StoreResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<E::Id>,
    {
        self.upsert_with(ids, patch, UpsertOptions::default())
    }

    /// Like [`EntityStore::upsert`], building new entities with the
    /// configured factory.
    pub fn upsert_with<I, T>(
        &self,
        ids: I,
        patch: Patch<E>,
        options: UpsertOptions<E>,
    ) -> StoreResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<E::Id>,
    {
        let ids = dedup(ids.into_iter().map(Into::into));
        if ids.is_empty() {
            return Ok(());
        }
        let current = self.store.value();
        let (existing, missing): (Vec<_>, Vec<_>) =
            ids.into_iter().partition(|id| current.contains(id));

        let created: Vec<E> = missing
            .iter()
            .map(|id| {
                let fields = patch.resolve_new();
                let mut entity = match &options.factory {
                    Some(factory) => factory(id, &fields),
                    None => E::from_patch(&fields),
                };
                entity.set_entity_id(id, self.id_key());
                entity
            })
            .collect();

        self.batch(|store| {
            store.update_ids(&existing, &patch)?;
            store.add(created)
        })?;
        self.stats().record_upsert();
        Ok(())
    }

    /// Inserts or merges full records in one write.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingEntityId`](crate::StoreError::MissingEntityId)
    /// when a record carries no id; the collection is left unchanged.
    pub fn upsert_many(&self, entities: Vec<E>) -> StoreResult<()> {
        self.upsert_many_with(entities, UpsertManyOptions::default())
    }

    /// Like [`EntityStore::upsert_many`] with options.
    pub fn upsert_many_with(
        &self,
        entities: Vec<E>,
        options: UpsertManyOptions<E>,
    ) -> StoreResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let current = self.store.value();
        let outcome = ops::upsert_many_entities(
            &current,
            entities,
            self.id_key(),
            self.hooks(),
            options.factory.as_deref(),
            options.loading,
        )?;

        self.commit(outcome.state)?;
        self.stats().record_upsert();
        debug!(
            store = %self.name(),
            updated = outcome.updated.len(),
            added = outcome.added.len(),
            "upsert many"
        );
        if !outcome.updated.is_empty() {
            self.actions.emit(ActionKind::Update, outcome.updated);
        }
        if !outcome.added.is_empty() {
            self.actions.emit(ActionKind::Add, outcome.added);
        }
        Ok(())
    }

    /// Replaces every targeted entity that exists with a copy of `entity`.
    pub fn replace(&self, target: Target<E>, entity: E) -> StoreResult<()> {
        let current = self.store.value();
        let ids = ops::resolve_target(&current, &target);
        if ids.is_empty() {
            return Ok(());
        }
        let next = ops::replace_entities(&current, &ids, &entity, self.id_key());
        self.commit(next)?;
        self.stats().record_update();
        self.actions.emit(ActionKind::Update, ids);
        Ok(())
    }

    /// Moves the id at position `from` to position `to`.
    ///
    /// Out-of-range positions leave the collection untouched.
    pub fn move_id(&self, from: usize, to: usize) -> StoreResult<()> {
        let current = self.store.value();
        match ops::move_entity(&current, from, to) {
            Some(next) => self.commit(next),
            None => Ok(()),
        }
    }

    /// Removes the targeted entities.
    ///
    /// Removing [`Target::All`] also clears the selection and the cache
    /// flag. Nothing changes when the collection is already empty.
    pub fn remove(&self, target: Target<E>) -> StoreResult<()> {
        let current = self.store.value();
        let prune = self.config.prune_active_on_remove;

        if let Target::All = target {
            if current.is_empty() {
                return Ok(());
            }
            let removed = current.ids.clone();
            self.commit(ops::remove_all(&current, self.active_mode()))?;
            self.set_has_cache(false);
            self.stats().record_remove();
            debug!(store = %self.name(), removed = removed.len(), "remove all");
            self.actions.emit(ActionKind::Remove, removed);
            return Ok(());
        }

        let ids = ops::resolve_target(&current, &target);
        if ids.is_empty() {
            return Ok(());
        }
        self.commit(ops::remove_entities(&current, &ids, prune, self.active_mode()))?;
        self.stats().record_remove();
        debug!(store = %self.name(), removed = ids.len(), "remove");
        self.actions.emit(ActionKind::Remove, ids);
        Ok(())
    }

    /// Updates the collection-level fields.
    ///
    /// Nothing is written when `f` leaves them unchanged.
    pub fn update_state(&self, f: impl FnOnce(&mut CollectionMeta)) -> StoreResult<()> {
        let current = self.store.value();
        let before = current.meta();
        let mut meta = before.clone();
        f(&mut meta);
        if meta == before {
            return Ok(());
        }
        self.store.set_value(move |state| {
            let mut next = state.clone();
            next.loading = meta.loading;
            next.error = meta.error;
            next
        })
    }

    /// Sets the loading flag.
    pub fn set_loading(&self, loading: bool) -> StoreResult<()> {
        self.update_state(|meta| meta.loading = loading)
    }

    /// Sets or clears the error.
    pub fn set_error(&self, error: Option<String>) -> StoreResult<()> {
        self.update_state(|meta| meta.error = error)
    }
}
