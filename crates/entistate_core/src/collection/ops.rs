//! Pure collection reducers.
//!
//! Each function reads the previous snapshot and builds the next one; the
//! previous snapshot is never mutated. Functions return `None` when the
//! operation would not change the collection.

use super::options::{Patch, SetSource, Target};
use super::state::{Active, EntityState};
use crate::config::ActiveMode;
use crate::entity::{Entity, EntityHooks};
use crate::error::{StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Optional hooks as passed to reducers.
pub(crate) type Hooks<'a, E> = Option<&'a dyn EntityHooks<E>>;

fn pre_add<E: Entity>(hooks: Hooks<'_, E>, entity: E) -> E {
    match hooks {
        Some(hooks) => hooks.pre_add(entity),
        None => entity,
    }
}

fn pre_update<E: Entity>(hooks: Hooks<'_, E>, previous: &E, next: E) -> E {
    match hooks {
        Some(hooks) => hooks.pre_update(previous, next),
        None => next,
    }
}

/// Drops repeated ids, keeping first-seen order.
pub(crate) fn dedup<Id: Clone + Eq + std::hash::Hash>(ids: impl IntoIterator<Item = Id>) -> Vec<Id> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Resolves `target` to the ids present in `state`, in `ids` order for
/// `All` and predicates, in the given order otherwise.
pub(crate) fn resolve_target<E: Entity>(state: &EntityState<E>, target: &Target<E>) -> Vec<E::Id> {
    match target {
        Target::All => state.ids.clone(),
        Target::Id(id) if state.contains(id) => vec![id.clone()],
        Target::Id(_) => Vec::new(),
        Target::Ids(ids) => dedup(ids.iter().filter(|id| state.contains(id)).cloned()),
        Target::Predicate(predicate) => state
            .ids
            .iter()
            .filter(|id| state.entities.get(id).is_some_and(|e| predicate(e)))
            .cloned()
            .collect(),
    }
}

/// Result of `set_entities`.
pub(crate) struct SetOutcome<E: Entity> {
    pub state: EntityState<E>,
    pub skipped: usize,
}

/// Replaces every entity with `source`.
pub(crate) fn set_entities<E: Entity>(
    state: &EntityState<E>,
    source: SetSource<E>,
    id_key: &str,
    hooks: Hooks<'_, E>,
) -> SetOutcome<E> {
    let mut ids = Vec::new();
    let mut entities = HashMap::new();
    let mut skipped = 0;

    let mut insert = |id: E::Id, entity: E| {
        if entities.insert(id.clone(), entity).is_none() {
            ids.push(id);
        }
    };

    match source {
        SetSource::List(list) => {
            for entity in list {
                let entity = pre_add(hooks, entity);
                match entity.entity_id(id_key) {
                    Some(id) => insert(id, entity),
                    None => skipped += 1,
                }
            }
        }
        SetSource::Keyed(keyed) => {
            for (id, entity) in keyed {
                insert(id, pre_add(hooks, entity));
            }
        }
        SetSource::Normalized {
            ids: order,
            entities: mut records,
        } => {
            for id in order {
                if let Some(entity) = records.remove(&id) {
                    insert(id, pre_add(hooks, entity));
                }
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, id_key, "set skipped records without an id");
    }

    SetOutcome {
        state: EntityState {
            ids,
            entities,
            active: state.active.clone(),
            loading: false,
            error: state.error.clone(),
        },
        skipped,
    }
}

/// Result of `add_entities`.
pub(crate) struct AddOutcome<E: Entity> {
    pub state: Option<EntityState<E>>,
    pub added: Vec<E::Id>,
    pub skipped: usize,
}

/// Adds entities whose ids are not yet present.
pub(crate) fn add_entities<E: Entity>(
    state: &EntityState<E>,
    incoming: Vec<E>,
    id_key: &str,
    hooks: Hooks<'_, E>,
    prepend: bool,
    loading: bool,
) -> AddOutcome<E> {
    let mut entities = state.entities.clone();
    let mut added = Vec::new();
    let mut skipped = 0;

    for entity in incoming {
        let Some(id) = entity.entity_id(id_key) else {
            skipped += 1;
            continue;
        };
        if entities.contains_key(&id) {
            continue;
        }
        let entity = pre_add(hooks, entity);
        let id = entity.entity_id(id_key).unwrap_or(id);
        if entities.contains_key(&id) {
            continue;
        }
        entities.insert(id.clone(), entity);
        added.push(id);
    }

    if skipped > 0 {
        warn!(skipped, id_key, "add skipped records without an id");
    }
    if added.is_empty() {
        return AddOutcome {
            state: None,
            added,
            skipped,
        };
    }

    let ids = if prepend {
        added.iter().rev().chain(state.ids.iter()).cloned().collect()
    } else {
        state.ids.iter().chain(added.iter()).cloned().collect()
    };

    AddOutcome {
        state: Some(EntityState {
            ids,
            entities,
            active: state.active.clone(),
            loading,
            error: state.error.clone(),
        }),
        added,
        skipped,
    }
}

/// Result of `update_entities`.
pub(crate) struct UpdateOutcome<E: Entity> {
    pub state: EntityState<E>,
    pub updated: Vec<E::Id>,
    pub renamed: Vec<(E::Id, E::Id)>,
}

/// Applies `patch` to the entities with `ids`. Every id must be present.
pub(crate) fn update_entities<E: Entity>(
    state: &EntityState<E>,
    ids: &[E::Id],
    patch: &Patch<E>,
    id_key: &str,
    hooks: Hooks<'_, E>,
) -> UpdateOutcome<E> {
    let mut entities = state.entities.clone();
    let mut order = state.ids.clone();
    let mut active = state.active.clone();
    let mut updated = Vec::with_capacity(ids.len());
    let mut renamed = Vec::new();

    for id in ids {
        let Some(previous) = state.entities.get(id) else {
            continue;
        };
        let mut next = pre_update(hooks, previous, patch.apply(previous));

        match next.entity_id(id_key) {
            Some(new_id) if new_id != *id => {
                if entities.contains_key(&new_id) {
                    warn!(from = ?id, to = ?new_id, "rename onto an existing id skipped");
                    next.set_entity_id(id, id_key);
                    entities.insert(id.clone(), next);
                    updated.push(id.clone());
                    continue;
                }
                entities.remove(id);
                entities.insert(new_id.clone(), next);
                if let Some(pos) = order.iter().position(|existing| existing == id) {
                    order[pos] = new_id.clone();
                }
                active = active.renamed(id, &new_id);
                renamed.push((id.clone(), new_id.clone()));
                updated.push(new_id);
            }
            Some(_) => {
                entities.insert(id.clone(), next);
                updated.push(id.clone());
            }
            None => {
                next.set_entity_id(id, id_key);
                entities.insert(id.clone(), next);
                updated.push(id.clone());
            }
        }
    }

    UpdateOutcome {
        state: EntityState {
            ids: order,
            entities,
            active,
            loading: state.loading,
            error: state.error.clone(),
        },
        updated,
        renamed,
    }
}

/// Result of `upsert_many_entities`.
pub(crate) struct UpsertManyOutcome<E: Entity> {
    pub state: EntityState<E>,
    pub updated: Vec<E::Id>,
    pub added: Vec<E::Id>,
}

/// Inserts or merges full records in one pass.
///
/// Fails without building anything when a record carries no id.
pub(crate) fn upsert_many_entities<E: Entity>(
    state: &EntityState<E>,
    incoming: Vec<E>,
    id_key: &str,
    hooks: Hooks<'_, E>,
    factory: Option<&dyn Fn(E) -> E>,
    loading: bool,
) -> StoreResult<UpsertManyOutcome<E>> {
    let mut checked = Vec::with_capacity(incoming.len());
    for (index, entity) in incoming.into_iter().enumerate() {
        let entity = match hooks {
            Some(hooks) => hooks.pre_check(entity),
            None => entity,
        };
        let id = entity
            .entity_id(id_key)
            .ok_or_else(|| StoreError::missing_entity_id(index, id_key))?;
        checked.push((id, entity));
    }

    let build = |entity: E| match factory {
        Some(factory) => factory(entity),
        None => entity,
    };

    let mut entities = state.entities.clone();
    let mut updated = Vec::new();
    let mut added = Vec::new();

    for (id, entity) in checked {
        let next = match entities.get(&id) {
            Some(previous) => {
                let mut next = pre_update(hooks, previous, build(previous.overlay(&entity)));
                next.set_entity_id(&id, id_key);
                if !updated.contains(&id) && !added.contains(&id) {
                    updated.push(id.clone());
                }
                next
            }
            None => {
                let mut next = pre_add(hooks, build(entity));
                next.set_entity_id(&id, id_key);
                added.push(id.clone());
                next
            }
        };
        entities.insert(id, next);
    }

    let ids = state.ids.iter().chain(added.iter()).cloned().collect();
    Ok(UpsertManyOutcome {
        state: EntityState {
            ids,
            entities,
            active: state.active.clone(),
            loading,
            error: state.error.clone(),
        },
        updated,
        added,
    })
}

/// Replaces the entities with `ids` by copies of `entity`.
pub(crate) fn replace_entities<E: Entity>(
    state: &EntityState<E>,
    ids: &[E::Id],
    entity: &E,
    id_key: &str,
) -> EntityState<E> {
    let mut entities = state.entities.clone();
    for id in ids {
        let mut next = entity.clone();
        next.set_entity_id(id, id_key);
        entities.insert(id.clone(), next);
    }
    EntityState {
        ids: state.ids.clone(),
        entities,
        active: state.active.clone(),
        loading: state.loading,
        error: state.error.clone(),
    }
}

/// Moves the id at `from` to position `to`. Out-of-range positions yield
/// `None`.
pub(crate) fn move_entity<E: Entity>(
    state: &EntityState<E>,
    from: usize,
    to: usize,
) -> Option<EntityState<E>> {
    let len = state.ids.len();
    if from >= len || to >= len || from == to {
        return None;
    }
    let mut ids = state.ids.clone();
    let id = ids.remove(from);
    ids.insert(to, id);
    Some(EntityState {
        ids,
        entities: state.entities.clone(),
        active: state.active.clone(),
        loading: state.loading,
        error: state.error.clone(),
    })
}

/// Removes the entities with `ids`.
pub(crate) fn remove_entities<E: Entity>(
    state: &EntityState<E>,
    ids: &[E::Id],
    prune_active: bool,
    mode: ActiveMode,
) -> EntityState<E> {
    let removed: HashSet<&E::Id> = ids.iter().collect();
    let entities = state
        .entities
        .iter()
        .filter(|(id, _)| !removed.contains(id))
        .map(|(id, entity)| (id.clone(), entity.clone()))
        .collect();
    let order = state
        .ids
        .iter()
        .filter(|id| !removed.contains(id))
        .cloned()
        .collect();
    let active = if prune_active {
        state.active.without(&removed, mode)
    } else {
        state.active.clone()
    };
    EntityState {
        ids: order,
        entities,
        active,
        loading: state.loading,
        error: state.error.clone(),
    }
}

/// Removes every entity and clears the selection.
pub(crate) fn remove_all<E: Entity>(state: &EntityState<E>, mode: ActiveMode) -> EntityState<E> {
    EntityState {
        ids: Vec::new(),
        entities: HashMap::new(),
        active: Active::cleared(mode),
        loading: state.loading,
        error: state.error.clone(),
    }
}

/// Returns `state` with a different selection.
pub(crate) fn with_active<E: Entity>(state: &EntityState<E>, active: Active<E::Id>) -> EntityState<E> {
    EntityState {
        ids: state.ids.clone(),
        entities: state.entities.clone(),
        active,
        loading: state.loading,
        error: state.error.clone(),
    }
}
