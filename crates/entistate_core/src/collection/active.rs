//! Active selection.

use super::ops::{self, dedup};
use super::options::{ActiveTarget, Patch, Target};
use super::state::{Active, EntityState};
use super::EntityStore;
use crate::config::ActiveMode;
use crate::entity::Entity;
use crate::error::StoreResult;
use tracing::trace;

/// Outcome of resolving an [`ActiveTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<Id> {
    /// The selection becomes this value.
    Change(Active<Id>),
    /// The directive does not apply; nothing is written.
    Unchanged,
}

fn change<Id: Clone + PartialEq>(current: &Active<Id>, next: Active<Id>) -> Resolved<Id> {
    if *current == next {
        Resolved::Unchanged
    } else {
        Resolved::Change(next)
    }
}

fn neighbour<E: Entity>(state: &EntityState<E>, forward: bool, wrap: bool) -> Option<E::Id> {
    let current = state.active.as_single()?;
    let pos = state.ids.iter().position(|id| id == current)?;
    let last = state.ids.len() - 1;
    let target = match (forward, pos) {
        (true, p) if p == last => wrap.then_some(0)?,
        (true, p) => p + 1,
        (false, 0) => wrap.then_some(last)?,
        (false, p) => p - 1,
    };
    state.ids.get(target).cloned()
}

/// Resolves a selection directive against `state`.
///
/// `Prev`/`Next` need exactly one active id that is present in `ids`;
/// otherwise, and whenever the result equals the current selection, the
/// outcome is [`Resolved::Unchanged`].
pub fn resolve_active<E: Entity>(
    target: &ActiveTarget<E>,
    state: &EntityState<E>,
    mode: ActiveMode,
) -> Resolved<E::Id> {
    let current = &state.active;
    match target {
        ActiveTarget::Id(id) => change(current, Active::single(mode, id.clone())),
        ActiveTarget::Ids(ids) => change(current, Active::Many(dedup(ids.iter().cloned()))),
        ActiveTarget::Prev { wrap } => match neighbour(state, false, *wrap) {
            Some(id) => change(current, Active::single(mode, id)),
            None => Resolved::Unchanged,
        },
        ActiveTarget::Next { wrap } => match neighbour(state, true, *wrap) {
            Some(id) => change(current, Active::single(mode, id)),
            None => Resolved::Unchanged,
        },
        ActiveTarget::Toggle(id) => {
            let next = match current {
                Active::Single(active) if active == id => Active::cleared(mode),
                Active::Many(ids) if ids.contains(id) => {
                    Active::Many(ids.iter().filter(|a| *a != id).cloned().collect())
                }
                Active::Many(ids) if !ids.is_empty() => {
                    let mut ids = ids.clone();
                    ids.push(id.clone());
                    Active::Many(ids)
                }
                _ => Active::single(mode, id.clone()),
            };
            change(current, next)
        }
        ActiveTarget::Filter(predicate) => state
            .ids
            .iter()
            .find(|id| state.entities.get(id).is_some_and(|e| predicate(e)))
            .map_or(Resolved::Unchanged, |id| {
                change(current, Active::single(mode, id.clone()))
            }),
        ActiveTarget::Clear => change(current, Active::cleared(mode)),
    }
}

impl<E: Entity> EntityStore<E> {
    /// Changes the active selection.
    pub fn set_active(&self, target: ActiveTarget<E>) -> StoreResult<()> {
        let current = self.store.value();
        match resolve_active(&target, &current, self.active_mode()) {
            Resolved::Change(active) => self.commit_active(&current, active),
            Resolved::Unchanged => Ok(()),
        }
    }

    /// Adds ids to the selection, keeping first-seen order.
    pub fn add_active(&self, ids: impl IntoIterator<Item = E::Id>) -> StoreResult<()> {
        let current = self.store.value();
        let mut active = current.active.ids();
        let before = active.len();
        for id in ids {
            if !active.contains(&id) {
                active.push(id);
            }
        }
        if active.len() == before {
            return Ok(());
        }
        self.commit_active(&current, Active::Many(active))
    }

    /// Removes ids from the selection.
    pub fn remove_active(&self, ids: impl IntoIterator<Item = E::Id>) -> StoreResult<()> {
        let current = self.store.value();
        let removed: Vec<E::Id> = ids
            .into_iter()
            .filter(|id| current.active.contains(id))
            .collect();
        if removed.is_empty() {
            return Ok(());
        }
        let next = match &current.active {
            Active::Many(active) => Active::Many(
                active
                    .iter()
                    .filter(|id| !removed.contains(id))
                    .cloned()
                    .collect(),
            ),
            _ => Active::cleared(self.active_mode()),
        };
        self.commit_active(&current, next)
    }

    /// Deselects the given active ids and selects the others, in one
    /// transaction.
    pub fn toggle_active(&self, ids: impl IntoIterator<Item = E::Id>) -> StoreResult<()> {
        let current = self.store.value();
        let (present, absent): (Vec<_>, Vec<_>) = dedup(ids)
            .into_iter()
            .partition(|id| current.active.contains(id));
        self.batch(|store| {
            store.remove_active(present)?;
            store.add_active(absent)
        })
    }

    /// Applies `patch` to the active entities.
    pub fn update_active(&self, patch: Patch<E>) -> StoreResult<()> {
        let active = self.store.value().active.ids();
        self.update(Target::Ids(active), patch)
    }

    fn commit_active(&self, current: &EntityState<E>, active: Active<E::Id>) -> StoreResult<()> {
        trace!(store = %self.name(), active = ?active, "active changed");
        self.commit(ops::with_active(current, active))?;
        self.stats().record_active_change();
        Ok(())
    }
}
