//! History satellite for one entity.

use super::config::HistoryConfig;
use super::stack::StateHistory;
use crate::collection::Satellite;
use entistate_core::{Entity, EntityStore, StoreResult, Subscription, Target};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

struct Recorder<E> {
    history: Option<StateHistory<E>>,
    paused: bool,
    config: HistoryConfig<E>,
}

impl<E: Entity> Recorder<E> {
    fn observe(&mut self, value: &E) {
        let Some(history) = self.history.as_mut() else {
            self.history = Some(StateHistory::new(value.clone(), self.config.max_age));
            return;
        };
        if history.present() == value {
            return;
        }
        let recorded = !self.paused
            && self.config.accepts(history.present(), value)
            && history.push(value.clone());
        if !recorded {
            history.set_present(value.clone());
        }
    }
}

/// Undo/redo history of one entity.
///
/// While active, every change of the entity is pushed onto its history
/// unless the history is paused, the change is ignored once, or the
/// configured comparator rejects it. Undo and redo write the restored
/// snapshot back into the store.
pub struct EntityHistory<E: Entity> {
    id: E::Id,
    store: Arc<EntityStore<E>>,
    recorder: Arc<Mutex<Recorder<E>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<E: Entity> EntityHistory<E> {
    /// Creates an inactive history for `id`.
    pub fn new(store: Arc<EntityStore<E>>, id: E::Id, config: HistoryConfig<E>) -> Self {
        Self {
            id,
            store,
            recorder: Arc::new(Mutex::new(Recorder {
                history: None,
                paused: false,
                config,
            })),
            subscription: Mutex::new(None),
        }
    }

    /// Seeds the present from the store and starts recording changes.
    pub fn activate(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }
        if let Some(current) = self.store.get_entity(&self.id) {
            self.recorder.lock().observe(&current);
        }
        let recorder = Arc::clone(&self.recorder);
        let id = self.id.clone();
        *subscription = Some(self.store.store().select_changes(
            move |state| state.entity(&id).cloned(),
            move |value: &Option<E>| {
                if let Some(value) = value {
                    recorder.lock().observe(value);
                }
            },
        ));
    }

    /// Returns the entity id.
    pub fn id(&self) -> &E::Id {
        &self.id
    }

    /// Returns true while recording.
    pub fn is_active(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Restores the previous snapshot. Returns false when there is none.
    pub fn undo(&self) -> StoreResult<bool> {
        self.step(StateHistory::undo)
    }

    /// Restores the next snapshot. Returns false when there is none.
    pub fn redo(&self) -> StoreResult<bool> {
        self.step(StateHistory::redo)
    }

    /// Restores `past[index]`.
    pub fn jump_to_past(&self, index: usize) -> StoreResult<bool> {
        self.step(|history| history.jump_to_past(index))
    }

    /// Restores `future[index]`.
    pub fn jump_to_future(&self, index: usize) -> StoreResult<bool> {
        self.step(|history| history.jump_to_future(index))
    }

    /// Moves `steps` snapshots forward or back.
    pub fn jump(&self, steps: isize) -> StoreResult<bool> {
        self.step(|history| history.jump(steps))
    }

    fn step(&self, f: impl FnOnce(&mut StateHistory<E>) -> bool) -> StoreResult<bool> {
        let present = {
            let mut recorder = self.recorder.lock();
            let Some(history) = recorder.history.as_mut() else {
                return Ok(false);
            };
            if !f(history) {
                return Ok(false);
            }
            history.present().clone()
        };
        trace!(store = %self.store.name(), id = ?self.id, "history restored");
        self.store
            .batch(|store| store.replace(Target::Id(self.id.clone()), present))?;
        Ok(true)
    }

    /// Drops past and future snapshots.
    pub fn clear(&self) {
        if let Some(history) = self.recorder.lock().history.as_mut() {
            history.clear();
        }
    }

    /// Leaves the next change unrecorded.
    pub fn ignore_next(&self) {
        if let Some(history) = self.recorder.lock().history.as_mut() {
            history.ignore_next();
        }
    }

    /// Stops recording until [`EntityHistory::resume`].
    pub fn pause(&self) {
        self.recorder.lock().paused = true;
    }

    /// Resumes recording.
    pub fn resume(&self) {
        self.recorder.lock().paused = false;
    }

    /// Returns true while paused.
    pub fn is_paused(&self) -> bool {
        self.recorder.lock().paused
    }

    /// Returns true if `undo` would restore something.
    pub fn has_past(&self) -> bool {
        self.recorder
            .lock()
            .history
            .as_ref()
            .is_some_and(StateHistory::has_past)
    }

    /// Returns true if `redo` would restore something.
    pub fn has_future(&self) -> bool {
        self.recorder
            .lock()
            .history
            .as_ref()
            .is_some_and(StateHistory::has_future)
    }

    /// Returns the recorded present.
    pub fn present(&self) -> Option<E> {
        self.recorder
            .lock()
            .history
            .as_ref()
            .map(|history| history.present().clone())
    }

    /// Returns past snapshots, oldest first.
    pub fn past(&self) -> Vec<E> {
        self.recorder
            .lock()
            .history
            .as_ref()
            .map(|history| history.past().to_vec())
            .unwrap_or_default()
    }

    /// Returns future snapshots, next first.
    pub fn future(&self) -> Vec<E> {
        self.recorder
            .lock()
            .history
            .as_ref()
            .map(|history| history.future().to_vec())
            .unwrap_or_default()
    }
}

impl<E: Entity> Satellite for EntityHistory<E> {
    fn destroy(&self) {
        self.subscription.lock().take();
    }
}

impl<E: Entity> fmt::Debug for EntityHistory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recorder = self.recorder.lock();
        let (past, future) = recorder
            .history
            .as_ref()
            .map_or((0, 0), |h| (h.past().len(), h.future().len()));
        f.debug_struct("EntityHistory")
            .field("id", &self.id)
            .field("past", &past)
            .field("future", &future)
            .field("paused", &recorder.paused)
            .finish()
    }
}
