//! Entity action feed.
//!
//! Every entity mutation that changes membership or content emits an
//! [`EntityAction`] naming the affected ids. Unlike store notifications,
//! actions are emitted immediately, also inside transactions, and carry the
//! kind of change, enabling:
//! - Satellite bookkeeping keyed by added or removed ids
//! - Audit trails
//! - Catch-up polling from a sequence cursor
//!
//! # Usage
//!
//! ```rust,ignore
//! let todos = EntityStore::<Record>::new(StoreConfig::new());
//! let receiver = todos.actions().subscribe();
//!
//! todos.add(record)?;
//!
//! let action = receiver.recv()?;
//! assert_eq!(action.kind, ActionKind::Add);
//! ```

use crate::types::SequenceNumber;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// Kind of entity action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// The collection was replaced.
    Set,
    /// Entities were added.
    Add,
    /// Entities were updated.
    Update,
    /// Entities were removed.
    Remove,
    /// An entity's identifier changed during an update.
    IdChanged,
}

/// A single entity action.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EntityAction<Id> {
    /// Sequence number within the emitting store.
    pub sequence: SequenceNumber,
    /// Kind of action.
    pub kind: ActionKind,
    /// Affected ids. For `IdChanged`, the new id.
    pub ids: Vec<Id>,
    /// Previous id, for `IdChanged` only.
    pub previous: Option<Id>,
}

impl<Id> EntityAction<Id> {
    /// Creates an action of `kind` over `ids`.
    pub fn new(sequence: SequenceNumber, kind: ActionKind, ids: Vec<Id>) -> Self {
        Self {
            sequence,
            kind,
            ids,
            previous: None,
        }
    }

    /// Creates an id-change action.
    pub fn id_changed(sequence: SequenceNumber, previous: Id, current: Id) -> Self {
        Self {
            sequence,
            kind: ActionKind::IdChanged,
            ids: vec![current],
            previous: Some(previous),
        }
    }
}

/// Distributes entity actions to subscribers.
///
/// The feed:
/// - Assigns increasing sequence numbers
/// - Preserves emission order
/// - Supports multiple channel subscribers
/// - Keeps a bounded history for polling
pub struct ActionFeed<Id> {
    /// Subscribers (senders).
    subscribers: RwLock<Vec<Sender<EntityAction<Id>>>>,
    /// Recent actions for polling.
    history: RwLock<VecDeque<EntityAction<Id>>>,
    /// Maximum history size.
    max_history: usize,
    /// Last assigned sequence number.
    sequence: AtomicU64,
}

impl<Id: Clone + Send> ActionFeed<Id> {
    /// Creates a feed keeping the last 1000 actions.
    pub fn new() -> Self {
        Self::with_max_history(1000)
    }

    /// Creates a feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            max_history,
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribes to the feed.
    ///
    /// The receiver gets every action emitted from now on. Dropping it
    /// unsubscribes on the next emission.
    pub fn subscribe(&self) -> Receiver<EntityAction<Id>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an action of `kind` over `ids`.
    pub fn emit(&self, kind: ActionKind, ids: Vec<Id>) -> SequenceNumber {
        let sequence = self.next_sequence();
        self.publish(EntityAction::new(sequence, kind, ids));
        sequence
    }

    /// Emits an id-change action.
    pub fn emit_id_changed(&self, previous: Id, current: Id) -> SequenceNumber {
        let sequence = self.next_sequence();
        self.publish(EntityAction::id_changed(sequence, previous, current));
        sequence
    }

    fn next_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn publish(&self, action: EntityAction<Id>) {
        if self.max_history > 0 {
            let mut history = self.history.write();
            history.push_back(action.clone());
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        // Send to subscribers (remove disconnected ones)
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(action.clone()).is_ok());
    }

    /// Returns actions with sequence > `cursor`, up to `limit`.
    pub fn poll(&self, cursor: SequenceNumber, limit: usize) -> Vec<EntityAction<Id>> {
        self.history
            .read()
            .iter()
            .filter(|action| action.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the last assigned sequence number.
    pub fn latest_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.sequence.load(Ordering::SeqCst))
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of actions in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    /// Drops history older than `min_sequence`.
    pub fn truncate_history(&self, min_sequence: SequenceNumber) {
        self.history
            .write()
            .retain(|action| action.sequence >= min_sequence);
    }

    /// Disconnects every subscriber.
    pub fn close(&self) {
        self.subscribers.write().clear();
    }
}

impl<Id: Clone + Send> Default for ActionFeed<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id> std::fmt::Debug for ActionFeed<Id> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionFeed")
            .field("subscribers", &self.subscribers.read().len())
            .field("history", &self.history.read().len())
            .field("max_history", &self.max_history)
            .finish()
    }
}
