//! Test fixtures and collection helpers.

use entistate_core::{
    EntityState, EntityStore, Record, RecordId, StoreConfig, Subscription, TransactionCoordinator,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

/// Builds a record from a JSON object.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn rec(value: Value) -> Record {
    Record::try_from(value).expect("record must be a JSON object")
}

/// Builds `{ "id": id, "title": title }`.
pub fn record(id: i64, title: &str) -> Record {
    rec(json!({ "id": id, "title": title }))
}

/// Builds an integer record id.
pub fn id(n: i64) -> RecordId {
    RecordId::from(n)
}

/// A record collection with its own transaction coordinator.
///
/// Tests running in parallel never share batching state.
pub struct TestCollection {
    /// The collection.
    pub store: Arc<EntityStore<Record>>,
    /// The coordinator the collection batches with.
    pub coordinator: Arc<TransactionCoordinator>,
}

impl TestCollection {
    /// Creates an empty collection named `test`.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::new().name("test"))
    }

    /// Creates a collection from `config`, replacing its coordinator.
    pub fn with_config(config: StoreConfig) -> Self {
        let coordinator = Arc::new(TransactionCoordinator::new());
        let store = Arc::new(EntityStore::new(config.coordinator(Arc::clone(&coordinator))));
        Self { store, coordinator }
    }

    /// Creates a collection holding `records`.
    pub fn seeded(records: Vec<Record>) -> Self {
        let collection = Self::new();
        collection
            .store
            .set(records)
            .expect("Failed to seed collection");
        collection
    }

    /// Returns a snapshot of the state.
    pub fn snapshot(&self) -> Arc<EntityState<Record>> {
        self.store.store().value()
    }

    /// Asserts that `ids` and `entities` describe the same records.
    pub fn assert_consistent(&self) {
        let state = self.snapshot();
        assert_eq!(
            state.ids.len(),
            state.entities.len(),
            "ids and entities out of step"
        );
        for id in &state.ids {
            assert!(state.entities.contains_key(id), "id {id} has no entity");
        }
    }
}

impl Default for TestCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestCollection {
    type Target = EntityStore<Record>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Records every snapshot a collection notifies.
pub struct NotificationRecorder {
    seen: Arc<Mutex<Vec<Arc<EntityState<Record>>>>>,
    _subscription: Subscription,
}

impl NotificationRecorder {
    /// Subscribes to `store`.
    pub fn attach(store: &EntityStore<Record>) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = store
            .store()
            .subscribe(move |state| sink.lock().push(Arc::new(state.clone())));
        Self {
            seen,
            _subscription: subscription,
        }
    }

    /// Returns the number of notifications received.
    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Returns the most recent snapshot.
    pub fn last(&self) -> Option<Arc<EntityState<Record>>> {
        self.seen.lock().last().cloned()
    }

    /// Returns the ids of every notified snapshot.
    pub fn id_history(&self) -> Vec<Vec<RecordId>> {
        self.seen.lock().iter().map(|s| s.ids.clone()).collect()
    }

    /// Forgets recorded notifications.
    pub fn reset(&self) {
        self.seen.lock().clear();
    }
}
