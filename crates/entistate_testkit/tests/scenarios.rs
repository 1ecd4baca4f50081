//! End-to-end scenarios across the collection, transactions and history.

use entistate_core::{Patch, Target};
use entistate_plugins::{EntityStateHistoryPlugin, HistoryConfig, StateHistory};
use entistate_testkit::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[test]
fn upsert_updates_an_existing_entity() {
    let todos = TestCollection::seeded(vec![record(1, "1")]);
    todos
        .upsert([1], Patch::merge(rec(json!({"title": "new"}))))
        .unwrap();
    assert_eq!(todos.get_entity(&id(1)), Some(record(1, "new")));
    assert_eq!(todos.ids().len(), 1);
}

#[test]
fn upsert_creates_missing_entities_in_order() {
    let todos = TestCollection::new();
    todos
        .upsert([2, 3], Patch::merge(rec(json!({"title": "t"}))))
        .unwrap();
    assert_eq!(todos.ids(), vec![id(2), id(3)]);
    assert_eq!(todos.get_entity(&id(2)), Some(record(2, "t")));
    assert_eq!(todos.get_entity(&id(3)), Some(record(3, "t")));
}

#[test]
fn upsert_many_updates_in_place_and_appends() {
    let todos = TestCollection::seeded(vec![rec(json!({"id": 1})), rec(json!({"id": 2}))]);
    todos
        .upsert_many(vec![record(1, "x"), record(3, "y")])
        .unwrap();
    assert_eq!(todos.ids(), vec![id(1), id(2), id(3)]);
    assert_eq!(todos.get_entity(&id(1)), Some(record(1, "x")));
    assert_eq!(todos.get_entity(&id(3)), Some(record(3, "y")));
}

#[test]
fn history_undo_and_redo() {
    let mut history = StateHistory::new(record(1, "initial"), 10);
    history.push(record(1, "A"));
    history.push(record(1, "B"));

    history.undo();
    assert_eq!(history.present(), &record(1, "A"));
    assert!(history.has_future());

    history.redo();
    assert_eq!(history.present(), &record(1, "B"));
    assert!(!history.has_future());
}

#[test]
fn entity_history_follows_store_changes() {
    let todos = TestCollection::seeded(vec![record(1, "A")]);
    let history = EntityStateHistoryPlugin::new(Arc::clone(&todos.store), HistoryConfig::new());
    todos
        .update(Target::id(1), Patch::merge(rec(json!({"title": "B"}))))
        .unwrap();

    history.undo(&id(1)).unwrap();
    assert_eq!(todos.get_entity(&id(1)), Some(record(1, "A")));
    assert!(history.has_future(&id(1)));

    history.redo(&id(1)).unwrap();
    assert_eq!(todos.get_entity(&id(1)), Some(record(1, "B")));
    assert!(!history.has_future(&id(1)));
}

#[test]
fn nested_transactions_notify_once_after_outer_close() {
    let todos = TestCollection::new();
    let recorder = NotificationRecorder::attach(&todos);
    let inner_closed = Arc::new(AtomicBool::new(false));

    todos.coordinator.run(|| {
        todos.coordinator.run(|| {
            todos.add([record(1, "a")]).unwrap();
            todos.add([record(2, "b")]).unwrap();
        });
        inner_closed.store(true, Ordering::SeqCst);
        assert_eq!(recorder.count(), 0);
    });

    assert!(inner_closed.load(Ordering::SeqCst));
    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.last().unwrap().ids, vec![id(1), id(2)]);
    assert_eq!(todos.coordinator.depth(), 0);
}

#[test]
fn failing_transaction_still_flushes() {
    let todos = TestCollection::new();
    let recorder = NotificationRecorder::attach(&todos);

    let result = todos.batch(|t| {
        t.add([record(1, "a")])?;
        t.upsert_many(vec![rec(json!({"title": "no id"}))])
    });

    assert!(result.is_err());
    assert_eq!(todos.coordinator.depth(), 0);
    assert_eq!(recorder.count(), 1);
    assert_eq!(todos.ids(), vec![id(1)]);
}
