use super::*;
use crate::action_feed::ActionKind;
use crate::entity::{Record, RecordId};
use crate::types::SequenceNumber;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn rec(value: Value) -> Record {
    Record::try_from(value).expect("object")
}

fn id(n: i64) -> RecordId {
    RecordId::from(n)
}

fn config() -> StoreConfig {
    StoreConfig::new()
        .name("todos")
        .coordinator(Arc::new(TransactionCoordinator::new()))
}

fn todos() -> EntityStore<Record> {
    EntityStore::new(config())
}

fn counter(store: &EntityStore<Record>) -> (Arc<AtomicUsize>, crate::Subscription) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let sub = store.store().subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (count, sub)
}

fn title(store: &EntityStore<Record>, n: i64) -> Option<Value> {
    store
        .get_entity(&id(n))
        .and_then(|e| e.get("title").cloned())
}

#[test]
fn set_replaces_and_marks_cache() {
    let store = todos();
    store.set_loading(true).unwrap();
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2}))])
        .unwrap();
    assert_eq!(store.ids(), vec![id(1), id(2)]);
    assert!(!store.loading());
    assert!(store.has_cache());

    store.set(vec![rec(json!({"id": 3}))]).unwrap();
    assert_eq!(store.ids(), vec![id(3)]);
    assert_eq!(store.count(), 1);
}

#[test]
fn set_none_is_noop() {
    let store = todos();
    let (count, _sub) = counter(&store);
    store.set_with(None, SetOptions::default()).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(!store.has_cache());
}

#[test]
fn set_with_active() {
    let store = todos();
    store
        .set_with(
            Some(vec![rec(json!({"id": 1}))].into()),
            SetOptions {
                active: Some(Active::Single(id(1))),
            },
        )
        .unwrap();
    assert_eq!(store.active(), Active::Single(id(1)));
    assert_eq!(store.get_active(), vec![rec(json!({"id": 1}))]);
}

#[test]
fn add_appends_and_skips_duplicates() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store
        .add([rec(json!({"id": 1, "title": "dup"})), rec(json!({"id": 2}))])
        .unwrap();
    assert_eq!(store.ids(), vec![id(1), id(2)]);
    assert_eq!(title(&store, 1), None);
    let state = store.store().value();
    assert_eq!(state.ids.len(), state.entities.len());
}

#[test]
fn add_empty_does_not_notify() {
    let store = todos();
    let (count, _sub) = counter(&store);
    store.add(Vec::new()).unwrap();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store.add([rec(json!({"id": 1}))]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn add_prepend_sets_loading() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store
        .add_with(
            [rec(json!({"id": 2}))],
            AddOptions {
                prepend: true,
                loading: true,
            },
        )
        .unwrap();
    assert_eq!(store.ids(), vec![id(2), id(1)]);
    assert!(store.loading());
}

#[test]
fn update_ignores_missing_ids() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    let (count, _sub) = counter(&store);
    store
        .update(Target::id(9), Patch::merge(rec(json!({"title": "x"}))))
        .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(!store.has_entity(&id(9)));
}

#[test]
fn update_with_computed_patch() {
    let store = todos();
    store
        .set(vec![rec(json!({"id": 1, "n": 1})), rec(json!({"id": 2, "n": 5}))])
        .unwrap();
    store
        .update(
            Target::all(),
            Patch::with(|e: &Record| {
                let n = e.get("n").and_then(Value::as_i64).unwrap_or(0);
                rec(json!({"n": n + 1}))
            }),
        )
        .unwrap();
    assert_eq!(store.get_entity(&id(1)).unwrap().get("n"), Some(&json!(2)));
    assert_eq!(store.get_entity(&id(2)).unwrap().get("n"), Some(&json!(6)));
}

#[test]
fn update_rename_emits_id_changed() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    let cursor = store.actions().latest_sequence();
    store
        .update(Target::id(1), Patch::merge(rec(json!({"id": 10}))))
        .unwrap();
    assert_eq!(store.ids(), vec![id(10)]);
    let actions = store.actions().poll(cursor, 10);
    assert_eq!(actions[0].kind, ActionKind::IdChanged);
    assert_eq!(actions[0].previous, Some(id(1)));
    assert_eq!(actions[1].kind, ActionKind::Update);
}

#[test]
fn hooks_transform_entities() {
    struct Stamp;
    impl EntityHooks<Record> for Stamp {
        fn pre_add(&self, entity: Record) -> Record {
            entity.with("created", true)
        }
        fn pre_update(&self, _previous: &Record, next: Record) -> Record {
            next.with("touched", true)
        }
    }

    let store = EntityStore::<Record>::with_hooks(config(), Arc::new(Stamp));
    store.add([rec(json!({"id": 1}))]).unwrap();
    store
        .update(Target::id(1), Patch::merge(rec(json!({"title": "a"}))))
        .unwrap();
    let entity = store.get_entity(&id(1)).unwrap();
    assert_eq!(entity.get("created"), Some(&json!(true)));
    assert_eq!(entity.get("touched"), Some(&json!(true)));
}

#[test]
fn upsert_existing_merges_fields() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1, "title": "1"}))]).unwrap();
    store
        .upsert([1], Patch::merge(rec(json!({"title": "new"}))))
        .unwrap();
    assert_eq!(store.get_entity(&id(1)), Some(rec(json!({"id": 1, "title": "new"}))));
    assert_eq!(store.ids().len(), 1);
}

#[test]
fn upsert_creates_in_first_seen_order() {
    let store = todos();
    let (count, _sub) = counter(&store);
    store
        .upsert([2, 3], Patch::merge(rec(json!({"title": "t"}))))
        .unwrap();
    assert_eq!(store.ids(), vec![id(2), id(3)]);
    assert_eq!(title(&store, 2), Some(json!("t")));
    assert_eq!(title(&store, 3), Some(json!("t")));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn upsert_mixed_notifies_once() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    let (count, _sub) = counter(&store);
    store
        .upsert([1, 2], Patch::merge(rec(json!({"done": true}))))
        .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(store.ids(), vec![id(1), id(2)]);
}

#[test]
fn upsert_uses_factory_for_new_entities() {
    let store = todos();
    store
        .upsert_with(
            [7],
            Patch::merge(rec(json!({"title": "x"}))),
            UpsertOptions::<Record>::with_factory(|_, patch| patch.clone().with("kind", "todo")),
        )
        .unwrap();
    assert_eq!(
        store.get_entity(&id(7)),
        Some(rec(json!({"id": 7, "title": "x", "kind": "todo"})))
    );
}

#[test]
fn upsert_many_updates_in_place_and_appends() {
    let store = todos();
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2}))])
        .unwrap();
    store
        .upsert_many(vec![
            rec(json!({"id": 1, "title": "x"})),
            rec(json!({"id": 3, "title": "y"})),
        ])
        .unwrap();
    assert_eq!(store.ids(), vec![id(1), id(2), id(3)]);
    assert_eq!(title(&store, 1), Some(json!("x")));
    assert_eq!(title(&store, 3), Some(json!("y")));
}

#[test]
fn upsert_many_missing_id_changes_nothing() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    let before = store.store().value();
    let err = store
        .upsert_many(vec![rec(json!({"id": 2})), rec(json!({"title": "x"}))])
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingEntityId { index: 1, .. }));
    assert_eq!(*store.store().value(), *before);
}

#[test]
fn replace_only_touches_existing() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1, "a": 1}))]).unwrap();
    store
        .replace(Target::ids([1, 2]), rec(json!({"b": 2})))
        .unwrap();
    assert_eq!(store.get_entity(&id(1)), Some(rec(json!({"id": 1, "b": 2}))));
    assert!(!store.has_entity(&id(2)));
}

#[test]
fn move_id_reorders() {
    let store = todos();
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2})), rec(json!({"id": 3}))])
        .unwrap();
    store.move_id(2, 0).unwrap();
    assert_eq!(store.ids(), vec![id(3), id(1), id(2)]);
}

#[test]
fn remove_by_predicate_and_all() {
    let store = todos();
    store
        .set(vec![
            rec(json!({"id": 1, "done": true})),
            rec(json!({"id": 2, "done": false})),
        ])
        .unwrap();
    store
        .remove(Target::matching(|e: &Record| e.get("done") == Some(&json!(true))))
        .unwrap();
    assert_eq!(store.ids(), vec![id(2)]);
    assert!(store.has_cache());

    store.remove(Target::All).unwrap();
    assert!(store.is_empty());
    assert!(!store.has_cache());
}

#[test]
fn remove_all_clears_selection() {
    let store = todos();
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2}))])
        .unwrap();
    store.set_active(ActiveTarget::id(1)).unwrap();

    store.remove(Target::All).unwrap();
    assert!(store.ids().is_empty());
    assert_eq!(store.active(), Active::None);
    assert!(!store.has_active());
}

#[test]
fn remove_all_clears_multi_selection() {
    let store = EntityStore::<Record>::new(config().active_mode(ActiveMode::Multi));
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2}))])
        .unwrap();
    store.add_active([id(1), id(2)]).unwrap();

    store.remove(Target::All).unwrap();
    assert_eq!(store.active(), Active::Many(vec![]));
}

#[test]
fn remove_all_on_empty_keeps_cache() {
    let store = todos();
    store.set(Vec::new()).unwrap();
    assert!(store.has_cache());
    let (count, _sub) = counter(&store);

    store.remove(Target::All).unwrap();
    assert!(store.has_cache());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(store.stats().removes(), 0);
}

#[test]
fn remove_all_on_destroyed_keeps_cache() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store.destroy();

    assert!(matches!(
        store.remove(Target::All),
        Err(StoreError::Destroyed { .. })
    ));
    assert!(store.has_cache());
    assert_eq!(store.ids(), vec![id(1)]);
}

#[test]
fn remove_missing_is_noop() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    let (count, _sub) = counter(&store);
    store.remove(Target::id(5)).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn remove_keeps_active_by_default() {
    let store = todos();
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2}))])
        .unwrap();
    store.set_active(ActiveTarget::id(1)).unwrap();
    store.remove(Target::id(1)).unwrap();
    assert_eq!(store.active(), Active::Single(id(1)));
    assert!(store.get_active().is_empty());
}

#[test]
fn remove_prunes_active_when_configured() {
    let store = EntityStore::<Record>::new(config().prune_active_on_remove(true));
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store.set_active(ActiveTarget::id(1)).unwrap();
    store.remove(Target::id(1)).unwrap();
    assert_eq!(store.active(), Active::None);
}

#[test]
fn active_set_is_skipped_when_unchanged() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    let (count, _sub) = counter(&store);
    store.set_active(ActiveTarget::prev()).unwrap();
    store.set_active(ActiveTarget::id(1)).unwrap();
    store.set_active(ActiveTarget::id(1)).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(store.has_active());
}

#[test]
fn add_remove_and_toggle_active() {
    let store = EntityStore::<Record>::new(config().active_mode(crate::ActiveMode::Multi));
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2})), rec(json!({"id": 3}))])
        .unwrap();
    store.add_active([id(1), id(2), id(1)]).unwrap();
    assert_eq!(store.active(), Active::Many(vec![id(1), id(2)]));

    let (count, _sub) = counter(&store);
    store.add_active([id(2)]).unwrap();
    store.remove_active([id(3)]).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    store.toggle_active([id(2), id(3)]).unwrap();
    assert_eq!(store.active(), Active::Many(vec![id(1), id(3)]));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn update_active_patches_selection() {
    let store = todos();
    store
        .set(vec![rec(json!({"id": 1})), rec(json!({"id": 2}))])
        .unwrap();
    store.set_active(ActiveTarget::id(2)).unwrap();
    store
        .update_active(Patch::merge(rec(json!({"title": "on"}))))
        .unwrap();
    assert_eq!(title(&store, 2), Some(json!("on")));
    assert_eq!(title(&store, 1), None);
}

#[test]
fn update_state_writes_only_on_change() {
    let store = todos();
    let (count, _sub) = counter(&store);
    store.set_loading(false).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    store.set_error(Some("boom".into())).unwrap();
    assert_eq!(store.error(), Some("boom".to_string()));
    store
        .update_state(|meta| {
            meta.loading = true;
            meta.error = None;
        })
        .unwrap();
    assert!(store.loading());
    assert_eq!(store.error(), None);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn cache_flag_expires() {
    let store = EntityStore::<Record>::new(config().cache_ttl(Duration::from_millis(5)));
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    assert!(store.has_cache());
    std::thread::sleep(Duration::from_millis(20));
    assert!(!store.has_cache());
}

#[test]
fn reset_requires_resettable() {
    let store = todos();
    assert!(matches!(store.reset(), Err(StoreError::NotResettable { .. })));

    let store = EntityStore::<Record>::new(config().resettable(true));
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store.reset().unwrap();
    assert!(store.is_empty());
    assert!(!store.has_cache());
}

#[test]
fn destroy_blocks_writes_keeps_reads() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store.destroy();
    assert!(store.is_destroyed());
    assert!(matches!(
        store.add([rec(json!({"id": 2}))]),
        Err(StoreError::Destroyed { .. })
    ));
    assert_eq!(store.ids(), vec![id(1)]);
}

#[test]
fn batch_coalesces_notifications() {
    let store = todos();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = store.select_ids(move |ids| sink.lock().push(ids.clone()));

    store
        .batch(|s| {
            s.add([rec(json!({"id": 1}))])?;
            s.add([rec(json!({"id": 2}))])
        })
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1], vec![id(1), id(2)]);
}

#[test]
fn select_count_delivers_distinct_counts() {
    let store = todos();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = store.select_count(move |count| sink.lock().push(*count));

    store.add([rec(json!({"id": 1, "title": "a"}))]).unwrap();
    store
        .update(Target::id(1), Patch::merge(rec(json!({"title": "b"}))))
        .unwrap();
    store.add([rec(json!({"id": 2}))]).unwrap();
    store.remove(Target::All).unwrap();

    assert_eq!(*seen.lock(), vec![0, 1, 2, 0]);
}

#[test]
fn select_loading_follows_the_flag() {
    let store = todos();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = store.select_loading(move |loading| sink.lock().push(*loading));

    store.set_loading(true).unwrap();
    store.set_loading(true).unwrap();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store.add([rec(json!({"id": 2}))]).unwrap();

    assert_eq!(*seen.lock(), vec![false, true, false]);
}

#[test]
fn nested_batches_notify_after_outer_close() {
    let store = todos();
    let (count, _sub) = counter(&store);
    let coordinator = Arc::clone(store.coordinator());

    coordinator.run(|| {
        coordinator.run(|| {
            store.add([rec(json!({"id": 1}))]).unwrap();
            store.add([rec(json!({"id": 2}))]).unwrap();
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    });
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(store.count(), 2);
}

#[test]
fn select_entity_tracks_changes() {
    let store = todos();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = store.select_entity(id(1), move |e| sink.lock().push(e.clone()));

    store.add([rec(json!({"id": 1}))]).unwrap();
    store.add([rec(json!({"id": 2}))]).unwrap();
    store.remove(Target::id(1)).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], None);
    assert_eq!(seen[1], Some(rec(json!({"id": 1}))));
    assert_eq!(seen[2], None);
}

#[test]
fn actions_record_operation_kinds() {
    let store = todos();
    store.set(vec![rec(json!({"id": 1}))]).unwrap();
    store.add([rec(json!({"id": 2}))]).unwrap();
    store.remove(Target::id(1)).unwrap();
    let kinds: Vec<_> = store
        .actions()
        .poll(SequenceNumber::new(0), 10)
        .into_iter()
        .map(|a| a.kind)
        .collect();
    assert_eq!(kinds, vec![ActionKind::Set, ActionKind::Add, ActionKind::Remove]);
    assert_eq!(store.stats().removes(), 1);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn seeded(n: i64) -> EntityStore<Record> {
        let store = todos();
        store
            .set((0..n).map(|i| rec(json!({ "id": i }))).collect::<Vec<_>>())
            .unwrap();
        store
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn move_id_keeps_the_id_set(len in 1i64..10, from in 0usize..12, to in 0usize..12) {
            let store = seeded(len);
            let mut before = store.ids();
            store.move_id(from, to).unwrap();
            let mut after = store.ids();
            if from < len as usize && to < len as usize {
                prop_assert_eq!(&after[to], &before[from]);
            } else {
                prop_assert_eq!(&after, &before);
            }
            before.sort();
            after.sort();
            prop_assert_eq!(after, before);
        }

        #[test]
        fn add_never_duplicates_ids(
            seed in 0i64..8,
            extra in prop::collection::vec(0i64..12, 0..10),
            prepend in any::<bool>(),
        ) {
            let store = seeded(seed);
            let records: Vec<_> = extra.iter().map(|i| rec(json!({ "id": i }))).collect();
            store
                .add_with(records, AddOptions { prepend, loading: false })
                .unwrap();
            let ids = store.ids();
            let mut unique = ids.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), ids.len());
            prop_assert_eq!(ids.len(), store.count());
        }
    }
}
