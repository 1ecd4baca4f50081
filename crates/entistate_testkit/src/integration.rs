//! Cross-crate integration test helpers.
//!
//! [`IntegrationHarness`] drives a record collection with a history plugin
//! attached and mirrors every operation in a plain shadow model, so tests
//! can check the collection, its invariants and the plugin's satellites
//! after any operation sequence.

use crate::fixtures::TestCollection;
use crate::generators::CollectionOp;
use entistate_core::{AddOptions, Entity, Patch, Record, RecordId, Target, DEFAULT_ID_KEY};
use entistate_plugins::{EntityStateHistoryPlugin, HistoryConfig};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Expected collection contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadowModel {
    /// Expected id order.
    pub ids: Vec<RecordId>,
    /// Expected records.
    pub entities: HashMap<RecordId, Record>,
}

impl ShadowModel {
    /// Applies `op` the way the collection is expected to.
    pub fn apply(&mut self, op: &CollectionOp) {
        match op {
            CollectionOp::Set { records } => {
                self.ids.clear();
                self.entities.clear();
                for record in records {
                    if let Some(id) = record.entity_id(DEFAULT_ID_KEY) {
                        if self.entities.insert(id.clone(), record.clone()).is_none() {
                            self.ids.push(id);
                        }
                    }
                }
            }
            CollectionOp::Add { records, prepend } => {
                let mut added = Vec::new();
                for record in records {
                    let Some(id) = record.entity_id(DEFAULT_ID_KEY) else {
                        continue;
                    };
                    if self.entities.contains_key(&id) {
                        continue;
                    }
                    self.entities.insert(id.clone(), record.clone());
                    added.push(id);
                }
                if *prepend {
                    added.reverse();
                    added.append(&mut self.ids);
                    self.ids = added;
                } else {
                    self.ids.append(&mut added);
                }
            }
            CollectionOp::Upsert { ids, patch } => {
                let mut seen = HashSet::new();
                for id in ids {
                    if !seen.insert(id.clone()) {
                        continue;
                    }
                    match self.entities.get(id) {
                        Some(existing) => {
                            let merged = existing.merge(patch);
                            self.entities.insert(id.clone(), merged);
                        }
                        None => {
                            let mut created = patch.clone();
                            created.set_entity_id(id, DEFAULT_ID_KEY);
                            self.entities.insert(id.clone(), created);
                            self.ids.push(id.clone());
                        }
                    }
                }
            }
            CollectionOp::Remove { ids } => {
                let removed: HashSet<&RecordId> = ids.iter().collect();
                self.ids.retain(|id| !removed.contains(id));
                self.entities.retain(|id, _| !removed.contains(id));
            }
            CollectionOp::RemoveAll => {
                self.ids.clear();
                self.entities.clear();
            }
        }
    }
}

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The collection under test.
    pub collection: TestCollection,
    /// History plugin following every id.
    pub history: EntityStateHistoryPlugin<Record>,
    /// Expected contents.
    model: ShadowModel,
}

impl IntegrationHarness {
    /// Creates a harness over an empty collection.
    pub fn new() -> Self {
        let collection = TestCollection::new();
        let history =
            EntityStateHistoryPlugin::new(Arc::clone(&collection.store), HistoryConfig::new());
        Self {
            collection,
            history,
            model: ShadowModel::default(),
        }
    }

    /// Applies `op` to the collection and the shadow model.
    ///
    /// # Panics
    ///
    /// Panics if the collection rejects the operation.
    pub fn apply(&mut self, op: &CollectionOp) {
        let store = &self.collection.store;
        let result = match op.clone() {
            CollectionOp::Set { records } => store.set(records),
            CollectionOp::Add { records, prepend } => store.add_with(
                records,
                AddOptions {
                    prepend,
                    loading: false,
                },
            ),
            CollectionOp::Upsert { ids, patch } => store.upsert(ids, Patch::merge(patch)),
            CollectionOp::Remove { ids } => store.remove(Target::Ids(ids)),
            CollectionOp::RemoveAll => store.remove(Target::All),
        };
        result.expect("Operation failed");
        self.model.apply(op);
    }

    /// Applies every operation, verifying after each one.
    pub fn run(&mut self, ops: &[CollectionOp]) {
        for op in ops {
            self.apply(op);
            self.verify();
        }
    }

    /// Returns the expected contents.
    pub fn model(&self) -> &ShadowModel {
        &self.model
    }

    /// Asserts that the collection matches the model and that every live
    /// id has exactly one history.
    ///
    /// # Panics
    ///
    /// Panics on any mismatch.
    pub fn verify(&self) {
        self.collection.assert_consistent();
        let state = self.collection.snapshot();
        assert_eq!(state.ids, self.model.ids, "Id order mismatch");
        assert_eq!(state.entities, self.model.entities, "Entity mismatch");

        let satellites: HashSet<RecordId> =
            self.history.plugin().satellite_ids().into_iter().collect();
        let live: HashSet<RecordId> = state.ids.iter().cloned().collect();
        assert_eq!(satellites, live, "Satellites out of step with ids");
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}
