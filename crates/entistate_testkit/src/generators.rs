//! Property-based test generators using proptest.
//!
//! Ids are drawn from a small range so that generated operation
//! sequences hit existing ids often.

use entistate_core::{Record, RecordId};
use proptest::prelude::*;

/// Upper bound (exclusive) of generated integer ids.
pub const ID_RANGE: i64 = 16;

/// Strategy for generating record ids.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    prop_oneof![
        4 => (0..ID_RANGE).prop_map(RecordId::Int),
        1 => prop::string::string_regex("[a-f]{1,3}")
            .expect("Invalid regex")
            .prop_map(RecordId::Str),
    ]
}

/// Strategy for generating titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{0,8}").expect("Invalid regex")
}

/// Strategy for generating a record with the given id.
pub fn record_with_id(id: RecordId) -> impl Strategy<Value = Record> {
    (title_strategy(), any::<bool>(), any::<i32>()).prop_map(move |(title, done, n)| {
        Record::new()
            .with("id", id.to_value())
            .with("title", title)
            .with("done", done)
            .with("n", n)
    })
}

/// Strategy for generating records.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    record_id_strategy().prop_flat_map(record_with_id)
}

/// Strategy for generating a partial update (never touching the id).
pub fn patch_strategy() -> impl Strategy<Value = Record> {
    (
        prop::option::of(title_strategy()),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(title, done)| {
            let mut patch = Record::new();
            if let Some(title) = title {
                patch.insert("title", title);
            }
            if let Some(done) = done {
                patch.insert("done", done);
            }
            patch
        })
}

/// One collection operation.
#[derive(Debug, Clone)]
pub enum CollectionOp {
    /// Replace the collection.
    Set {
        /// New records.
        records: Vec<Record>,
    },
    /// Add records.
    Add {
        /// Records to add.
        records: Vec<Record>,
        /// Insert at the head.
        prepend: bool,
    },
    /// Upsert ids with a patch.
    Upsert {
        /// Target ids.
        ids: Vec<RecordId>,
        /// Fields to merge.
        patch: Record,
    },
    /// Remove ids.
    Remove {
        /// Ids to remove.
        ids: Vec<RecordId>,
    },
    /// Remove everything.
    RemoveAll,
}

/// Strategy for generating collection operations.
pub fn collection_op_strategy() -> impl Strategy<Value = CollectionOp> {
    prop_oneof![
        1 => prop::collection::vec(record_strategy(), 0..6)
            .prop_map(|records| CollectionOp::Set { records }),
        4 => (prop::collection::vec(record_strategy(), 0..4), any::<bool>())
            .prop_map(|(records, prepend)| CollectionOp::Add { records, prepend }),
        2 => (prop::collection::vec(record_id_strategy(), 0..4), patch_strategy())
            .prop_map(|(ids, patch)| CollectionOp::Upsert { ids, patch }),
        3 => prop::collection::vec(record_id_strategy(), 0..4)
            .prop_map(|ids| CollectionOp::Remove { ids }),
        1 => Just(CollectionOp::RemoveAll),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<CollectionOp>> {
    prop::collection::vec(collection_op_strategy(), min_ops..max_ops)
}

/// Strategy for generating a collection seed with unique ids.
pub fn seed_strategy(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::btree_set(0..ID_RANGE, 0..max_len).prop_flat_map(|ids| {
        ids.into_iter()
            .map(|n| record_with_id(RecordId::Int(n)))
            .collect::<Vec<_>>()
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
