//! Operation scripts.
//!
//! A script is a JSON array of operations, each tagged by `op`:
//!
//! ```json
//! [
//!   { "op": "set", "records": [{ "id": 1, "title": "a" }] },
//!   { "op": "update", "ids": [1], "patch": { "title": "b" } },
//!   { "op": "undo", "id": 1 },
//!   { "op": "transaction", "ops": [
//!     { "op": "add", "records": [{ "id": 2 }] },
//!     { "op": "remove", "ids": [1] }
//!   ] }
//! ]
//! ```

use entistate_core::{Record, RecordId, StoreError};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for script handling.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors raised while loading or running a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("cannot read script {path}: {source}")]
    Io {
        /// Script path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The script is not a valid operation list.
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    /// A record is not a JSON object.
    #[error("operation {op}: record {index} is not an object")]
    InvalidRecord {
        /// Operation name.
        op: &'static str,
        /// Position of the record.
        index: usize,
    },

    /// An id is neither an integer nor a string.
    #[error("invalid id: {value}")]
    InvalidId {
        /// Offending value.
        value: Value,
    },

    /// The store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScriptError {
    /// Creates an invalid record error.
    pub fn invalid_record(op: &'static str, index: usize) -> Self {
        Self::InvalidRecord { op, index }
    }

    /// Creates an invalid id error.
    pub fn invalid_id(value: &Value) -> Self {
        Self::InvalidId {
            value: value.clone(),
        }
    }
}

/// Direction of a relative active change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Select the next id.
    Next,
    /// Select the previous id.
    Prev,
    /// Clear the selection.
    Clear,
}

/// One scripted operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Replace the collection.
    Set {
        /// New records.
        records: Vec<Value>,
    },
    /// Add records.
    Add {
        /// Records to add.
        records: Vec<Value>,
        /// Insert at the head.
        #[serde(default)]
        prepend: bool,
    },
    /// Merge a patch into existing records (all when `ids` is absent).
    Update {
        /// Target ids.
        #[serde(default)]
        ids: Option<Vec<Value>>,
        /// Fields to merge.
        patch: Value,
    },
    /// Update existing ids, create missing ones.
    Upsert {
        /// Target ids.
        ids: Vec<Value>,
        /// Fields to merge.
        patch: Value,
    },
    /// Insert or merge full records.
    UpsertMany {
        /// Records carrying ids.
        records: Vec<Value>,
    },
    /// Remove records (all when `ids` is absent).
    Remove {
        /// Target ids.
        #[serde(default)]
        ids: Option<Vec<Value>>,
    },
    /// Change the active selection.
    SetActive {
        /// Id to select.
        #[serde(default)]
        id: Option<Value>,
        /// Relative change, used when `id` is absent.
        #[serde(default)]
        step: Option<Step>,
    },
    /// Flip the selection of ids.
    ToggleActive {
        /// Ids to toggle.
        ids: Vec<Value>,
    },
    /// Undo the last change of an entity.
    Undo {
        /// Entity id.
        id: Value,
    },
    /// Redo the next change of an entity.
    Redo {
        /// Entity id.
        id: Value,
    },
    /// Run nested operations as one transaction.
    Transaction {
        /// Nested operations.
        ops: Vec<Op>,
    },
}

impl Op {
    /// Returns the operation tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Upsert { .. } => "upsert",
            Self::UpsertMany { .. } => "upsert_many",
            Self::Remove { .. } => "remove",
            Self::SetActive { .. } => "set_active",
            Self::ToggleActive { .. } => "toggle_active",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::Transaction { .. } => "transaction",
        }
    }

    /// Returns the number of operations, counting nested ones.
    pub fn weight(&self) -> usize {
        match self {
            Self::Transaction { ops } => 1 + ops.iter().map(Op::weight).sum::<usize>(),
            _ => 1,
        }
    }
}

/// Parses a script from JSON text.
pub fn parse(text: &str) -> ScriptResult<Vec<Op>> {
    Ok(serde_json::from_str(text)?)
}

/// Reads and parses a script file.
pub fn load(path: &Path) -> ScriptResult<Vec<Op>> {
    let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

/// Converts JSON values to records.
pub fn records(op: &'static str, values: &[Value]) -> ScriptResult<Vec<Record>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            Record::try_from(value.clone()).map_err(|_| ScriptError::invalid_record(op, index))
        })
        .collect()
}

/// Converts a JSON value to a patch record.
pub fn patch(op: &'static str, value: &Value) -> ScriptResult<Record> {
    Record::try_from(value.clone()).map_err(|_| ScriptError::invalid_record(op, 0))
}

/// Converts JSON values to record ids.
pub fn ids(values: &[Value]) -> ScriptResult<Vec<RecordId>> {
    values.iter().map(id).collect()
}

/// Converts a JSON value to a record id.
pub fn id(value: &Value) -> ScriptResult<RecordId> {
    RecordId::from_value(value).ok_or_else(|| ScriptError::invalid_id(value))
}
