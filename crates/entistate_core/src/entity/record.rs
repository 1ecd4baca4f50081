//! Dynamic JSON record.

use super::id::RecordId;
use super::traits::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless entity backed by a JSON object.
///
/// The identifier lives in an ordinary field whose name is the store's id
/// key. Patches are records too: merging lays the patch fields over the
/// existing ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, returning the record for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Sets a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the record to a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// Accepts JSON objects; any other value is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl Entity for Record {
    type Id = RecordId;
    type Patch = Record;

    fn entity_id(&self, id_key: &str) -> Option<RecordId> {
        self.0.get(id_key).and_then(RecordId::from_value)
    }

    fn set_entity_id(&mut self, id: &RecordId, id_key: &str) {
        self.0.insert(id_key.to_string(), id.to_value());
    }

    fn merge(&self, patch: &Record) -> Self {
        let mut merged = self.0.clone();
        for (key, value) in &patch.0 {
            merged.insert(key.clone(), value.clone());
        }
        Self(merged)
    }

    fn from_patch(patch: &Record) -> Self {
        patch.clone()
    }

    fn overlay(&self, incoming: &Self) -> Self {
        self.merge(incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn entity_id_uses_configured_key() {
        let record = rec(json!({"id": 1, "uuid": "u-1"}));
        assert_eq!(record.entity_id("id"), Some(RecordId::Int(1)));
        assert_eq!(record.entity_id("uuid"), Some(RecordId::from("u-1")));
        assert_eq!(record.entity_id("missing"), None);
    }

    #[test]
    fn merge_overlays_patch_fields() {
        let record = rec(json!({"id": 1, "title": "a", "done": false}));
        let merged = record.merge(&rec(json!({"title": "b"})));
        assert_eq!(merged, rec(json!({"id": 1, "title": "b", "done": false})));
    }

    #[test]
    fn set_entity_id_writes_field() {
        let mut record = rec(json!({"title": "t"}));
        record.set_entity_id(&RecordId::from(9), "key");
        assert_eq!(record.get("key"), Some(&json!(9)));
    }

    #[test]
    fn try_from_rejects_non_objects() {
        assert_eq!(Record::try_from(json!([1, 2])), Err(json!([1, 2])));
    }

    #[test]
    fn builder_sets_fields() {
        let record = Record::new().with("id", 2).with("title", "x");
        assert_eq!(record.len(), 2);
        assert_eq!(record.into_value(), json!({"id": 2, "title": "x"}));
    }
}
