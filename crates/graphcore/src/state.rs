use crate::{NodeId, StateError, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// How concurrent writes to a field combine when partial updates are
/// merged into the shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Last write wins. The default; safe only when a single node owns
    /// the field among any set of concurrently runnable nodes.
    Overwrite,
    /// Values accumulate in arrival order. The field is stored as an
    /// array; an incoming array extends it element-wise, any other
    /// value is pushed as one element.
    Append,
}

/// Declared fields of one execution's state, each with its merge
/// policy. Writes to undeclared fields are rejected at merge time.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    fields: HashMap<String, MergePolicy>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an overwrite field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), MergePolicy::Overwrite);
        self
    }

    /// Declare an accumulating field.
    pub fn accumulating(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), MergePolicy::Append);
        self
    }

    pub fn policy(&self, name: &str) -> Option<MergePolicy> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Sparse field contribution produced by one step invocation. Only
/// names the fields that step writes; read nowhere before merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialUpdate {
    fields: HashMap<String, Value>,
}

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// Immutable point-in-time view of the state. Cheap to clone; a step
/// holds one for the duration of its invocation and never observes
/// merges that land while it runs.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    values: Arc<HashMap<String, Value>>,
}

impl StateSnapshot {
    /// Returns the field value, or `None` when the field has not been
    /// produced yet. Absence is the unset marker; there is no null
    /// sentinel convention.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_array(&self, field: &str) -> Option<&[Value]> {
        self.get(field).and_then(Value::as_array)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The single mutable shared resource of one execution. All mutation
/// goes through `merge`, which is serialized whole-update-at-a-time:
/// no two merges interleave field-by-field, so accumulating fields
/// have a well-defined arrival order.
#[derive(Debug)]
pub struct StateStore {
    schema: StateSchema,
    values: Mutex<HashMap<String, Value>>,
}

impl StateStore {
    /// Creates a store with all fields unset.
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a store seeded with initial field values, e.g. the user
    /// question at the start of a run.
    pub fn seeded(schema: StateSchema, initial: PartialUpdate) -> Result<Self, StateError> {
        let store = Self::new(schema);
        store.merge(&crate::graph::START.to_string(), initial)?;
        Ok(store)
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Takes a consistent read-only copy of the current field values.
    pub fn snapshot(&self) -> StateSnapshot {
        let values = self.values.lock().expect("state store lock poisoned");
        StateSnapshot {
            values: Arc::new(values.clone()),
        }
    }

    /// Applies a partial update field-by-field under the declared
    /// policies. The whole update is applied under one lock; a write to
    /// an undeclared field fails before any field of the update lands.
    pub fn merge(&self, node: &NodeId, update: PartialUpdate) -> Result<(), StateError> {
        for (field, _) in update.iter() {
            if !self.schema.contains(field) {
                return Err(StateError::UnknownField {
                    field: field.clone(),
                    node: node.clone(),
                });
            }
        }

        let mut values = self.values.lock().expect("state store lock poisoned");
        for (field, value) in update.fields {
            match self.schema.policy(&field) {
                Some(MergePolicy::Overwrite) | None => {
                    values.insert(field, value);
                }
                Some(MergePolicy::Append) => {
                    let slot = values
                        .entry(field)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(items) = slot {
                        match value {
                            Value::Array(incoming) => items.extend(incoming),
                            other => items.push(other),
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Consumes the store and returns the final state of the run.
    pub fn into_snapshot(self) -> StateSnapshot {
        let values = self.values.into_inner().expect("state store lock poisoned");
        StateSnapshot {
            values: Arc::new(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeId {
        name.to_string()
    }

    #[test]
    fn overwrite_field_takes_last_write() {
        let store = StateStore::new(StateSchema::new().field("answer"));
        store
            .merge(&node("a"), PartialUpdate::new().set("answer", "first"))
            .unwrap();
        store
            .merge(&node("b"), PartialUpdate::new().set("answer", "second"))
            .unwrap();

        assert_eq!(store.snapshot().get_str("answer"), Some("second"));
    }

    #[test]
    fn accumulating_field_appends_in_arrival_order() {
        let store = StateStore::new(StateSchema::new().accumulating("messages"));
        store
            .merge(&node("a"), PartialUpdate::new().set("messages", "one"))
            .unwrap();
        store
            .merge(&node("b"), PartialUpdate::new().set("messages", "two"))
            .unwrap();

        let snapshot = store.snapshot();
        let items = snapshot.get_array("messages").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_str(), Some("one"));
        assert_eq!(items[1].as_str(), Some("two"));
    }

    #[test]
    fn accumulating_field_extends_from_array_payload() {
        let store = StateStore::new(StateSchema::new().accumulating("messages"));
        store
            .merge(
                &node("a"),
                PartialUpdate::new().set("messages", vec![Value::from("one"), Value::from("two")]),
            )
            .unwrap();
        store
            .merge(&node("b"), PartialUpdate::new().set("messages", "three"))
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get_array("messages").unwrap().len(), 3);
    }

    #[test]
    fn unknown_field_is_rejected_whole_update() {
        let store = StateStore::new(StateSchema::new().field("known"));
        let err = store
            .merge(
                &node("a"),
                PartialUpdate::new().set("known", "v").set("mystery", "v"),
            )
            .unwrap_err();

        assert_eq!(
            err,
            StateError::UnknownField {
                field: "mystery".to_string(),
                node: node("a"),
            }
        );
        // The well-formed field must not have landed either.
        assert!(!store.snapshot().contains("known"));
    }

    #[test]
    fn snapshot_is_isolated_from_later_merges() {
        let store = StateStore::new(StateSchema::new().field("x"));
        let before = store.snapshot();
        store
            .merge(&node("a"), PartialUpdate::new().set("x", "later"))
            .unwrap();

        assert!(!before.contains("x"));
        assert_eq!(store.snapshot().get_str("x"), Some("later"));
    }

    #[test]
    fn unset_field_reads_as_none() {
        let store = StateStore::new(StateSchema::new().field("maybe"));
        assert_eq!(store.snapshot().get("maybe"), None);
    }
}
