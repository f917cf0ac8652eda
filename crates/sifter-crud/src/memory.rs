//! In-memory storage.
//!
//! [`MemoryStore`] keeps records in a `BTreeMap` keyed by a numeric id and
//! evaluates filters and ordering in process. It backs tests, demos and small
//! embedded datasets; hosts with a database implement [`CrudStore`] over
//! their own query layer instead.
//!
//! Records are written through their JSON form: a create deserializes the
//! payload with the assigned id set, and an update overlays the payload on
//! the serialized record before deserializing it back.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sifter_query::{
    describe, sort_by_terms, Describe, FilterSpec, OrderTerm, RecordDescriptor, Seekable,
};

use crate::store::{CrudStore, StoreError, Window};
use crate::validate::{FieldErrors, NON_FIELD_ERRORS};

/// A thread-safe in-memory [`CrudStore`].
///
/// Identifiers are assigned from a counter starting at 1 and written to the
/// record's `id` field (see [`with_id_field`](Self::with_id_field)). Without
/// ordering terms, records come back in id order.
pub struct MemoryStore<R> {
    records: RwLock<BTreeMap<u64, R>>,
    next_id: AtomicU64,
    id_field: String,
    unique: Vec<String>,
}

impl<R> MemoryStore<R>
where
    R: Describe + Seekable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        MemoryStore {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            id_field: "id".to_string(),
            unique: Vec::new(),
        }
    }

    /// Sets the field that carries the identifier. Defaults to `id`.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Declares a field whose values must be distinct across records.
    /// Writes that would duplicate one fail with [`StoreError::Constraint`].
    pub fn unique(mut self, field: impl Into<String>) -> Self {
        self.unique.push(field.into());
        self
    }

    /// Creates a store seeded with `records`, assigning ids in order.
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Result<Self, StoreError> {
        let store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Inserts a record as is, skipping validation and unique checks.
    ///
    /// A positive id that is not taken yet is kept, so records loaded from
    /// a previous snapshot keep their ids. Any other record gets the next id.
    pub fn insert(&self, record: R) -> Result<u64, StoreError> {
        let mut fields = into_object(serde_json::to_value(&record)?)?;
        let mut records = self.write()?;
        let id = match fields.get(&self.id_field).and_then(Value::as_u64) {
            Some(id) if id > 0 && !records.contains_key(&id) => {
                self.next_id.fetch_max(id + 1, Ordering::SeqCst);
                id
            }
            _ => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        fields.insert(self.id_field.clone(), Value::from(id));
        let record: R = serde_json::from_value(Value::Object(fields))?;
        records.insert(id, record);
        Ok(id)
    }

    /// The memoized schema of `R`.
    pub fn schema(&self) -> Arc<RecordDescriptor> {
        describe::<R>()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<u64, R>>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::backend("record lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<u64, R>>, StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("record lock poisoned"))
    }

    /// Deserializes `fields` as a record, reporting shape problems as
    /// validation errors.
    fn materialize(&self, fields: Map<String, Value>) -> Result<R, StoreError> {
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            StoreError::Validation(FieldErrors::new().with(NON_FIELD_ERRORS, e.to_string()))
        })
    }

    fn check_unique(
        &self,
        records: &BTreeMap<u64, R>,
        id: u64,
        fields: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        for field in &self.unique {
            let Some(wanted) = fields.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            for (other_id, other) in records {
                if *other_id == id {
                    continue;
                }
                let existing = serde_json::to_value(other)?;
                if existing.get(field) == Some(wanted) {
                    return Err(StoreError::Constraint(format!(
                        "UNIQUE constraint failed: {}.{}",
                        self.schema().name().to_lowercase(),
                        field
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<R> Default for MemoryStore<R>
where
    R: Describe + Seekable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R> CrudStore for MemoryStore<R>
where
    R: Describe + Seekable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Record = R;
    type Id = u64;

    fn descriptor(&self) -> Arc<RecordDescriptor> {
        self.schema()
    }

    fn count(&self, spec: &FilterSpec) -> Result<usize, StoreError> {
        let records = self.read()?;
        Ok(records.values().filter(|record| spec.matches(*record)).count())
    }

    fn fetch(
        &self,
        spec: &FilterSpec,
        order: &[OrderTerm],
        window: Window,
    ) -> Result<Vec<R>, StoreError> {
        let records = self.read()?;
        let mut matched: Vec<&R> = records
            .values()
            .filter(|record| spec.matches(*record))
            .collect();
        if !order.is_empty() {
            sort_by_terms(&mut matched, order);
        }
        let limit = window.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(window.offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get(&self, id: &u64) -> Result<Option<R>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn create(&self, payload: Value) -> Result<R, StoreError> {
        let mut fields = into_object(payload)?;
        let mut records = self.write()?;
        let id = self.next_id.load(Ordering::SeqCst);
        fields.insert(self.id_field.clone(), Value::from(id));
        self.check_unique(&records, id, &fields)?;
        let record = self.materialize(fields)?;
        self.next_id.fetch_add(1, Ordering::SeqCst);
        records.insert(id, record.clone());
        Ok(record)
    }

    fn update(&self, id: &u64, payload: Value, _partial: bool) -> Result<R, StoreError> {
        let changes = into_object(payload)?;
        let mut records = self.write()?;
        let current = records.get(id).ok_or(StoreError::NotFound)?;
        let mut fields = into_object(serde_json::to_value(current)?)?;
        fields.extend(changes);
        fields.insert(self.id_field.clone(), Value::from(*id));
        self.check_unique(&records, *id, &fields)?;
        let record = self.materialize(fields)?;
        records.insert(*id, record.clone());
        Ok(record)
    }

    fn delete(&self, id: &u64) -> Result<(), StoreError> {
        self.write()?
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Validation(FieldErrors::new().with(
            NON_FIELD_ERRORS,
            format!("Expected an object, got {}.", json_type(&other)),
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
