//! Integration tests for the CRUD orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use sifter_crud::{
    AcceptAll, Crud, CrudConfig, CrudStore, DescriptorValidator, FieldErrors, MemoryStore,
    Status, StoreError, Window,
};
use sifter_query::{
    describe, Describe, FilterPredicate, FilterSpec, Number, OrderTerm, QueryParams,
    RecordDescriptor, RelationTarget, Seekable, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const BASE: &str = "http://api/items/";

// ============================================================================
// Test fixtures
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Category {
    id: u64,
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Item {
    #[serde(default)]
    id: u64,
    name: String,
    #[serde(default)]
    age: i64,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    category: Option<Category>,
}

impl Describe for Category {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Category")
            .integer("id")
            .text("name")
            .build()
    }
}

impl Describe for Item {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Item")
            .integer("id")
            .text("name")
            .integer("age")
            .boolean("active")
            .relation("category", RelationTarget::of::<Category>())
            .build()
    }
}

impl Seekable for Category {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        match field {
            "id" => Value::Number(Number::U64(self.id)),
            "name" => Value::String(&self.name),
            _ => Value::None,
        }
    }
}

impl Seekable for Item {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        match field {
            "id" => Value::Number(Number::U64(self.id)),
            "name" => Value::String(&self.name),
            "age" => Value::Number(Number::I64(self.age)),
            "active" => Value::Bool(self.active),
            _ => Value::None,
        }
    }

    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        match field {
            "category" => self
                .category
                .iter()
                .map(|c| c as &dyn Seekable)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn item(name: &str, age: i64, active: bool, category: Option<(u64, &str)>) -> Item {
    Item {
        id: 0,
        name: name.to_string(),
        age,
        active,
        category: category.map(|(id, name)| Category {
            id,
            name: name.to_string(),
        }),
    }
}

fn validator() -> DescriptorValidator {
    DescriptorValidator::new(describe::<Item>())
        .required("name")
        .read_only("id")
        .nullable("category")
}

/// Wraps a store and counts every `count` and `fetch` call.
struct Counting<S> {
    inner: S,
    queries: AtomicUsize,
}

impl<S> Counting<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
        }
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl<S: CrudStore> CrudStore for Counting<S> {
    type Record = S::Record;
    type Id = S::Id;

    fn descriptor(&self) -> Arc<RecordDescriptor> {
        self.inner.descriptor()
    }

    fn count(&self, spec: &FilterSpec) -> Result<usize, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.count(spec)
    }

    fn fetch(
        &self,
        spec: &FilterSpec,
        order: &[OrderTerm],
        window: Window,
    ) -> Result<Vec<S::Record>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(spec, order, window)
    }

    fn get(&self, id: &S::Id) -> Result<Option<S::Record>, StoreError> {
        self.inner.get(id)
    }

    fn create(&self, payload: serde_json::Value) -> Result<S::Record, StoreError> {
        self.inner.create(payload)
    }

    fn update(
        &self,
        id: &S::Id,
        payload: serde_json::Value,
        partial: bool,
    ) -> Result<S::Record, StoreError> {
        self.inner.update(id, payload, partial)
    }

    fn delete(&self, id: &S::Id) -> Result<(), StoreError> {
        self.inner.delete(id)
    }
}

/// A store whose backend is down.
struct Broken;

impl CrudStore for Broken {
    type Record = serde_json::Value;
    type Id = u64;

    fn descriptor(&self) -> Arc<RecordDescriptor> {
        Arc::new(RecordDescriptor::builder("Item").integer("id").text("name").build())
    }

    fn count(&self, _spec: &FilterSpec) -> Result<usize, StoreError> {
        Err(StoreError::backend("connection refused"))
    }

    fn fetch(
        &self,
        _spec: &FilterSpec,
        _order: &[OrderTerm],
        _window: Window,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        Err(StoreError::backend("connection refused"))
    }

    fn get(&self, id: &u64) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(Some(json!({"id": id, "name": "ghost"})))
    }

    fn create(&self, _payload: serde_json::Value) -> Result<serde_json::Value, StoreError> {
        Err(StoreError::backend("read-only replica"))
    }

    fn update(
        &self,
        _id: &u64,
        _payload: serde_json::Value,
        _partial: bool,
    ) -> Result<serde_json::Value, StoreError> {
        Err(StoreError::Constraint(
            "FOREIGN KEY constraint failed".to_string(),
        ))
    }

    fn delete(&self, _id: &u64) -> Result<(), StoreError> {
        Err(StoreError::backend("disk full"))
    }
}

fn catalog() -> Crud<Counting<MemoryStore<Item>>> {
    let store = MemoryStore::with_records(vec![
        item("test", 20, true, Some((1, "Tools"))),
        item("testing", 25, false, Some((2, "Garden"))),
        item("other", 30, true, None),
    ])
    .unwrap();
    Crud::new(Counting::new(store), validator())
}

fn numbered(count: usize) -> Crud<Counting<MemoryStore<Item>>> {
    let store = MemoryStore::with_records(
        (1..=count).map(|n| item(&format!("item-{n:02}"), n as i64, n % 2 == 0, None)),
    )
    .unwrap();
    Crud::new(Counting::new(store), validator())
}

fn list(crud: &Crud<Counting<MemoryStore<Item>>>, query: &str) -> serde_json::Value {
    let response = crud.list(BASE, &QueryParams::parse(query));
    assert_eq!(response.status, Status::Ok);
    response.body.unwrap()
}

fn names(body: &serde_json::Value) -> Vec<String> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// List: filtering
// ============================================================================

#[test]
fn test_prefix_and_range_filters() {
    let crud = catalog();
    let body = list(&crud, "name=test*&age=18-20");
    assert_eq!(body["count"], 1);
    assert_eq!(names(&body), vec!["test"]);
}

#[test]
fn test_prefix_filter() {
    let crud = catalog();
    let body = list(&crud, "name=test*");
    assert_eq!(body["count"], 2);
    assert_eq!(names(&body), vec!["test", "testing"]);
}

#[test]
fn test_unknown_field_returns_empty_without_storage() {
    let crud = catalog();
    let body = list(&crud, "nonexistent=foo");
    assert_eq!(
        body,
        json!({"count": 0, "next": null, "previous": null, "results": []})
    );
    assert_eq!(crud.store().queries(), 0);
}

#[test]
fn test_malformed_value_returns_empty_without_storage() {
    let crud = catalog();
    assert_eq!(list(&crud, "age=abc")["count"], 0);
    assert_eq!(list(&crud, "age=>=")["count"], 0);
    assert_eq!(list(&crud, "name=test*&age=1-2-3")["count"], 0);
    assert_eq!(crud.store().queries(), 0);
}

#[test]
fn test_reserved_params_are_not_filters() {
    let crud = catalog();
    let body = list(&crud, "format=json&ordering=name&page=1");
    assert_eq!(body["count"], 3);
}

#[test]
fn test_empty_values_are_ignored() {
    let crud = catalog();
    assert_eq!(list(&crud, "name=&age=")["count"], 3);
}

#[test]
fn test_relation_filters() {
    let crud = catalog();
    assert_eq!(names(&list(&crud, "category__name=tools")), vec!["test"]);
    assert_eq!(names(&list(&crud, "category__name=*e*")), vec!["testing"]);
    assert_eq!(list(&crud, "category__bogus=1")["count"], 0);
    assert_eq!(list(&crud, "category=1")["count"], 0);
}

#[test]
fn test_boolean_filter() {
    let crud = catalog();
    assert_eq!(names(&list(&crud, "active=true")), vec!["test", "other"]);
    assert_eq!(list(&crud, "active=maybe")["count"], 0);
}

// ============================================================================
// List: ordering
// ============================================================================

#[test]
fn test_ordering_directive() {
    let crud = catalog();
    assert_eq!(
        names(&list(&crud, "ordering=-age")),
        vec!["other", "testing", "test"]
    );
    assert_eq!(
        names(&list(&crud, "ordering=name")),
        vec!["other", "test", "testing"]
    );
}

#[test]
fn test_unknown_ordering_terms_are_dropped() {
    let crud = catalog();
    assert_eq!(
        names(&list(&crud, "ordering=bogus,-age")),
        vec!["other", "testing", "test"]
    );
    // Nothing usable: storage order.
    assert_eq!(
        names(&list(&crud, "ordering=bogus")),
        vec!["test", "testing", "other"]
    );
}

#[test]
fn test_default_ordering_from_config() {
    let crud = catalog().with_config(CrudConfig::default().with_default_ordering("-age"));
    assert_eq!(names(&list(&crud, "")), vec!["other", "testing", "test"]);
    // The request's own directive wins.
    assert_eq!(
        names(&list(&crud, "ordering=age")),
        vec!["test", "testing", "other"]
    );
}

#[test]
fn test_relation_ordering_sorts_by_related_key() {
    let crud = catalog();
    assert_eq!(
        names(&list(&crud, "ordering=category")),
        vec!["test", "testing", "other"]
    );

    // An accepted relation term replaces the configured default.
    let crud = crud.with_config(CrudConfig::default().with_default_ordering("-age"));
    assert_eq!(
        names(&list(&crud, "ordering=-category")),
        vec!["testing", "test", "other"]
    );
    assert_eq!(
        names(&list(&crud, "ordering=bogus")),
        vec!["other", "testing", "test"]
    );
}

// ============================================================================
// List: pagination
// ============================================================================

#[test]
fn test_first_page() {
    let crud = numbered(25);
    let body = list(&crud, "");
    assert_eq!(body["count"], 25);
    assert_eq!(body["results"].as_array().unwrap().len(), 20);
    assert_eq!(body["next"], "http://api/items/?page=2");
    assert_eq!(body["previous"], serde_json::Value::Null);
}

#[test]
fn test_last_page() {
    let crud = numbered(25);
    let body = list(&crud, "page=2");
    assert_eq!(body["count"], 25);
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
    assert_eq!(body["next"], serde_json::Value::Null);
    assert_eq!(body["previous"], "http://api/items/");
}

#[test]
fn test_page_size_and_filters_carry_into_links() {
    let crud = numbered(25);
    let body = list(&crud, "active=true&page=2&page_size=3");
    assert_eq!(body["count"], 12);
    assert_eq!(names(&body), vec!["item-08", "item-10", "item-12"]);
    assert_eq!(
        body["next"],
        "http://api/items/?active=true&page=3&page_size=3"
    );
    assert_eq!(body["previous"], "http://api/items/?active=true&page_size=3");
}

#[test]
fn test_invalid_page_params_fall_back() {
    let crud = numbered(25);
    let body = list(&crud, "page=abc&page_size=500");
    assert_eq!(body["results"].as_array().unwrap().len(), 20);
    assert_eq!(names(&body)[0], "item-01");
}

#[test]
fn test_page_past_the_end_skips_fetch() {
    let crud = numbered(25);
    let body = list(&crud, "page=9");
    assert_eq!(body["count"], 25);
    assert!(body["results"].as_array().unwrap().is_empty());
    assert_eq!(body["next"], serde_json::Value::Null);
    assert_eq!(body["previous"], "http://api/items/?page=8");
    assert_eq!(crud.store().queries(), 1);
}

#[test]
fn test_custom_page_params() {
    let config = CrudConfig::from_yaml_str(
        r#"
page_param: p
page_size_param: n
default_page_size: 10
"#,
    )
    .unwrap();
    let crud = numbered(25).with_config(config);
    let body = list(&crud, "p=3");
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
    assert_eq!(body["previous"], "http://api/items/?p=2");
    assert_eq!(list(&crud, "n=4")["results"].as_array().unwrap().len(), 4);
}

#[test]
fn test_pagination_disabled_returns_plain_array() {
    let crud = numbered(25).with_config(CrudConfig::default().without_pagination());
    let response = crud.list(BASE, &QueryParams::parse("active=false"));
    let body = response.body.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 13);

    let empty = crud.list(BASE, &QueryParams::parse("bogus=1"));
    assert_eq!(empty.body, Some(json!([])));
}

// ============================================================================
// List: pre-filter hook
// ============================================================================

#[test]
fn test_pre_filter_intersects_with_request() {
    let crud = catalog().with_pre_filter(|| {
        FilterSpec::new().with(FilterPredicate::parse(&describe::<Item>(), "active", "true"))
    });
    assert_eq!(names(&list(&crud, "")), vec!["test", "other"]);
    assert_eq!(names(&list(&crud, "name=*t*")), vec!["test", "other"]);
    assert_eq!(list(&crud, "name=testing")["count"], 0);
}

#[test]
fn test_pre_filter_does_not_apply_to_retrieve() {
    let crud = catalog().with_pre_filter(|| {
        FilterSpec::new().with(FilterPredicate::parse(&describe::<Item>(), "active", "true"))
    });
    // "testing" is inactive but still reachable by id.
    assert_eq!(crud.retrieve("2").code(), 200);
}

// ============================================================================
// Retrieve
// ============================================================================

#[test]
fn test_retrieve() {
    let crud = catalog();
    let response = crud.retrieve("1");
    assert_eq!(response.code(), 200);
    let body = response.body.unwrap();
    assert_eq!(body["name"], "test");
    assert_eq!(body["category"]["name"], "Tools");
}

#[test]
fn test_retrieve_missing_is_404() {
    let crud = catalog();
    for raw in ["99", "abc", "", "  "] {
        let response = crud.retrieve(raw);
        assert_eq!(response.code(), 404, "id {raw:?}");
        assert_eq!(response.body, Some(json!({"detail": "Not found."})));
    }
}

#[test]
fn test_get_dispatches_on_id() {
    let crud = catalog();
    let single = crud.get(Some("3"), BASE, &QueryParams::new());
    assert_eq!(single.body.unwrap()["name"], "other");

    let many = crud.get(None, BASE, &QueryParams::parse("name=other"));
    assert_eq!(many.body.unwrap()["count"], 1);

    let blank = crud.get(Some(""), BASE, &QueryParams::new());
    assert_eq!(blank.body.unwrap()["count"], 3);
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn test_create() {
    let crud = catalog();
    let response = crud.create(json!({"id": 77, "name": "new", "age": "41", "extra": 1}));
    assert_eq!(response.status, Status::Created);
    let body = response.body.unwrap();
    assert_eq!(body["id"], 4);
    assert_eq!(body["age"], 41);
    assert_eq!(crud.retrieve("4").code(), 200);
}

#[test]
fn test_create_with_nested_relation() {
    let crud = catalog();
    let response = crud.create(json!({"name": "rake", "category": {"id": 2, "name": "Garden"}}));
    assert_eq!(response.code(), 201);
    assert_eq!(names(&list(&crud, "category__name=garden")), vec!["testing", "rake"]);
}

#[test]
fn test_create_validation_errors_are_verbatim() {
    let crud = catalog();
    let response = crud.create(json!({"age": "old"}));
    assert_eq!(response.code(), 400);
    assert_eq!(
        response.body,
        Some(json!({
            "name": ["This field is required."],
            "age": ["A valid integer is required."]
        }))
    );
    assert_eq!(list(&crud, "")["count"], 3);
}

#[test]
fn test_create_rejects_non_objects() {
    let crud = catalog();
    let response = crud.create(json!(["name"]));
    assert_eq!(response.code(), 400);
    assert_eq!(
        response.body.unwrap()["non_field_errors"][0],
        "Invalid data. Expected a dictionary, but got list."
    );
}

#[test]
fn test_create_with_extra_fields() {
    let crud = catalog();
    let mut extra = Map::new();
    extra.insert("active".to_string(), json!(true));
    let response = crud.create_with(json!({"name": "owned", "active": false}), extra);
    assert_eq!(response.code(), 201);
    assert_eq!(response.body.unwrap()["active"], true);
}

#[test]
fn test_custom_validator_closure() {
    let store = MemoryStore::<Item>::new();
    let crud = Crud::new(store, |payload: &serde_json::Value, _partial: bool| {
        match payload.get("name").and_then(|n| n.as_str()) {
            Some(name) if name.len() <= 5 => Ok(payload.clone()),
            _ => Err(FieldErrors::new().with("name", "Ensure this field has no more than 5 characters.")),
        }
    });
    assert_eq!(crud.create(json!({"name": "short"})).code(), 201);
    assert_eq!(crud.create(json!({"name": "much too long"})).code(), 400);
}

#[test]
fn test_constraint_violation_is_400() {
    let store = MemoryStore::<Item>::new().unique("name");
    let crud = Crud::new(store, AcceptAll);
    assert_eq!(crud.create(json!({"name": "dup"})).code(), 201);
    let response = crud.create(json!({"name": "dup"}));
    assert_eq!(response.code(), 400);
    assert_eq!(
        response.body,
        Some(json!({
            "error": "Database constraint violation",
            "detail": "UNIQUE constraint failed: item.name"
        }))
    );
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn test_full_update() {
    let crud = catalog();
    let response = crud.update("1", json!({"name": "renamed", "age": 21}));
    assert_eq!(response.code(), 200);
    let body = response.body.unwrap();
    assert_eq!(body["name"], "renamed");
    assert_eq!(body["id"], 1);
}

#[test]
fn test_full_update_requires_required_fields() {
    let crud = catalog();
    let response = crud.update("1", json!({"age": 21}));
    assert_eq!(response.code(), 400);
    assert_eq!(response.body, Some(json!({"name": ["This field is required."]})));
}

#[test]
fn test_partial_update() {
    let crud = catalog();
    let response = crud.partial_update("2", json!({"age": 26}));
    assert_eq!(response.code(), 200);
    let body = response.body.unwrap();
    assert_eq!(body["age"], 26);
    assert_eq!(body["name"], "testing");
}

#[test]
fn test_partial_update_can_clear_nullable_relation() {
    let crud = catalog();
    let response = crud.partial_update("1", json!({"category": null}));
    assert_eq!(response.code(), 200);
    assert_eq!(response.body.unwrap()["category"], serde_json::Value::Null);
    assert_eq!(list(&crud, "category__name=tools")["count"], 0);
}

#[test]
fn test_update_missing_is_404_before_validation() {
    let crud = catalog();
    let response = crud.update("99", json!({"age": "not a number"}));
    assert_eq!(response.code(), 404);
    assert_eq!(crud.partial_update("abc", json!({})).code(), 404);
}

#[test]
fn test_update_with_extra_fields() {
    let crud = catalog();
    let mut extra = Map::new();
    extra.insert("age".to_string(), json!(99));
    let response = crud.update_with("3", json!({"age": 1}), extra, true);
    assert_eq!(response.body.unwrap()["age"], 99);
}

// ============================================================================
// Destroy
// ============================================================================

#[test]
fn test_destroy() {
    let crud = catalog();
    let response = crud.destroy("2");
    assert_eq!(response.status, Status::NoContent);
    assert!(response.body.is_none());
    assert_eq!(crud.retrieve("2").code(), 404);
    assert_eq!(crud.destroy("2").code(), 404);
}

#[test]
fn test_destroy_missing_pk_is_404() {
    let crud = catalog();
    assert_eq!(crud.destroy("").code(), 404);
    assert_eq!(list(&crud, "")["count"], 3);
}

// ============================================================================
// Storage failures
// ============================================================================

#[test]
fn test_backend_failure_on_list_is_500() {
    let crud = Crud::new(Broken, AcceptAll);
    let response = crud.list(BASE, &QueryParams::new());
    assert_eq!(response.code(), 500);
    assert_eq!(
        response.body,
        Some(json!({"error": "Internal server error", "detail": "connection refused"}))
    );
}

#[test]
fn test_unsatisfiable_list_never_reaches_broken_backend() {
    let crud = Crud::new(Broken, AcceptAll);
    let response = crud.list(BASE, &QueryParams::parse("missing=1"));
    assert_eq!(response.code(), 200);
    assert_eq!(response.body.unwrap()["count"], 0);
}

#[test]
fn test_backend_failure_on_destroy() {
    let crud = Crud::new(Broken, AcceptAll);
    let response = crud.destroy("1");
    assert_eq!(response.code(), 500);
    assert_eq!(
        response.body,
        Some(json!({"error": "Failed to delete instance", "detail": "disk full"}))
    );
}

#[test]
fn test_backend_failure_on_create() {
    let crud = Crud::new(Broken, AcceptAll);
    let response = crud.create(json!({"name": "x"}));
    assert_eq!(response.code(), 500);
    assert_eq!(response.body.unwrap()["detail"], "read-only replica");
}

#[test]
fn test_constraint_failure_on_update() {
    let crud = Crud::new(Broken, AcceptAll);
    let response = crud.partial_update("1", json!({"name": "x"}));
    assert_eq!(response.code(), 400);
    assert_eq!(
        response.body.unwrap()["error"],
        "Database constraint violation"
    );
}

// ============================================================================
// Full CRUD workflow test
// ============================================================================

#[test]
fn test_crud_workflow() {
    let crud = Crud::new(MemoryStore::<Item>::new(), validator());

    let created = crud.create(json!({"name": "workflow", "age": 1}));
    assert_eq!(created.code(), 201);
    let id = created.body.unwrap()["id"].to_string();

    let listed = crud.list(BASE, &QueryParams::parse("name=work*"));
    assert_eq!(listed.body.unwrap()["count"], 1);

    assert_eq!(crud.partial_update(&id, json!({"age": 2})).code(), 200);
    assert_eq!(crud.retrieve(&id).body.unwrap()["age"], 2);

    assert_eq!(crud.destroy(&id).code(), 204);
    assert_eq!(crud.list(BASE, &QueryParams::new()).body.unwrap()["count"], 0);
}
