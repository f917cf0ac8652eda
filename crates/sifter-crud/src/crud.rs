//! The CRUD orchestrator.
//!
//! [`Crud`] sequences filter building, ordering and pagination around a
//! [`CrudStore`], validates write payloads through a [`Validator`], and maps
//! every outcome onto a [`CrudResponse`]:
//!
//! | Operation | Success | Failures |
//! |-----------|---------|----------|
//! | `list` | 200 page body | 500 |
//! | `retrieve` | 200 record | 404, 500 |
//! | `create` | 201 record | 400, 500 |
//! | `update` / `partial_update` | 200 record | 400, 404, 500 |
//! | `destroy` | 204 | 404, 500 |
//!
//! Storage errors are the only failures that reach the caller; filter and
//! ordering problems never do. An unsatisfiable filter short-circuits the
//! list without touching storage.

use serde_json::{Map, Value};
use sifter_query::{resolve_ordering, FilterSpec, OrderTerm, PageDescriptor, QueryParams};

use crate::config::CrudConfig;
use crate::response::{CrudResponse, PageBody};
use crate::store::{CrudStore, StoreError, Window};
use crate::validate::Validator;

type PreFilter = Box<dyn Fn() -> FilterSpec + Send + Sync>;

/// Operation names used in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Retrieve => "retrieve",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::PartialUpdate => "partial_update",
            Operation::Destroy => "destroy",
        }
    }
}

/// CRUD orchestrator over one record type.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use sifter_crud::{Crud, CrudConfig, DescriptorValidator, MemoryStore};
/// # use serde::{Deserialize, Serialize};
/// # use sifter_query::{Describe, Number, QueryParams, RecordDescriptor, Seekable, Value};
/// # #[derive(Clone, Serialize, Deserialize)]
/// # struct Item { #[serde(default)] id: u64, name: String, age: i64 }
/// # impl Describe for Item {
/// #     fn describe() -> RecordDescriptor {
/// #         RecordDescriptor::builder("Item").integer("id").text("name").integer("age").build()
/// #     }
/// # }
/// # impl Seekable for Item {
/// #     fn seeker_field_value(&self, field: &str) -> Value<'_> {
/// #         match field {
/// #             "id" => Value::Number(Number::U64(self.id)),
/// #             "name" => Value::String(&self.name),
/// #             "age" => Value::Number(Number::I64(self.age)),
/// #             _ => Value::None,
/// #         }
/// #     }
/// # }
///
/// let store = MemoryStore::<Item>::new();
/// let validator = DescriptorValidator::new(store.schema()).required("name").read_only("id");
/// let crud = Crud::new(store, validator).with_config(CrudConfig::default());
///
/// assert_eq!(crud.create(json!({"name": "test", "age": 20})).code(), 201);
/// assert_eq!(crud.create(json!({"name": "other", "age": 30})).code(), 201);
///
/// let page = crud.list("http://api/items/", &QueryParams::parse("name=test*"));
/// assert_eq!(page.body.unwrap()["count"], 1);
///
/// assert_eq!(crud.retrieve("99").code(), 404);
/// ```
pub struct Crud<S: CrudStore> {
    store: S,
    validator: Box<dyn Validator>,
    config: CrudConfig,
    pre_filter: Option<PreFilter>,
}

impl<S: CrudStore> Crud<S> {
    /// Creates an orchestrator with the default configuration.
    pub fn new(store: S, validator: impl Validator + 'static) -> Self {
        Crud {
            store,
            validator: Box::new(validator),
            config: CrudConfig::default(),
            pre_filter: None,
        }
    }

    pub fn with_config(mut self, config: CrudConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets a hook that narrows the base set for lists. Its specification is
    /// ANDed with the request's filters.
    pub fn with_pre_filter<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> FilterSpec + Send + Sync + 'static,
    {
        self.pre_filter = Some(Box::new(hook));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CrudConfig {
        &self.config
    }

    fn record_name(&self) -> String {
        self.store.descriptor().name().to_string()
    }

    /// The filter specification a list request would use: the pre-filter
    /// hook's specification ANDed with the request's parameters.
    pub fn filter_spec(&self, params: &QueryParams) -> FilterSpec {
        let descriptor = self.store.descriptor();
        let reserved = self.config.reserved_keys();
        let requested = FilterSpec::build(&descriptor, params, reserved.as_slice());
        match &self.pre_filter {
            Some(hook) => hook().and(requested),
            None => requested,
        }
    }

    /// The ordering a list request would use: the request's directive, or the
    /// configured default when that yields no terms.
    pub fn ordering(&self, params: &QueryParams) -> Vec<OrderTerm> {
        let descriptor = self.store.descriptor();
        let requested = params
            .get(&self.config.ordering_param)
            .map(|directive| resolve_ordering(&descriptor, directive))
            .unwrap_or_default();
        if !requested.is_empty() {
            return requested;
        }
        self.config
            .default_ordering
            .as_deref()
            .map(|directive| resolve_ordering(&descriptor, directive))
            .unwrap_or_default()
    }

    // ========================================================================
    // Read operations
    // ========================================================================

    /// Retrieves a single record when `id` is given, otherwise lists.
    pub fn get(&self, id: Option<&str>, base_url: &str, params: &QueryParams) -> CrudResponse {
        match id.filter(|id| !id.trim().is_empty()) {
            Some(id) => self.retrieve(id),
            None => self.list(base_url, params),
        }
    }

    /// Lists records matching the request's filters.
    ///
    /// Returns a page body (`count`, `next`, `previous`, `results`) built
    /// against `base_url`, or a plain array when pagination is disabled.
    pub fn list(&self, base_url: &str, params: &QueryParams) -> CrudResponse {
        self.try_list(base_url, params)
            .unwrap_or_else(|err| self.failure(Operation::List, None, err))
    }

    fn try_list(&self, base_url: &str, params: &QueryParams) -> Result<CrudResponse, StoreError> {
        let spec = self.filter_spec(params);
        let order = self.ordering(params);
        let satisfiable = spec.is_satisfiable();
        if !satisfiable {
            tracing::debug!(
                record = %self.record_name(),
                rejected = spec.rejections().count(),
                "filter matches nothing; skipping storage"
            );
        }

        if !self.config.paginate {
            let records = if satisfiable {
                self.store.fetch(&spec, &order, Window::all())?
            } else {
                Vec::new()
            };
            return Ok(CrudResponse::ok(serde_json::to_value(records)?));
        }

        let page = PageDescriptor::from_params(params, &self.config.page_settings());
        let total = if satisfiable { self.store.count(&spec)? } else { 0 };
        let records = if total > page.offset() {
            self.store
                .fetch(&spec, &order, Window::new(page.offset(), page.limit()))?
        } else {
            Vec::new()
        };

        let result = page.paginate(total, base_url, params, &self.config.page_param);
        let body = PageBody {
            count: result.count,
            next: result.next,
            previous: result.previous,
            results: records,
        };
        Ok(CrudResponse::ok(serde_json::to_value(body)?))
    }

    /// Retrieves one record by identifier.
    pub fn retrieve(&self, raw_id: &str) -> CrudResponse {
        let op = Operation::Retrieve;
        let Some(id) = self.parse_id(op, raw_id) else {
            return CrudResponse::not_found();
        };
        self.store
            .resolve(&id)
            .and_then(|record| Ok(serde_json::to_value(record)?))
            .map(CrudResponse::ok)
            .unwrap_or_else(|err| self.failure(op, Some(raw_id), err))
    }

    // ========================================================================
    // Write operations
    // ========================================================================

    /// Creates a record from `payload`.
    pub fn create(&self, payload: Value) -> CrudResponse {
        self.create_with(payload, Map::new())
    }

    /// Creates a record, adding `extra` fields after validation (for values
    /// the host supplies rather than the client, such as an owner).
    pub fn create_with(&self, payload: Value, extra: Map<String, Value>) -> CrudResponse {
        let op = Operation::Create;
        let outcome = self
            .validated(&payload, false, extra)
            .and_then(|clean| self.store.create(clean))
            .and_then(|record| Ok(serde_json::to_value(record)?));
        match outcome {
            Ok(body) => {
                let id = body.get("id").cloned().unwrap_or(Value::Null);
                tracing::info!(record = %self.record_name(), id = %id, "created");
                CrudResponse::created(body)
            }
            Err(err) => self.failure(op, None, err),
        }
    }

    /// Replaces a record's writable fields (PUT).
    pub fn update(&self, raw_id: &str, payload: Value) -> CrudResponse {
        self.update_with(raw_id, payload, Map::new(), false)
    }

    /// Changes only the fields given (PATCH).
    pub fn partial_update(&self, raw_id: &str, payload: Value) -> CrudResponse {
        self.update_with(raw_id, payload, Map::new(), true)
    }

    /// Updates a record, adding `extra` fields after validation.
    pub fn update_with(
        &self,
        raw_id: &str,
        payload: Value,
        extra: Map<String, Value>,
        partial: bool,
    ) -> CrudResponse {
        let op = if partial {
            Operation::PartialUpdate
        } else {
            Operation::Update
        };
        let Some(id) = self.parse_id(op, raw_id) else {
            return CrudResponse::not_found();
        };
        let outcome = self
            .store
            .resolve(&id)
            .and_then(|_| self.validated(&payload, partial, extra))
            .and_then(|clean| self.store.update(&id, clean, partial))
            .and_then(|record| Ok(serde_json::to_value(record)?));
        match outcome {
            Ok(body) => {
                tracing::info!(
                    record = %self.record_name(),
                    pk = raw_id,
                    partial,
                    "updated"
                );
                CrudResponse::ok(body)
            }
            Err(err) => self.failure(op, Some(raw_id), err),
        }
    }

    /// Deletes a record.
    pub fn destroy(&self, raw_id: &str) -> CrudResponse {
        let op = Operation::Destroy;
        let Some(id) = self.parse_id(op, raw_id) else {
            return CrudResponse::not_found();
        };
        match self.store.resolve(&id).and_then(|_| self.store.delete(&id)) {
            Ok(()) => {
                tracing::info!(record = %self.record_name(), pk = raw_id, "deleted");
                CrudResponse::no_content()
            }
            Err(err) => self.failure(op, Some(raw_id), err),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn parse_id(&self, op: Operation, raw_id: &str) -> Option<S::Id> {
        if raw_id.trim().is_empty() {
            tracing::warn!(
                record = %self.record_name(),
                op = op.as_str(),
                "request missing pk"
            );
            return None;
        }
        let id = self.store.parse_id(raw_id);
        if id.is_none() {
            tracing::warn!(
                record = %self.record_name(),
                op = op.as_str(),
                pk = raw_id,
                "not found"
            );
        }
        id
    }

    fn validated(
        &self,
        payload: &Value,
        partial: bool,
        extra: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let mut clean = self.validator.validate(payload, partial)?;
        if let Value::Object(fields) = &mut clean {
            fields.extend(extra);
        }
        Ok(clean)
    }

    fn failure(&self, op: Operation, pk: Option<&str>, err: StoreError) -> CrudResponse {
        let record = self.record_name();
        let pk = pk.unwrap_or_default();
        match err {
            StoreError::NotFound => {
                tracing::warn!(record = %record, op = op.as_str(), pk, "not found");
                CrudResponse::not_found()
            }
            StoreError::Validation(errors) => {
                tracing::warn!(
                    record = %record,
                    op = op.as_str(),
                    pk,
                    errors = %errors,
                    "validation failed"
                );
                CrudResponse::validation(&errors)
            }
            StoreError::Constraint(detail) => {
                tracing::error!(
                    record = %record,
                    op = op.as_str(),
                    pk,
                    detail = %detail,
                    "database constraint violation"
                );
                CrudResponse::constraint(detail)
            }
            StoreError::Backend(source) => {
                tracing::error!(
                    record = %record,
                    op = op.as_str(),
                    pk,
                    error = %source,
                    "storage failure"
                );
                let error = match op {
                    Operation::Destroy => "Failed to delete instance",
                    _ => "Internal server error",
                };
                CrudResponse::internal(error, source.to_string())
            }
        }
    }
}
