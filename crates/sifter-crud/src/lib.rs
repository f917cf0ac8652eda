//! CRUD orchestration for collection endpoints.
//!
//! `sifter-crud` sequences the list, retrieve, create, update and delete
//! operations of a REST-style resource over two injected collaborators: a
//! [`CrudStore`] that owns persistence and a [`Validator`] that owns payload
//! checks. Filtering, ordering and pagination come from `sifter-query`.
//!
//! # Features
//!
//! - **Never-match filters**: an unknown field or malformed value empties the
//!   list without a storage round trip
//! - **Page envelopes**: `count`, `next`, `previous`, `results`
//! - **Pre-filter hook**: narrow every list to a base set (owner, tenant, ...)
//! - **Error mapping**: storage outcomes become 400, 404 and 500 responses
//! - **YAML configuration**: parameter names, page sizes, default ordering
//!
//! # Collaborators
//!
//! The orchestrator never builds native queries. A store receives a
//! [`FilterSpec`](sifter_query::FilterSpec) and
//! [`OrderTerm`](sifter_query::OrderTerm)s and translates them itself.
//! [`MemoryStore`] does so in process for any record type that implements
//! [`Describe`](sifter_query::Describe) and [`Seekable`](sifter_query::Seekable).
//!
//! Validators return either the payload to store or [`FieldErrors`], which
//! reach the caller verbatim as a 400 body. [`DescriptorValidator`] covers the
//! common case of type-checking against the record schema.
//!
//! # Logging
//!
//! Operations emit `tracing` events: `info` for created, updated and deleted
//! records, `warn` for missing records and rejected payloads, `error` for
//! storage failures. Install a subscriber in the host to see them.

mod config;
mod crud;
mod memory;
mod response;
mod store;
mod validate;

pub use config::{ConfigError, CrudConfig};
pub use crud::Crud;
pub use memory::MemoryStore;
pub use response::{CrudResponse, PageBody, Status};
pub use store::{BoxError, CrudStore, StoreError, Window};
pub use validate::{AcceptAll, DescriptorValidator, FieldErrors, Validator, NON_FIELD_ERRORS};
