//! Sifter - schema-aware query translation for collection endpoints.
//!
//! Sifter turns the flat query parameters of a collection request into
//! structured, typed filter predicates checked against a record schema. It
//! supports:
//!
//! - Wildcard text matching: prefix, suffix, contains and interior `*`
//! - Numeric comparisons (`>=`, `<=`, `>`, `<`) and inclusive ranges
//! - Relation traversal through `__`-separated field paths, cycles included
//! - Ordering directives with `-` for descending order
//! - Page number and size handling with next/previous links
//!
//! Parsing never fails. A parameter that names an unknown field or carries a
//! malformed value becomes a predicate that matches nothing, so a bad filter
//! yields an empty result rather than an error or the whole collection.
//!
//! # Quick Start
//!
//! ```rust
//! use sifter_query::{
//!     FilterSpec, Number, QueryParams, RecordDescriptor, Seekable, Value, DEFAULT_RESERVED,
//! };
//!
//! struct Item {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl Seekable for Item {
//!     fn seeker_field_value(&self, field: &str) -> Value<'_> {
//!         match field {
//!             "name" => Value::String(&self.name),
//!             "age" => Value::Number(Number::I64(self.age)),
//!             _ => Value::None,
//!         }
//!     }
//! }
//!
//! let schema = RecordDescriptor::builder("Item").text("name").integer("age").build();
//! let items = vec![
//!     Item { name: "test".into(), age: 20 },
//!     Item { name: "testing".into(), age: 25 },
//!     Item { name: "other".into(), age: 30 },
//! ];
//!
//! let params = QueryParams::parse("name=test*&age=18-20");
//! let spec = FilterSpec::build(&schema, &params, &DEFAULT_RESERVED);
//!
//! let found = spec.filter(&items);
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].name, "test");
//!
//! let nothing = FilterSpec::build(&schema, &QueryParams::parse("nonexistent=foo"), &DEFAULT_RESERVED);
//! assert!(nothing.filter(&items).is_empty());
//! ```
//!
//! # Value Syntax
//!
//! | Field kind | Value | Meaning |
//! |------------|-------|---------|
//! | Text, DateTime | `abc` | equals, ignoring case |
//! | | `abc*` / `*abc` / `*abc*` | starts with / ends with / contains |
//! | | `a*c` | starts with `a` and ends with `c` |
//! | Integer, Float, Decimal | `5`, `>=5`, `<=5`, `>5`, `<5` | comparison |
//! | | `1-10` | inclusive range |
//! | Boolean | `true`, `false`, `1`, `0`, `yes`, `no` | equals |
//!
//! # Storage
//!
//! A [`FilterSpec`] and a list of [`OrderTerm`]s are plain data (and
//! serializable): storage layers translate them into their own query
//! language using [`FilterPredicate::lookup`] and the parsed [`FilterToken`].
//! For in-memory collections, [`FilterSpec::filter`] and [`sort_by_terms`]
//! evaluate them directly over [`Seekable`] records.

mod error;
mod op;
mod ordering;
mod page;
mod params;
mod predicate;
mod schema;
mod spec;
mod token;
mod traits;
mod value;

// Re-export public API
pub use error::Rejection;
pub use op::Op;
pub use ordering::{compare_by_terms, compare_values, resolve_ordering, sort_by_terms, Dir, OrderTerm};
pub use page::{PageDescriptor, PageResult, PageSettings, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use params::QueryParams;
pub use predicate::{FieldPath, FilterPredicate, RELATION_SEPARATOR};
pub use schema::{
    describe, Describe, DescriptorBuilder, FieldDescriptor, FieldKind, RecordDescriptor,
    RelationTarget,
};
pub use spec::{FilterSpec, DEFAULT_RESERVED};
pub use token::{FilterToken, Operand, WildcardPattern};
pub use traits::Seekable;
pub use value::{Number, Value};
