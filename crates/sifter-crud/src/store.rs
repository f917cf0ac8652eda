//! Storage collaborator trait.
//!
//! This module provides the [`CrudStore`] trait that hosts implement to
//! connect their storage to the orchestrator. The store receives structured
//! filters and ordering terms and translates them into its own query
//! language; the orchestrator never builds native queries itself.
//!
//! The trait is sync-only; async stores should block internally.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use sifter_query::{FilterSpec, OrderTerm, RecordDescriptor};
use thiserror::Error;

use crate::validate::FieldErrors;

/// Boxed error from a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a failed storage operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record has the requested identifier.
    #[error("record not found")]
    NotFound,

    /// The payload was rejected field by field.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// A storage constraint (uniqueness, foreign key, ...) was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    /// Wraps any error as a backend failure.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        StoreError::Backend(err.into())
    }
}

impl From<FieldErrors> for StoreError {
    fn from(errors: FieldErrors) -> Self {
        StoreError::Validation(errors)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Offset and optional limit of a fetch. `limit: None` means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Window {
    /// Every record.
    pub fn all() -> Self {
        Window::default()
    }

    pub fn new(offset: usize, limit: usize) -> Self {
        Window {
            offset,
            limit: Some(limit),
        }
    }
}

/// Trait for storage backends driven by the orchestrator.
///
/// # Design Notes
///
/// - **Structured queries**: `count` and `fetch` receive a [`FilterSpec`] and
///   [`OrderTerm`]s. Each valid predicate exposes its field path, parsed
///   token and a lookup name (`category__name__istartswith`) to translate.
///   The orchestrator never calls them with an unsatisfiable spec.
///
/// - **Two-stage ID resolution**: `parse_id` validates the identifier format
///   before `get` fetches the record. An identifier that does not parse is
///   reported as not found.
///
/// - **JSON payloads**: create and update receive the validated payload as
///   `serde_json::Value`.
pub trait CrudStore: Send + Sync {
    /// The record type returned to callers.
    type Record: Serialize;

    /// The identifier type.
    type Id: Clone + Display + FromStr;

    /// Schema of the stored records.
    fn descriptor(&self) -> Arc<RecordDescriptor>;

    /// Parses an identifier, returning `None` when the format is invalid.
    fn parse_id(&self, raw: &str) -> Option<Self::Id> {
        raw.trim().parse().ok()
    }

    /// Counts the records matching `spec`.
    fn count(&self, spec: &FilterSpec) -> Result<usize, StoreError>;

    /// Returns the matching records, ordered by `order` and sliced by
    /// `window`. With no terms, the store applies its own default order.
    fn fetch(
        &self,
        spec: &FilterSpec,
        order: &[OrderTerm],
        window: Window,
    ) -> Result<Vec<Self::Record>, StoreError>;

    /// Retrieves a record by identifier, returning `None` if absent.
    fn get(&self, id: &Self::Id) -> Result<Option<Self::Record>, StoreError>;

    /// Retrieves a record by identifier, failing with
    /// [`StoreError::NotFound`] if absent.
    fn resolve(&self, id: &Self::Id) -> Result<Self::Record, StoreError> {
        self.get(id)?.ok_or(StoreError::NotFound)
    }

    /// Creates a record from a validated payload.
    fn create(&self, payload: serde_json::Value) -> Result<Self::Record, StoreError>;

    /// Updates a record with a validated payload. A full update
    /// (`partial == false`) was validated as a complete record; a partial
    /// update carries only the fields to change.
    fn update(
        &self,
        id: &Self::Id,
        payload: serde_json::Value,
        partial: bool,
    ) -> Result<Self::Record, StoreError>;

    /// Deletes a record.
    fn delete(&self, id: &Self::Id) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_constructors() {
        assert_eq!(Window::all(), Window { offset: 0, limit: None });
        assert_eq!(Window::new(20, 10).limit, Some(10));
    }

    #[test]
    fn backend_errors_keep_their_message() {
        let err = StoreError::backend("disk on fire");
        assert_eq!(err.to_string(), "disk on fire");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn conversions() {
        let err: StoreError = FieldErrors::new().with("name", "bad").into();
        assert!(matches!(err, StoreError::Validation(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(StoreError::from(json_err), StoreError::Backend(_)));
    }
}
