//! Conjunctive filter specifications.
//!
//! A [`FilterSpec`] is the AND of every [`FilterPredicate`] built from a
//! request's query parameters. It is the structured form handed to a storage
//! collaborator; [`FilterSpec::filter`] evaluates it over in-memory records.
//!
//! # Semantics
//!
//! - No predicates: matches every record.
//! - Any invalid predicate: matches nothing. The spec reports itself as
//!   unsatisfiable so executors can skip storage entirely.
//! - Repeated keys: the last value wins (see [`QueryParams::last_wins`]).
//!
//! # Example
//!
//! ```
//! use sifter_query::{FilterSpec, QueryParams, RecordDescriptor, DEFAULT_RESERVED};
//!
//! let item = RecordDescriptor::builder("Item").text("name").integer("age").build();
//! let params = QueryParams::parse("name=test*&age=18-20&page=2");
//!
//! let spec = FilterSpec::build(&item, &params, &DEFAULT_RESERVED);
//! assert_eq!(spec.len(), 2);
//! assert!(spec.is_satisfiable());
//! ```

use serde::Serialize;

use crate::error::Rejection;
use crate::params::QueryParams;
use crate::predicate::FilterPredicate;
use crate::schema::RecordDescriptor;
use crate::traits::Seekable;

/// Parameter names that never become filters unless configured otherwise.
pub const DEFAULT_RESERVED: [&str; 4] = ["page", "page_size", "ordering", "format"];

/// A conjunction of filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilterSpec {
    predicates: Vec<FilterPredicate>,
}

impl FilterSpec {
    /// Creates an empty specification, which matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a specification from query parameters.
    ///
    /// Keys listed in `reserved` are skipped by exact string match, as are
    /// parameters with an empty value. Each remaining key becomes one
    /// predicate, valid or not.
    pub fn build<S: AsRef<str>>(
        descriptor: &RecordDescriptor,
        params: &QueryParams,
        reserved: &[S],
    ) -> Self {
        let predicates = params
            .last_wins()
            .into_iter()
            .filter(|(key, _)| !reserved.iter().any(|r| r.as_ref() == *key))
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| FilterPredicate::parse(descriptor, key, value))
            .collect();
        FilterSpec { predicates }
    }

    /// Adds a predicate.
    pub fn push(&mut self, predicate: FilterPredicate) {
        self.predicates.push(predicate);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, predicate: FilterPredicate) -> Self {
        self.push(predicate);
        self
    }

    /// Intersects two specifications.
    pub fn and(mut self, other: FilterSpec) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    pub fn predicates(&self) -> &[FilterPredicate] {
        &self.predicates
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Returns `false` when some predicate can never match, making the whole
    /// conjunction empty.
    pub fn is_satisfiable(&self) -> bool {
        self.predicates.iter().all(FilterPredicate::is_valid)
    }

    /// Every rejected parameter with its reason.
    pub fn rejections(&self) -> impl Iterator<Item = (&str, &Rejection)> {
        self.predicates
            .iter()
            .filter_map(|p| p.rejection().map(|r| (p.key(), r)))
    }

    // ========================================================================
    // In-memory execution
    // ========================================================================

    /// Returns `true` if the record satisfies every predicate.
    pub fn matches<T: Seekable + ?Sized>(&self, item: &T) -> bool {
        self.predicates.iter().all(|p| p.matches(item))
    }

    /// Returns references to the matching records, in input order.
    pub fn filter<'a, T: Seekable>(&self, items: &'a [T]) -> Vec<&'a T> {
        if !self.is_satisfiable() {
            return Vec::new();
        }
        items.iter().filter(|item| self.matches(*item)).collect()
    }

    /// Counts the matching records.
    pub fn count<T: Seekable>(&self, items: &[T]) -> usize {
        if !self.is_satisfiable() {
            return 0;
        }
        items.iter().filter(|item| self.matches(*item)).count()
    }
}

impl FromIterator<FilterPredicate> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = FilterPredicate>>(iter: I) -> Self {
        FilterSpec {
            predicates: iter.into_iter().collect(),
        }
    }
}
