//! Record access for in-memory evaluation.
//!
//! This module provides the [`Seekable`] trait, which lets the engine read
//! field values and follow relations on caller-owned records. Storage-backed
//! collaborators translate predicates into their own query language instead
//! and never need it.

use crate::value::Value;

/// Trait for records that filter specifications can be evaluated against.
///
/// # Example
///
/// ```
/// use sifter_query::{Seekable, Value, Number};
///
/// struct Category {
///     name: String,
/// }
///
/// struct Item {
///     name: String,
///     price: i64,
///     category: Option<Category>,
/// }
///
/// impl Seekable for Category {
///     fn seeker_field_value(&self, field: &str) -> Value<'_> {
///         match field {
///             "name" => Value::String(&self.name),
///             _ => Value::None,
///         }
///     }
/// }
///
/// impl Seekable for Item {
///     fn seeker_field_value(&self, field: &str) -> Value<'_> {
///         match field {
///             "name" => Value::String(&self.name),
///             "price" => Value::Number(Number::I64(self.price)),
///             _ => Value::None,
///         }
///     }
///
///     fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
///         match field {
///             "category" => self.category.iter().map(|c| c as &dyn Seekable).collect(),
///             _ => Vec::new(),
///         }
///     }
/// }
/// ```
pub trait Seekable {
    /// Returns the value of a scalar field for comparison.
    ///
    /// Returns [`Value::None`] if the field doesn't exist, is null, or is a
    /// relation.
    fn seeker_field_value(&self, field: &str) -> Value<'_>;

    /// Returns the records reachable through a relation field.
    ///
    /// To-one relations yield zero or one record; to-many relations yield
    /// every related record. A traversal matches when any of them matches.
    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        let _ = field;
        Vec::new()
    }

    /// The key this record sorts by when a relation pointing at it is used
    /// as an ordering term. Defaults to the `id` field.
    fn seeker_key(&self) -> Value<'_> {
        self.seeker_field_value("id")
    }
}

impl<T: Seekable + ?Sized> Seekable for &T {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        (**self).seeker_field_value(field)
    }

    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        (**self).seeker_related(field)
    }

    fn seeker_key(&self) -> Value<'_> {
        (**self).seeker_key()
    }
}

impl<T: Seekable> Seekable for Box<T> {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        (**self).seeker_field_value(field)
    }

    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        (**self).seeker_related(field)
    }

    fn seeker_key(&self) -> Value<'_> {
        (**self).seeker_key()
    }
}
