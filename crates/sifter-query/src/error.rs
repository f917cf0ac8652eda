//! Reasons a filter predicate can be rejected.
//!
//! Rejections are never returned as `Err` from the parser: they are carried
//! inside an invalid [`FilterPredicate`](crate::FilterPredicate) so that the
//! whole specification evaluates to "no matches" instead of failing.

use thiserror::Error;

use crate::schema::FieldKind;

/// Why a query parameter could not become a matching predicate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Rejection {
    /// A path segment does not name a field on the record it was looked up in.
    #[error("field '{segment}' does not exist on {record}")]
    UnknownField { record: String, segment: String },

    /// A non-final path segment names a field that is not a relation.
    #[error("field '{segment}' on {record} is not a relation and cannot be traversed")]
    NotARelation { record: String, segment: String },

    /// The path ends on a relation field without naming a field of the related record.
    #[error("field '{segment}' on {record} is a relation; name a field of the related record")]
    RelationLeaf { record: String, segment: String },

    /// The key is empty or contains an empty segment (e.g. `a____b`).
    #[error("empty field path segment in '{key}'")]
    EmptySegment { key: String },

    /// The value cannot be parsed for the leaf field's kind.
    #[error("value '{value}' is not a valid {expected} operand")]
    MalformedValue { value: String, expected: &'static str },

    /// A wildcard pattern failed to compile.
    #[error("invalid wildcard pattern: {0}")]
    Pattern(String),
}

impl Rejection {
    pub(crate) fn malformed(value: &str, kind: &FieldKind) -> Self {
        Rejection::MalformedValue {
            value: value.to_string(),
            expected: kind.as_str(),
        }
    }
}

impl From<regex::Error> for Rejection {
    fn from(err: regex::Error) -> Self {
        Rejection::Pattern(err.to_string())
    }
}
