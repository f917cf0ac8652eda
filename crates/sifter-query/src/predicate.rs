//! Filter predicates: one query parameter resolved against a schema.
//!
//! The parameter key is a [`FieldPath`] of `__`-separated segments. Every
//! segment except the last must name a relation field; the walk descends into
//! the related record at each hop. The last segment names the leaf field,
//! whose kind decides how the value is classified into a [`FilterToken`].
//!
//! Anything that cannot be resolved or classified yields an *invalid*
//! predicate, which never matches. Parsing itself never fails.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::Rejection;
use crate::schema::{FieldKind, RecordDescriptor};
use crate::token::FilterToken;
use crate::traits::Seekable;
use crate::value::Value;

/// Separator between relation hops in a parameter key.
pub const RELATION_SEPARATOR: &str = "__";

/// A sequence of field names, e.g. `category__parent__name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Splits a parameter key on [`RELATION_SEPARATOR`].
    pub fn parse(key: &str) -> FieldPath {
        FieldPath(key.split(RELATION_SEPARATOR).map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The relation hops (all segments but the last).
    pub fn hops(&self) -> &[String] {
        match self.0.split_last() {
            Some((_, hops)) => hops,
            None => &[],
        }
    }

    /// The leaf field name.
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Walks the path against `descriptor` and returns the leaf field's kind.
    ///
    /// Only the supplied segments are followed, so cyclic schemas are safe.
    /// A leaf that is itself a relation is returned as such; callers decide
    /// whether that is acceptable.
    pub fn resolve(&self, descriptor: &RecordDescriptor) -> Result<FieldKind, Rejection> {
        if self.0.is_empty() || self.0.iter().any(String::is_empty) {
            return Err(Rejection::EmptySegment {
                key: self.to_string(),
            });
        }

        let mut current: Option<Arc<RecordDescriptor>> = None;
        for segment in self.hops() {
            let record = current.as_deref().unwrap_or(descriptor);
            let field = record
                .field(segment)
                .ok_or_else(|| Rejection::UnknownField {
                    record: record.name().to_string(),
                    segment: segment.clone(),
                })?;
            let related = field
                .kind()
                .related()
                .ok_or_else(|| Rejection::NotARelation {
                    record: record.name().to_string(),
                    segment: segment.clone(),
                })?;
            current = Some(related);
        }

        let record = current.as_deref().unwrap_or(descriptor);
        record
            .field(self.leaf())
            .map(|f| f.kind().clone())
            .ok_or_else(|| Rejection::UnknownField {
                record: record.name().to_string(),
                segment: self.leaf().to_string(),
            })
    }

    /// Reads the value at this path from a record, following the first
    /// related record at each hop. A relation leaf reads the related
    /// record's [`Seekable::seeker_key`].
    pub fn value_of<'a, T: Seekable + ?Sized>(&self, item: &'a T) -> Value<'a> {
        value_at(item, self.hops(), self.leaf())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(RELATION_SEPARATOR))
    }
}

fn value_at<'a, T: Seekable + ?Sized>(item: &'a T, hops: &[String], leaf: &str) -> Value<'a> {
    match hops.split_first() {
        None => match item.seeker_field_value(leaf) {
            Value::None => item
                .seeker_related(leaf)
                .into_iter()
                .next()
                .map_or(Value::None, |related| related.seeker_key()),
            value => value,
        },
        Some((hop, rest)) => match item.seeker_related(hop).into_iter().next() {
            Some(related) => value_at(related, rest, leaf),
            None => Value::None,
        },
    }
}

// Multi-valued relations match when any related record matches.
fn any_match<T: Seekable + ?Sized>(
    item: &T,
    hops: &[String],
    leaf: &str,
    token: &FilterToken,
) -> bool {
    match hops.split_first() {
        None => token.matches(&item.seeker_field_value(leaf)),
        Some((hop, rest)) => item
            .seeker_related(hop)
            .into_iter()
            .any(|related| any_match(related, rest, leaf, token)),
    }
}

/// Outcome of resolving one parameter.
#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    Valid { leaf: FieldKind, token: FilterToken },
    Invalid(Rejection),
}

/// A schema-checked filter on one field path.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    key: String,
    path: FieldPath,
    resolution: Resolution,
}

impl FilterPredicate {
    /// Resolves `key=value` against `descriptor`.
    ///
    /// Never fails: unknown fields, non-relation hops, relation leaves and
    /// malformed values all produce an invalid predicate.
    pub fn parse(descriptor: &RecordDescriptor, key: &str, value: &str) -> FilterPredicate {
        let path = FieldPath::parse(key);
        let resolution = match Self::resolve(descriptor, &path, value) {
            Ok((leaf, token)) => Resolution::Valid { leaf, token },
            Err(rejection) => {
                tracing::debug!(
                    record = descriptor.name(),
                    key,
                    value,
                    reason = %rejection,
                    "filter parameter matches nothing"
                );
                Resolution::Invalid(rejection)
            }
        };
        FilterPredicate {
            key: key.to_string(),
            path,
            resolution,
        }
    }

    fn resolve(
        descriptor: &RecordDescriptor,
        path: &FieldPath,
        value: &str,
    ) -> Result<(FieldKind, FilterToken), Rejection> {
        let leaf = path.resolve(descriptor)?;
        if leaf.is_relation() {
            return Err(Rejection::RelationLeaf {
                record: descriptor.name().to_string(),
                segment: path.to_string(),
            });
        }
        let token = FilterToken::classify(&leaf, value)?;
        Ok((leaf, token))
    }

    /// An explicitly never-matching predicate.
    pub fn never(key: impl Into<String>, rejection: Rejection) -> FilterPredicate {
        let key = key.into();
        FilterPredicate {
            path: FieldPath::parse(&key),
            key,
            resolution: Resolution::Invalid(rejection),
        }
    }

    /// The parameter key as given.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.resolution, Resolution::Valid { .. })
    }

    /// The parsed token, for valid predicates.
    pub fn token(&self) -> Option<&FilterToken> {
        match &self.resolution {
            Resolution::Valid { token, .. } => Some(token),
            Resolution::Invalid(_) => None,
        }
    }

    /// The leaf field's kind, for valid predicates.
    pub fn leaf_kind(&self) -> Option<&FieldKind> {
        match &self.resolution {
            Resolution::Valid { leaf, .. } => Some(leaf),
            Resolution::Invalid(_) => None,
        }
    }

    /// Why this predicate never matches, for invalid predicates.
    pub fn rejection(&self) -> Option<&Rejection> {
        match &self.resolution {
            Resolution::Valid { .. } => None,
            Resolution::Invalid(rejection) => Some(rejection),
        }
    }

    /// Storage-neutral lookup expression, e.g. `category__name__istartswith`.
    pub fn lookup(&self) -> Option<String> {
        let token = self.token()?;
        Some(format!(
            "{}{}{}",
            self.path,
            RELATION_SEPARATOR,
            token.op().lookup(token.is_textual())
        ))
    }

    /// Evaluates this predicate against an in-memory record.
    pub fn matches<T: Seekable + ?Sized>(&self, item: &T) -> bool {
        match &self.resolution {
            Resolution::Valid { token, .. } => {
                any_match(item, self.path.hops(), self.path.leaf(), token)
            }
            Resolution::Invalid(_) => false,
        }
    }
}

#[derive(Serialize)]
struct PredicateView<'a> {
    key: &'a str,
    path: &'a FieldPath,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    lookup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a FilterToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<String>,
}

impl Serialize for FilterPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PredicateView {
            key: &self.key,
            path: &self.path,
            valid: self.is_valid(),
            lookup: self.lookup(),
            token: self.token(),
            rejection: self.rejection().map(ToString::to_string),
        }
        .serialize(serializer)
    }
}
