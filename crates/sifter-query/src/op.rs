//! Filter operators.
//!
//! The [`Op`] enum names the operation of a parsed [`FilterToken`](crate::FilterToken).
//! Operators are chosen syntactically from the parameter value and the leaf
//! field's kind; not all operators apply to all kinds.

use std::cmp::Ordering;

use serde::Serialize;

/// Comparison operator of a filter token.
///
/// Operators are grouped by the kinds they support:
/// - **Universal**: `Exact`
/// - **Text**: `StartsWith`, `EndsWith`, `Contains`, `MiddleWildcard`
/// - **Numeric**: `Gte`, `Lte`, `Gt`, `Lt`, `Range`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// Equal. Case-insensitive for text.
    Exact,

    // Text operators (all case-insensitive)
    /// Text starts with prefix (`value*`).
    StartsWith,
    /// Text ends with suffix (`*value`).
    EndsWith,
    /// Text contains substring (`*value*`).
    Contains,
    /// Text matches a pattern with interior wildcards (`pre*suf`).
    MiddleWildcard,

    // Numeric operators
    /// Greater than or equal (`>=N`).
    Gte,
    /// Less than or equal (`<=N`).
    Lte,
    /// Greater than (`>N`).
    Gt,
    /// Less than (`<N`).
    Lt,
    /// Inclusive range (`min-max`).
    Range,
}

/// Numeric prefix operators in match order; two-character forms come first
/// so `>=` is never read as `>`.
const PREFIXES: [(&str, Op); 4] = [
    (">=", Op::Gte),
    ("<=", Op::Lte),
    (">", Op::Gt),
    ("<", Op::Lt),
];

impl Op {
    /// Splits a leading comparison operator off `text`.
    ///
    /// Returns the operator and the remainder (trimmed), or `None` when the
    /// text has no operator prefix.
    pub fn split_prefix(text: &str) -> Option<(Op, &str)> {
        PREFIXES.iter().find_map(|(prefix, op)| {
            text.strip_prefix(prefix)
                .map(|rest| (*op, rest.trim()))
        })
    }

    /// Returns `true` if this operator applies to text.
    pub fn is_text_op(self) -> bool {
        matches!(
            self,
            Op::Exact | Op::StartsWith | Op::EndsWith | Op::Contains | Op::MiddleWildcard
        )
    }

    /// Returns `true` if this operator applies to numbers.
    pub fn is_number_op(self) -> bool {
        matches!(
            self,
            Op::Exact | Op::Gte | Op::Lte | Op::Gt | Op::Lt | Op::Range
        )
    }

    /// Evaluates a single-operand comparison given an ordering result
    /// (field value compared to operand).
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Exact => ordering == Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            _ => false, // Not an ordering-based operator
        }
    }

    /// Storage-neutral lookup name, for collaborators that translate tokens
    /// into native query syntax.
    pub fn lookup(self, textual: bool) -> &'static str {
        match self {
            Op::Exact if textual => "iexact",
            Op::Exact => "exact",
            Op::StartsWith => "istartswith",
            Op::EndsWith => "iendswith",
            Op::Contains => "icontains",
            Op::MiddleWildcard => "iregex",
            Op::Gte => "gte",
            Op::Lte => "lte",
            Op::Gt => "gt",
            Op::Lt => "lt",
            Op::Range => "range",
        }
    }

    /// Returns the display name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Exact => "exact",
            Op::StartsWith => "startswith",
            Op::EndsWith => "endswith",
            Op::Contains => "contains",
            Op::MiddleWildcard => "wildcard",
            Op::Gte => "gte",
            Op::Lte => "lte",
            Op::Gt => "gt",
            Op::Lt => "lt",
            Op::Range => "range",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
