//! Field values and numbers.
//!
//! The [`Value`] enum is what a record hands to the engine for one of its
//! fields. [`Number`] carries parsed numeric operands and field values, keeping
//! integers, floats and decimals apart so that same-kind comparisons stay exact.

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::schema::FieldKind;

/// Runtime value for comparison, borrowed from the source record.
///
/// Date and time fields are exposed as [`Value::String`] holding their text
/// representation; the engine matches them with text patterns.
///
/// # Example
///
/// ```
/// use sifter_query::{Value, Number};
///
/// struct Item {
///     name: String,
///     age: u8,
/// }
///
/// fn accessor<'a>(item: &'a Item, field: &str) -> Value<'a> {
///     match field {
///         "name" => Value::String(&item.name),
///         "age" => Value::Number(Number::I64(item.age as i64)),
///         _ => Value::None,
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    String(&'a str),
    Number(Number),
    Bool(bool),
    /// Missing, null, or a relation.
    None,
}

impl<'a> Value<'a> {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Numeric value.
///
/// Comparisons between different variants go through the widest exact type
/// available: integers against decimals compare as decimals, everything else
/// mixed compares as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    I64(i64),
    U64(u64),
    F64(f64),
    Decimal(Decimal),
}

impl Number {
    /// Parses `text` as an operand for a field of the given kind.
    ///
    /// Integer fields require an integral literal; float fields accept any
    /// `f64` literal; decimal fields accept any decimal literal. Returns `None`
    /// for non-numeric kinds or unparseable text.
    pub fn parse_for(kind: &FieldKind, text: &str) -> Option<Number> {
        let text = text.trim();
        match kind {
            FieldKind::Integer => text.parse::<i64>().ok().map(Number::I64),
            FieldKind::Float => text.parse::<f64>().ok().map(Number::F64),
            FieldKind::Decimal => text.parse::<Decimal>().ok().map(Number::Decimal),
            _ => None,
        }
    }

    /// Lossy conversion used for mixed float comparisons. A decimal out of
    /// `f64` range becomes NaN.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
            Number::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
        }
    }

    fn to_decimal(self) -> Option<Decimal> {
        match self {
            Number::I64(n) => Some(Decimal::from(n)),
            Number::U64(n) => Some(Decimal::from(n)),
            Number::Decimal(d) => Some(d),
            Number::F64(_) => None,
        }
    }

    /// Compares two numbers of any variants. `None` when a NaN is involved.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::F64(a), Number::F64(b)) => a.partial_cmp(&b),
            (Number::Decimal(a), Number::Decimal(b)) => Some(a.cmp(&b)),

            // Integers against decimals stay exact
            (Number::Decimal(_), _) | (_, Number::Decimal(_)) => {
                match (self.to_decimal(), other.to_decimal()) {
                    (Some(a), Some(b)) => Some(a.cmp(&b)),
                    _ => self.to_f64().partial_cmp(&other.to_f64()),
                }
            }

            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{}", n),
            Number::U64(n) => write!(f, "{}", n),
            Number::F64(n) => write!(f, "{}", n),
            Number::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::I64(n)
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        Number::U64(n)
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number::F64(n)
    }
}

impl From<Decimal> for Number {
    fn from(d: Decimal) -> Self {
        Number::Decimal(d)
    }
}
