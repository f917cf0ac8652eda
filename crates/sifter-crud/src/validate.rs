//! Payload validation.
//!
//! Create and update payloads pass through a [`Validator`] before reaching
//! storage. A failed validation yields [`FieldErrors`], which the orchestrator
//! returns to the caller verbatim.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sifter_query::{FieldKind, Number, RecordDescriptor};

/// Key for errors not tied to one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level validation messages, keyed by field name.
///
/// Serializes as `{"field": ["message", ...], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    /// Messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Checks and normalizes write payloads.
pub trait Validator: Send + Sync {
    /// Validates `payload` for a create or full update (`partial == false`)
    /// or a partial update (`partial == true`).
    ///
    /// Returns the payload to hand to storage, or the field errors.
    fn validate(&self, payload: &Value, partial: bool) -> Result<Value, FieldErrors>;
}

impl<F> Validator for F
where
    F: Fn(&Value, bool) -> Result<Value, FieldErrors> + Send + Sync,
{
    fn validate(&self, payload: &Value, partial: bool) -> Result<Value, FieldErrors> {
        self(payload, partial)
    }
}

/// A validator that accepts every payload unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, payload: &Value, _partial: bool) -> Result<Value, FieldErrors> {
        Ok(payload.clone())
    }
}

/// A validator driven by a [`RecordDescriptor`].
///
/// - The payload must be a JSON object.
/// - Required fields must be present on full writes.
/// - Read-only and unknown keys are dropped silently.
/// - Values must fit the field's kind. Numeric and boolean strings are
///   converted to native JSON values.
/// - Relations accept a primary key or a nested object.
/// - `null` is accepted only for nullable fields.
///
/// ```
/// use serde_json::json;
/// use sifter_crud::{DescriptorValidator, Validator};
/// use sifter_query::RecordDescriptor;
///
/// let schema = RecordDescriptor::builder("Item").integer("id").text("name").integer("age").build();
/// let validator = DescriptorValidator::new(schema).required("name").read_only("id");
///
/// let clean = validator.validate(&json!({"id": 9, "name": "box", "age": "3"}), false).unwrap();
/// assert_eq!(clean, json!({"name": "box", "age": 3}));
///
/// let errors = validator.validate(&json!({"age": "old"}), false).unwrap_err();
/// assert_eq!(errors.get("name").unwrap(), ["This field is required."]);
/// assert_eq!(errors.get("age").unwrap(), ["A valid integer is required."]);
/// ```
#[derive(Debug, Clone)]
pub struct DescriptorValidator {
    descriptor: Arc<RecordDescriptor>,
    required: BTreeSet<String>,
    read_only: BTreeSet<String>,
    nullable: BTreeSet<String>,
}

impl DescriptorValidator {
    pub fn new(descriptor: impl Into<Arc<RecordDescriptor>>) -> Self {
        DescriptorValidator {
            descriptor: descriptor.into(),
            required: BTreeSet::new(),
            read_only: BTreeSet::new(),
            nullable: BTreeSet::new(),
        }
    }

    /// Marks a field as required on create and full update.
    pub fn required(mut self, field: impl Into<String>) -> Self {
        self.required.insert(field.into());
        self
    }

    /// Marks a field as read-only: ignored in payloads.
    pub fn read_only(mut self, field: impl Into<String>) -> Self {
        self.read_only.insert(field.into());
        self
    }

    /// Allows `null` for a field.
    pub fn nullable(mut self, field: impl Into<String>) -> Self {
        self.nullable.insert(field.into());
        self
    }

    fn check_field(
        &self,
        name: &str,
        kind: &FieldKind,
        value: &Value,
    ) -> Result<Value, &'static str> {
        if value.is_null() {
            return if self.nullable.contains(name) {
                Ok(Value::Null)
            } else {
                Err("This field may not be null.")
            };
        }
        match kind {
            FieldKind::Text => match value {
                Value::String(s) if s.trim().is_empty() && self.required.contains(name) => {
                    Err("This field may not be blank.")
                }
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err("Not a valid string."),
            },
            FieldKind::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::String(s) => match Number::parse_for(kind, s) {
                    Some(Number::I64(n)) => Ok(Value::from(n)),
                    _ => Err("A valid integer is required."),
                },
                _ => Err("A valid integer is required."),
            },
            FieldKind::Float => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => match Number::parse_for(kind, s) {
                    Some(Number::F64(f)) if f.is_finite() => Ok(Value::from(f)),
                    _ => Err("A valid number is required."),
                },
                _ => Err("A valid number is required."),
            },
            FieldKind::Decimal => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) if Number::parse_for(kind, s).is_some() => {
                    Ok(Value::String(s.trim().to_string()))
                }
                _ => Err("A valid number is required."),
            },
            FieldKind::DateTime => match value {
                Value::String(s) if !s.trim().is_empty() => Ok(value.clone()),
                _ => Err("Datetime has wrong format."),
            },
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::Number(n) if n.as_u64() == Some(1) => Ok(Value::Bool(true)),
                Value::Number(n) if n.as_u64() == Some(0) => Ok(Value::Bool(false)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(Value::Bool(true)),
                    "false" | "0" | "no" => Ok(Value::Bool(false)),
                    _ => Err("Must be a valid boolean."),
                },
                _ => Err("Must be a valid boolean."),
            },
            FieldKind::Relation(_) => match value {
                Value::Number(n) if n.is_u64() || n.is_i64() => Ok(value.clone()),
                Value::String(s) if !s.trim().is_empty() => Ok(value.clone()),
                Value::Object(_) => Ok(value.clone()),
                _ => Err("Incorrect type. Expected pk value."),
            },
        }
    }
}

impl Validator for DescriptorValidator {
    fn validate(&self, payload: &Value, partial: bool) -> Result<Value, FieldErrors> {
        let Some(object) = payload.as_object() else {
            return Err(FieldErrors::new().with(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(payload)
                ),
            ));
        };

        let mut errors = FieldErrors::new();
        let mut clean = Map::new();

        for field in self.descriptor.fields() {
            let name = field.name();
            if self.read_only.contains(name) {
                continue;
            }
            match object.get(name) {
                Some(value) => match self.check_field(name, field.kind(), value) {
                    Ok(value) => {
                        clean.insert(name.to_string(), value);
                    }
                    Err(message) => errors.add(name, message),
                },
                None if !partial && self.required.contains(name) => {
                    errors.add(name, "This field is required.");
                }
                None => {}
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(clean))
        } else {
            Err(errors)
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
