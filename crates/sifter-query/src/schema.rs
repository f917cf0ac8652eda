//! Record schemas as seen by the filter engine.
//!
//! A [`RecordDescriptor`] is an ordered list of [`FieldDescriptor`]s, each with
//! a [`FieldKind`]. Relation fields point at the descriptor of the related
//! record through a [`RelationTarget`], which is resolved lazily: schemas may
//! be self-referencing or mutually referencing, and only the path segments a
//! caller actually supplies are ever followed.
//!
//! Host record types implement [`Describe`]; [`describe`] memoizes the result
//! per type for the lifetime of the process.
//!
//! ```
//! use sifter_query::{describe, Describe, RecordDescriptor, RelationTarget};
//!
//! struct Category;
//! struct Item;
//!
//! impl Describe for Category {
//!     fn describe() -> RecordDescriptor {
//!         RecordDescriptor::builder("Category")
//!             .text("name")
//!             .relation("parent", RelationTarget::of::<Category>())
//!             .build()
//!     }
//! }
//!
//! impl Describe for Item {
//!     fn describe() -> RecordDescriptor {
//!         RecordDescriptor::builder("Item")
//!             .text("name")
//!             .integer("age")
//!             .relation("category", RelationTarget::of::<Category>())
//!             .build()
//!     }
//! }
//!
//! let item = describe::<Item>();
//! let category = item.field("category").unwrap().kind().related().unwrap();
//! assert_eq!(category.name(), "Category");
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

/// Semantic kind of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text, matched case-insensitively with `*` wildcards.
    Text,
    /// Whole numbers (`i64`).
    Integer,
    /// Floating point numbers (`f64`).
    Float,
    /// Fixed-point decimals.
    Decimal,
    /// Dates and timestamps, matched as text on their string representation.
    DateTime,
    /// Booleans, matched exactly.
    Boolean,
    /// Reference to another record.
    Relation(RelationTarget),
}

impl FieldKind {
    /// Maps a host schema type name to a scalar kind.
    ///
    /// Accepts the common ORM field class names (`CharField`, `IntegerField`,
    /// `DecimalField`, ...) and lower-case aliases (`text`, `integer`, ...).
    /// Relations cannot be described by name alone and return `None`, as does
    /// any unrecognized name.
    pub fn from_type_name(type_name: &str) -> Option<FieldKind> {
        let kind = match type_name {
            "CharField" | "TextField" | "SlugField" | "EmailField" | "URLField" | "text"
            | "string" => FieldKind::Text,
            "IntegerField" | "BigIntegerField" | "SmallIntegerField" | "PositiveIntegerField"
            | "PositiveSmallIntegerField" | "PositiveBigIntegerField" | "AutoField"
            | "BigAutoField" | "integer" | "int" => FieldKind::Integer,
            "FloatField" | "float" => FieldKind::Float,
            "DecimalField" | "decimal" => FieldKind::Decimal,
            "DateTimeField" | "DateField" | "TimeField" | "datetime" | "date" => {
                FieldKind::DateTime
            }
            "BooleanField" | "NullBooleanField" | "boolean" | "bool" => FieldKind::Boolean,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns `true` for [`FieldKind::Relation`].
    pub fn is_relation(&self) -> bool {
        matches!(self, FieldKind::Relation(_))
    }

    /// Returns `true` for the numeric kinds (Integer, Float, Decimal).
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float | FieldKind::Decimal)
    }

    /// Returns `true` for kinds matched with text patterns (Text, DateTime).
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::DateTime)
    }

    /// Resolves the related record's descriptor, if this is a relation.
    pub fn related(&self) -> Option<Arc<RecordDescriptor>> {
        match self {
            FieldKind::Relation(target) => Some(target.resolve()),
            _ => None,
        }
    }

    /// Returns the display name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Decimal => "decimal",
            FieldKind::DateTime => "datetime",
            FieldKind::Boolean => "boolean",
            FieldKind::Relation(_) => "relation",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lazily resolved descriptor of a related record.
#[derive(Clone)]
pub struct RelationTarget {
    resolve: Arc<dyn Fn() -> Arc<RecordDescriptor> + Send + Sync>,
}

impl RelationTarget {
    /// Creates a target from a resolver function.
    pub fn new<F>(resolve: F) -> Self
    where
        F: Fn() -> Arc<RecordDescriptor> + Send + Sync + 'static,
    {
        RelationTarget {
            resolve: Arc::new(resolve),
        }
    }

    /// Targets a host type through the memoized [`describe`] registry.
    pub fn of<T: Describe + 'static>() -> Self {
        RelationTarget::new(describe::<T>)
    }

    /// Targets an already-built descriptor. Only usable for acyclic schemas.
    pub fn fixed(descriptor: Arc<RecordDescriptor>) -> Self {
        RelationTarget::new(move || Arc::clone(&descriptor))
    }

    /// Resolves the related record's descriptor.
    pub fn resolve(&self) -> Arc<RecordDescriptor> {
        (self.resolve)()
    }
}

// Relations compare by the related record's name; comparing fields would
// walk the (possibly cyclic) relation graph.
impl PartialEq for RelationTarget {
    fn eq(&self, other: &Self) -> bool {
        self.resolve().name() == other.resolve().name()
    }
}

impl fmt::Debug for RelationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RelationTarget")
            .field(&self.resolve().name())
            .finish()
    }
}

/// A named, typed field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// Ordered set of fields describing one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Starts building a descriptor for the named record type.
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// The record type's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`RecordDescriptor`].
///
/// Declaring a field name twice replaces the earlier declaration in place.
#[derive(Debug)]
pub struct DescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl DescriptorBuilder {
    /// Adds a field of the given kind.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let field = FieldDescriptor::new(name, kind);
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Adds a field whose kind is given as a host type name.
    ///
    /// Fields whose type name is not recognized by
    /// [`FieldKind::from_type_name`] are left out of the descriptor and are
    /// therefore unknown to the filter engine.
    pub fn typed_field(self, name: impl Into<String>, type_name: &str) -> Self {
        let name = name.into();
        match FieldKind::from_type_name(type_name) {
            Some(kind) => self.field(name, kind),
            None => {
                tracing::debug!(
                    record = %self.name,
                    field = %name,
                    type_name,
                    "omitting field with unsupported type"
                );
                self
            }
        }
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Text)
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Integer)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Float)
    }

    pub fn decimal(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Decimal)
    }

    pub fn datetime(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::DateTime)
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Boolean)
    }

    pub fn relation(self, name: impl Into<String>, target: RelationTarget) -> Self {
        self.field(name, FieldKind::Relation(target))
    }

    pub fn build(self) -> RecordDescriptor {
        RecordDescriptor {
            name: self.name,
            fields: self.fields,
        }
    }
}

/// Implemented by host record types to expose their schema.
///
/// Implementations must be deterministic: the same type always yields a
/// structurally equal descriptor.
pub trait Describe {
    fn describe() -> RecordDescriptor;
}

static REGISTRY: Lazy<RwLock<HashMap<TypeId, Arc<RecordDescriptor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the memoized descriptor for `T`, computing it on first use.
///
/// The descriptor is computed outside the registry lock. Two threads may both
/// compute it on a cold start; the first insert wins and both observe the same
/// value afterwards.
pub fn describe<T: Describe + 'static>() -> Arc<RecordDescriptor> {
    let key = TypeId::of::<T>();
    if let Some(found) = REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&key)
    {
        return Arc::clone(found);
    }

    let computed = Arc::new(T::describe());
    let mut registry = REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(registry.entry(key).or_insert(computed))
}
