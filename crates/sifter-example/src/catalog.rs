//! Catalog records: items, their category tree and tags.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sifter_crud::{
    Crud, CrudConfig, CrudStore, DescriptorValidator, FieldErrors, MemoryStore, Validator, Window,
    NON_FIELD_ERRORS,
};
use sifter_query::{
    describe, Describe, FilterSpec, Number, RecordDescriptor, RelationTarget, Seekable, Value,
};

/// A category. Categories nest through `parent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Category>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: u64,
    pub sku: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Describe for Category {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Category")
            .integer("id")
            .text("name")
            .relation("parent", RelationTarget::of::<Category>())
            .build()
    }
}

impl Describe for Tag {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Tag").text("name").build()
    }
}

impl Describe for Item {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Item")
            .integer("id")
            .text("sku")
            .text("name")
            .float("price")
            .integer("stock")
            .boolean("active")
            .datetime("created_at")
            .relation("category", RelationTarget::of::<Category>())
            .relation("tags", RelationTarget::of::<Tag>())
            .build()
    }
}

impl Seekable for Category {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        match field {
            "id" => Value::Number(Number::U64(self.id)),
            "name" => Value::String(&self.name),
            _ => Value::None,
        }
    }

    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        match field {
            "parent" => self
                .parent
                .iter()
                .map(|p| &**p as &dyn Seekable)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Seekable for Tag {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        match field {
            "name" => Value::String(&self.name),
            _ => Value::None,
        }
    }
}

impl Seekable for Item {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        match field {
            "id" => Value::Number(Number::U64(self.id)),
            "sku" => Value::String(&self.sku),
            "name" => Value::String(&self.name),
            "price" => Value::Number(Number::F64(self.price)),
            "stock" => Value::Number(Number::I64(self.stock)),
            "active" => Value::Bool(self.active),
            "created_at" => Value::String(&self.created_at),
            _ => Value::None,
        }
    }

    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        match field {
            "category" => self
                .category
                .iter()
                .map(|c| c as &dyn Seekable)
                .collect(),
            "tags" => self.tags.iter().map(|t| t as &dyn Seekable).collect(),
            _ => Vec::new(),
        }
    }
}

pub type Catalog = Crud<MemoryStore<Item>>;

/// Validates item payloads and swaps a `category` primary key for the
/// category it names.
struct ItemValidator {
    fields: DescriptorValidator,
    categories: BTreeMap<u64, Category>,
}

impl ItemValidator {
    fn resolve(&self, raw: &str) -> Result<Json, FieldErrors> {
        let category = raw
            .parse::<u64>()
            .ok()
            .and_then(|pk| self.categories.get(&pk))
            .ok_or_else(|| {
                FieldErrors::new().with(
                    "category",
                    format!("Invalid pk \"{raw}\" - object does not exist."),
                )
            })?;
        serde_json::to_value(category)
            .map_err(|e| FieldErrors::new().with(NON_FIELD_ERRORS, e.to_string()))
    }
}

impl Validator for ItemValidator {
    fn validate(&self, payload: &Json, partial: bool) -> Result<Json, FieldErrors> {
        let mut clean = self.fields.validate(payload, partial)?;
        if let Some(slot) = clean.get_mut("category") {
            let raw = match slot {
                Json::Number(n) => Some(n.to_string()),
                Json::String(s) => Some(s.trim().to_string()),
                _ => None,
            };
            if let Some(raw) = raw {
                *slot = self.resolve(&raw)?;
            }
        }
        Ok(clean)
    }
}

/// Every category reachable from `items`, parents included, by id.
fn categories(items: &[Item]) -> BTreeMap<u64, Category> {
    let mut known = BTreeMap::new();
    for item in items {
        let mut next = item.category.as_ref();
        while let Some(category) = next {
            known.entry(category.id).or_insert_with(|| category.clone());
            next = category.parent.as_deref();
        }
    }
    known
}

/// Builds the orchestrator over `items`.
pub fn catalog(items: Vec<Item>, config: CrudConfig) -> anyhow::Result<Catalog> {
    let validator = ItemValidator {
        fields: DescriptorValidator::new(describe::<Item>())
            .required("sku")
            .required("name")
            .required("price")
            .read_only("id")
            .read_only("tags")
            .nullable("category"),
        categories: categories(&items),
    };
    let store = MemoryStore::with_records(items)?.unique("sku");
    Ok(Crud::new(store, validator).with_config(config))
}

/// Loads items from a JSON snapshot, or the built-in sample when `path` does
/// not exist yet.
pub fn load(path: Option<&Path>) -> anyhow::Result<Vec<Item>> {
    match path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let items = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(items)
        }
        _ => Ok(sample()),
    }
}

/// Writes every stored item to `path` as a JSON snapshot.
pub fn save(catalog: &Catalog, path: &Path) -> anyhow::Result<()> {
    let items = catalog
        .store()
        .fetch(&FilterSpec::new(), &[], Window::all())?;
    let content = serde_json::to_string_pretty(&items)?;
    std::fs::write(path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), items = items.len(), "snapshot saved");
    Ok(())
}

/// A small sample catalog.
pub fn sample() -> Vec<Item> {
    let hardware = Category {
        id: 1,
        name: "Hardware".to_string(),
        parent: None,
    };
    let tools = Category {
        id: 2,
        name: "Tools".to_string(),
        parent: Some(Box::new(hardware.clone())),
    };
    let garden = Category {
        id: 3,
        name: "Garden".to_string(),
        parent: None,
    };
    fn tags(names: &[&str]) -> Vec<Tag> {
        names
            .iter()
            .map(|n| Tag {
                name: n.to_string(),
            })
            .collect()
    }

    vec![
        Item {
            id: 1,
            sku: "HW-100".to_string(),
            name: "Hammer".to_string(),
            price: 19.5,
            stock: 40,
            active: true,
            created_at: "2024-01-15T09:30:00Z".to_string(),
            category: Some(tools.clone()),
            tags: tags(&["steel", "bestseller"]),
        },
        Item {
            id: 2,
            sku: "HW-101".to_string(),
            name: "Hand saw".to_string(),
            price: 24.0,
            stock: 12,
            active: true,
            created_at: "2024-02-03T14:00:00Z".to_string(),
            category: Some(tools),
            tags: tags(&["steel"]),
        },
        Item {
            id: 3,
            sku: "HW-200".to_string(),
            name: "Hinge pack".to_string(),
            price: 6.25,
            stock: 0,
            active: false,
            created_at: "2023-11-20T08:15:00Z".to_string(),
            category: Some(hardware),
            tags: Vec::new(),
        },
        Item {
            id: 4,
            sku: "GD-001".to_string(),
            name: "Garden hose".to_string(),
            price: 32.9,
            stock: 7,
            active: true,
            created_at: "2024-03-28T11:45:00Z".to_string(),
            category: Some(garden.clone()),
            tags: tags(&["outdoor"]),
        },
        Item {
            id: 5,
            sku: "GD-002".to_string(),
            name: "Hedge trimmer".to_string(),
            price: 89.0,
            stock: 3,
            active: true,
            created_at: "2024-04-02T16:20:00Z".to_string(),
            category: Some(garden),
            tags: tags(&["outdoor", "power"]),
        },
        Item {
            id: 6,
            sku: "MS-001".to_string(),
            name: "Gift card".to_string(),
            price: 25.0,
            stock: 100,
            active: true,
            created_at: "2024-05-01T00:00:00Z".to_string(),
            category: None,
            tags: Vec::new(),
        },
    ]
}
