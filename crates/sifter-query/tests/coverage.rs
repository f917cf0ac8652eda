//! End-to-end behavior of filtering, ordering and pagination over a small
//! catalog with nested and self-referencing relations.

use std::str::FromStr;

use rust_decimal::Decimal;
use sifter_query::{
    describe, resolve_ordering, sort_by_terms, Describe, FieldKind, FilterSpec, FilterToken,
    Number, PageDescriptor, PageSettings, QueryParams, RecordDescriptor, Rejection,
    RelationTarget, Seekable, Value, DEFAULT_RESERVED,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Clone)]
struct Category {
    name: &'static str,
    parent: Option<Box<Category>>,
}

#[derive(Debug, Clone)]
struct Tag {
    label: &'static str,
}

#[derive(Debug, Clone)]
struct Item {
    name: &'static str,
    age: i64,
    price: Decimal,
    weight: f64,
    active: bool,
    created_at: &'static str,
    category: Option<Category>,
    tags: Vec<Tag>,
}

impl Describe for Category {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Category")
            .text("name")
            .relation("parent", RelationTarget::of::<Category>())
            .build()
    }
}

impl Describe for Tag {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Tag").text("label").build()
    }
}

impl Describe for Item {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::builder("Item")
            .text("name")
            .integer("age")
            .decimal("price")
            .float("weight")
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
            "name" => Value::String(self.name),
            _ => Value::None,
        }
    }

    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        match field {
            "parent" => self.parent.iter().map(|p| p.as_ref() as &dyn Seekable).collect(),
            _ => Vec::new(),
        }
    }
}

impl Seekable for Tag {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        match field {
            "label" => Value::String(self.label),
            _ => Value::None,
        }
    }
}

impl Seekable for Item {
    fn seeker_field_value(&self, field: &str) -> Value<'_> {
        match field {
            "name" => Value::String(self.name),
            "age" => Value::Number(Number::I64(self.age)),
            "price" => Value::Number(Number::Decimal(self.price)),
            "weight" => Value::Number(Number::F64(self.weight)),
            "active" => Value::Bool(self.active),
            "created_at" => Value::String(self.created_at),
            _ => Value::None,
        }
    }

    fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
        match field {
            "category" => self.category.iter().map(|c| c as &dyn Seekable).collect(),
            "tags" => self.tags.iter().map(|t| t as &dyn Seekable).collect(),
            _ => Vec::new(),
        }
    }
}

fn category(name: &'static str, parent: Option<Category>) -> Category {
    Category {
        name,
        parent: parent.map(Box::new),
    }
}

fn catalog() -> Vec<Item> {
    let tools = category("Tools", None);
    let hand = category("Hand tools", Some(tools.clone()));
    let garden = category("Garden", None);
    vec![
        Item {
            name: "test",
            age: 20,
            price: Decimal::from_str("9.99").unwrap(),
            weight: 1.5,
            active: true,
            created_at: "2026-02-06T10:00:00Z",
            category: Some(hand.clone()),
            tags: vec![Tag { label: "sale" }, Tag { label: "new" }],
        },
        Item {
            name: "testing",
            age: 25,
            price: Decimal::from_str("19.50").unwrap(),
            weight: 2.25,
            active: false,
            created_at: "2026-02-07T09:30:00Z",
            category: Some(tools),
            tags: vec![Tag { label: "new" }],
        },
        Item {
            name: "other",
            age: 30,
            price: Decimal::from_str("100").unwrap(),
            weight: 0.75,
            active: true,
            created_at: "2026-03-01T00:00:00Z",
            category: Some(garden),
            tags: Vec::new(),
        },
    ]
}

fn query(q: &str) -> Vec<&'static str> {
    let items = catalog();
    let spec = FilterSpec::build(&describe::<Item>(), &QueryParams::parse(q), &DEFAULT_RESERVED);
    spec.filter(&items).iter().map(|i| i.name).collect()
}

// ============================================================================
// Reference scenario
// ============================================================================

#[test]
fn prefix_filter_matches_two() {
    assert_eq!(query("name=test*"), ["test", "testing"]);
}

#[test]
fn range_filter_matches_one() {
    assert_eq!(query("age=18-20"), ["test"]);
}

#[test]
fn unknown_field_matches_nothing() {
    assert!(query("nonexistent=foo").is_empty());
}

#[test]
fn no_filters_first_page_of_two() {
    let items = catalog();
    let params = QueryParams::parse("page_size=2");
    let spec = FilterSpec::build(&describe::<Item>(), &params, &DEFAULT_RESERVED);
    let matched = spec.filter(&items);

    let page = PageDescriptor::from_params(&params, &PageSettings::default());
    let result = page.paginate(matched.len(), "http://host/items/", &params, "page");
    let window = &matched[result.window(matched.len())];

    assert_eq!(result.count, 3);
    assert_eq!(window.len(), 2);
    assert!(result.next.is_some());
    assert!(result.previous.is_none());
}

// ============================================================================
// Text
// ============================================================================

#[test]
fn text_patterns() {
    assert_eq!(query("name=TEST"), ["test"]);
    assert_eq!(query("name=*ing"), ["testing"]);
    assert_eq!(query("name=*th*"), ["other"]);
    assert_eq!(query("name=t*t"), ["test"]);
    assert_eq!(query("name=t*i*g"), ["testing"]);
    assert_eq!(query("name=*").len(), 3);
}

#[test]
fn datetime_prefix() {
    assert_eq!(query("created_at=2026-02*"), ["test", "testing"]);
    assert_eq!(query("created_at=2026-02-06*"), ["test"]);
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn integer_operators() {
    assert_eq!(query("age=>=25"), ["testing", "other"]);
    assert_eq!(query("age=<=25"), ["test", "testing"]);
    assert_eq!(query("age=>25"), ["other"]);
    assert_eq!(query("age=<25"), ["test"]);
    assert_eq!(query("age=25"), ["testing"]);
    assert_eq!(query("age=%3E%3D%2025"), ["testing", "other"]);
}

#[test]
fn decimal_and_float_operators() {
    assert_eq!(query("price=<20"), ["test", "testing"]);
    assert_eq!(query("price=19.5"), ["testing"]);
    assert_eq!(query("price=10-100"), ["testing", "other"]);
    assert_eq!(query("weight=>1"), ["test", "testing"]);
    assert_eq!(query("weight=0.5-1.5"), ["test", "other"]);
}

#[test]
fn malformed_numbers_match_nothing() {
    assert!(query("age=abc").is_empty());
    assert!(query("age=>=").is_empty());
    assert!(query("age=10.5").is_empty());
    assert!(query("age=1-2-3").is_empty());
    assert!(query("price=cheap").is_empty());
}

#[test]
fn booleans() {
    assert_eq!(query("active=true"), ["test", "other"]);
    assert_eq!(query("active=0"), ["testing"]);
    assert!(query("active=maybe").is_empty());
}

// ============================================================================
// Relations
// ============================================================================

#[test]
fn one_hop_relation() {
    assert_eq!(query("category__name=tools"), ["testing"]);
    assert_eq!(query("category__name=*tools"), ["test", "testing"]);
}

#[test]
fn self_referencing_relation_depth_two() {
    assert_eq!(query("category__parent__name=Tools"), ["test"]);
    assert!(query("category__parent__parent__name=*").is_empty());
}

#[test]
fn to_many_relation_any_match() {
    assert_eq!(query("tags__label=new"), ["test", "testing"]);
    assert_eq!(query("tags__label=sale"), ["test"]);
}

#[test]
fn non_relation_hop_matches_nothing() {
    assert!(query("name__length=4").is_empty());
    assert!(query("category__name__x=1").is_empty());
}

#[test]
fn relation_leaf_matches_nothing() {
    assert!(query("category=1").is_empty());
}

#[test]
fn unknown_field_anywhere_empties_conjunction() {
    assert!(query("name=test*&category__bogus=x").is_empty());
}

#[test]
fn rejections_explain_failures() {
    let spec = FilterSpec::build(
        &describe::<Item>(),
        &QueryParams::parse("nonexistent=foo&age=abc&name__x=1&category=2"),
        &DEFAULT_RESERVED,
    );
    let reasons: Vec<_> = spec.rejections().map(|(_, r)| r.clone()).collect();
    assert!(matches!(reasons[0], Rejection::UnknownField { .. }));
    assert!(matches!(reasons[1], Rejection::MalformedValue { .. }));
    assert!(matches!(reasons[2], Rejection::NotARelation { .. }));
    assert!(matches!(reasons[3], Rejection::RelationLeaf { .. }));
}

#[test]
fn lookups_name_storage_primitives() {
    let spec = FilterSpec::build(
        &describe::<Item>(),
        &QueryParams::parse("category__parent__name=to*&age=1-5&price=3&active=yes&name=a*b"),
        &DEFAULT_RESERVED,
    );
    let lookups: Vec<_> = spec.predicates().iter().filter_map(|p| p.lookup()).collect();
    assert_eq!(
        lookups,
        [
            "category__parent__name__istartswith",
            "age__range",
            "price__exact",
            "active__exact",
            "name__iregex",
        ]
    );
    assert!(matches!(
        spec.predicates()[1].token(),
        Some(FilterToken::Range(Number::I64(1), Number::I64(5)))
    ));
    assert_eq!(spec.predicates()[0].leaf_kind(), Some(&FieldKind::Text));
}

// ============================================================================
// Ordering
// ============================================================================

fn ordered(directive: &str) -> Vec<&'static str> {
    let mut items = catalog();
    let terms = resolve_ordering(&describe::<Item>(), directive);
    sort_by_terms(&mut items, &terms);
    items.iter().map(|i| i.name).collect()
}

#[test]
fn ordering_by_fields() {
    assert_eq!(ordered("-age"), ["other", "testing", "test"]);
    assert_eq!(ordered("name"), ["other", "test", "testing"]);
    assert_eq!(ordered("-active,age"), ["test", "other", "testing"]);
}

#[test]
fn ordering_through_relation() {
    assert_eq!(ordered("category__name"), ["other", "test", "testing"]);
}

#[test]
fn ordering_drops_unknown_terms() {
    assert_eq!(ordered("bogus,-age"), ["other", "testing", "test"]);
    assert_eq!(ordered("bogus"), ["test", "testing", "other"]);
}
