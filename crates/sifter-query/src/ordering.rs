//! Ordering directives.
//!
//! An ordering directive is a comma-separated list of field paths, each
//! optionally prefixed with `-` for descending order:
//!
//! ```text
//! ordering=name,-created_at,category__name
//! ```
//!
//! Unlike filters, an ordering term that does not resolve is dropped rather
//! than emptying the result: ordering degrades gracefully.

use std::cmp::Ordering;

use serde::Serialize;

use crate::predicate::FieldPath;
use crate::schema::RecordDescriptor;
use crate::traits::Seekable;
use crate::value::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Returns `true` if this is ascending order.
    pub fn is_asc(self) -> bool {
        matches!(self, Dir::Asc)
    }

    /// Returns `true` if this is descending order.
    pub fn is_desc(self) -> bool {
        matches!(self, Dir::Desc)
    }

    /// Applies this direction to an ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    /// Returns the display name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved ordering term: a field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTerm {
    pub path: FieldPath,
    pub dir: Dir,
}

impl OrderTerm {
    pub fn new(path: FieldPath, dir: Dir) -> Self {
        OrderTerm { path, dir }
    }

    /// Renders the term back into directive form (`-name`, `category__name`).
    pub fn directive(&self) -> String {
        match self.dir {
            Dir::Asc => self.path.to_string(),
            Dir::Desc => format!("-{}", self.path),
        }
    }

    /// Compares two values according to this term.
    ///
    /// Missing values sort last in either direction. Returns `None` when the
    /// values cannot be compared (type mismatch or NaN).
    pub fn compare(&self, a: &Value<'_>, b: &Value<'_>) -> Option<Ordering> {
        match (a, b) {
            (Value::None, Value::None) => Some(Ordering::Equal),
            (Value::None, _) => Some(Ordering::Greater),
            (_, Value::None) => Some(Ordering::Less),
            _ => compare_values(a, b).map(|o| self.dir.apply(o)),
        }
    }
}

/// Parses an ordering directive against `descriptor`.
///
/// Tokens are trimmed and empty tokens ignored. A token whose path does not
/// resolve (unknown field, non-relation hop) is dropped and logged; the
/// remaining terms keep their order. A relation as the final segment is
/// accepted: the storage collaborator orders by the related key.
pub fn resolve_ordering(descriptor: &RecordDescriptor, directive: &str) -> Vec<OrderTerm> {
    directive
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let (dir, name) = match token.strip_prefix('-') {
                Some(rest) => (Dir::Desc, rest.trim()),
                None => (Dir::Asc, token),
            };
            let path = FieldPath::parse(name);
            match path.resolve(descriptor) {
                Ok(_) => Some(OrderTerm::new(path, dir)),
                Err(reason) => {
                    tracing::debug!(
                        record = descriptor.name(),
                        token,
                        reason = %reason,
                        "ordering term dropped"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Compares two values of the same type.
///
/// Text compares case-sensitively by code point. Returns `None` if the types
/// don't match or comparison is not possible (NaN).
pub fn compare_values(a: &Value<'_>, b: &Value<'_>) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.compare(*b),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::None, Value::None) => Some(Ordering::Equal),
        (Value::None, _) => Some(Ordering::Greater),
        (_, Value::None) => Some(Ordering::Less),
        _ => None,
    }
}

/// Compares two records term by term.
///
/// The first term is the primary sort key, later terms break ties. Terms
/// whose values cannot be compared count as equal.
pub fn compare_by_terms<T: Seekable + ?Sized>(a: &T, b: &T, terms: &[OrderTerm]) -> Ordering {
    for term in terms {
        let val_a = term.path.value_of(a);
        let val_b = term.path.value_of(b);

        if let Some(ordering) = term.compare(&val_a, &val_b) {
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
    Ordering::Equal
}

/// Sorts records in place by `terms`. The sort is stable.
pub fn sort_by_terms<T: Seekable>(items: &mut [T], terms: &[OrderTerm]) {
    if terms.is_empty() {
        return;
    }
    items.sort_by(|a, b| compare_by_terms(a, b, terms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{describe, Describe, RelationTarget};
    use crate::value::Number;

    struct Row {
        name: &'static str,
        rank: Option<i64>,
    }

    impl Seekable for Row {
        fn seeker_field_value(&self, field: &str) -> Value<'_> {
            match field {
                "name" => Value::String(self.name),
                "rank" => self.rank.map_or(Value::None, |r| Value::Number(Number::I64(r))),
                _ => Value::None,
            }
        }
    }

    impl Describe for Row {
        fn describe() -> RecordDescriptor {
            RecordDescriptor::builder("Row")
                .text("name")
                .integer("rank")
                .relation("parent", RelationTarget::of::<Row>())
                .build()
        }
    }

    fn directives(terms: &[OrderTerm]) -> Vec<String> {
        terms.iter().map(OrderTerm::directive).collect()
    }

    #[test]
    fn parses_directions() {
        let terms = resolve_ordering(&describe::<Row>(), "name,-rank");
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].dir, Dir::Asc);
        assert_eq!(terms[1].dir, Dir::Desc);
        assert_eq!(directives(&terms), ["name", "-rank"]);
    }

    #[test]
    fn unknown_terms_are_dropped_in_place() {
        let terms = resolve_ordering(&describe::<Row>(), "-bogus, name ,,parent__nope,-rank");
        assert_eq!(directives(&terms), ["name", "-rank"]);
    }

    #[test]
    fn relation_paths_resolve() {
        let terms = resolve_ordering(&describe::<Row>(), "parent__parent__name,-parent");
        assert_eq!(directives(&terms), ["parent__parent__name", "-parent"]);
    }

    #[test]
    fn empty_directive_yields_nothing() {
        assert!(resolve_ordering(&describe::<Row>(), "").is_empty());
        assert!(resolve_ordering(&describe::<Row>(), " , ").is_empty());
    }

    #[test]
    fn non_relation_hop_is_dropped() {
        assert!(resolve_ordering(&describe::<Row>(), "name__rank").is_empty());
    }

    #[test]
    fn sorts_with_tie_breaks() {
        let mut rows = vec![
            Row { name: "b", rank: Some(1) },
            Row { name: "a", rank: Some(1) },
            Row { name: "c", rank: Some(2) },
        ];
        let terms = resolve_ordering(&describe::<Row>(), "-rank,name");
        sort_by_terms(&mut rows, &terms);
        let names: Vec<_> = rows.iter().map(|r| r.name).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn missing_values_sort_last_both_ways() {
        let mut rows = vec![
            Row { name: "none", rank: None },
            Row { name: "low", rank: Some(1) },
            Row { name: "high", rank: Some(9) },
        ];
        sort_by_terms(&mut rows, &resolve_ordering(&describe::<Row>(), "rank"));
        assert_eq!(rows.iter().map(|r| r.name).collect::<Vec<_>>(), ["low", "high", "none"]);

        sort_by_terms(&mut rows, &resolve_ordering(&describe::<Row>(), "-rank"));
        assert_eq!(rows.iter().map(|r| r.name).collect::<Vec<_>>(), ["high", "low", "none"]);
    }

    struct Shelf {
        id: u64,
        parent: Option<Box<Shelf>>,
    }

    impl Seekable for Shelf {
        fn seeker_field_value(&self, field: &str) -> Value<'_> {
            match field {
                "id" => Value::Number(Number::U64(self.id)),
                _ => Value::None,
            }
        }

        fn seeker_related(&self, field: &str) -> Vec<&dyn Seekable> {
            match field {
                "parent" => self.parent.iter().map(|p| &**p as &dyn Seekable).collect(),
                _ => Vec::new(),
            }
        }
    }

    impl Describe for Shelf {
        fn describe() -> RecordDescriptor {
            RecordDescriptor::builder("Shelf")
                .integer("id")
                .relation("parent", RelationTarget::of::<Shelf>())
                .build()
        }
    }

    #[test]
    fn relation_leaf_sorts_by_related_key() {
        let shelf = |id: u64, parent: Option<u64>| Shelf {
            id,
            parent: parent.map(|p| Box::new(Shelf { id: p, parent: None })),
        };
        let mut shelves = vec![shelf(1, Some(7)), shelf(2, None), shelf(3, Some(4))];

        sort_by_terms(&mut shelves, &resolve_ordering(&describe::<Shelf>(), "parent"));
        assert_eq!(shelves.iter().map(|s| s.id).collect::<Vec<_>>(), [3, 1, 2]);

        sort_by_terms(&mut shelves, &resolve_ordering(&describe::<Shelf>(), "-parent"));
        assert_eq!(shelves.iter().map(|s| s.id).collect::<Vec<_>>(), [1, 3, 2]);
    }

    #[test]
    fn compare_values_type_mismatch() {
        assert_eq!(
            compare_values(&Value::String("a"), &Value::Number(Number::I64(1))),
            None
        );
        assert_eq!(
            compare_values(&Value::Bool(false), &Value::Bool(true)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn dir_apply() {
        assert_eq!(Dir::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(Dir::Desc.apply(Ordering::Less), Ordering::Greater);
        assert!(Dir::default().is_asc());
        assert_eq!(Dir::Desc.to_string(), "desc");
    }
}
