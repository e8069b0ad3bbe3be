use crate::{Document, FieldValue};

/// Sort direction of an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A single equality condition on a document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: FieldValue,
}

/// A single-field sort.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A collection-scoped query: zero or more equality filters, combined with
/// an optional single-field sort. This is the entire query surface the
/// store exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: vec![],
            order: None,
        }
    }

    /// Adds an equality filter on the given field.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });

        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });

        self
    }

    /// Returns true if the document satisfies every filter.
    pub fn matches(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|filter| document.field(&filter.field) == Some(&filter.value))
    }

    /// Sorts a snapshot in the declared order. Documents missing the sort
    /// field order first, the way the backend treats them. The sort is
    /// stable, so equal keys keep their incoming order.
    pub fn sort(&self, documents: &mut [Document]) {
        let Some(order) = &self.order else {
            return;
        };

        documents.sort_by(|a, b| {
            let left = a.field(&order.field).unwrap_or(&FieldValue::Null);
            let right = b.field(&order.field).unwrap_or(&FieldValue::Null);

            let ordering = left.compare(right);

            match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fields_from_json;
    use serde_json::json;

    fn document(id: &str, value: serde_json::Value) -> Document {
        Document::new(id, fields_from_json(value))
    }

    fn ids(documents: &[Document]) -> Vec<&str> {
        documents.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn matches_all_filters() {
        let query = Query::collection("assignments")
            .where_eq("massDateId", "m1")
            .where_eq("role", "acolyte");

        let hit = document("a", json!({ "massDateId": "m1", "role": "acolyte" }));
        let wrong_value = document("b", json!({ "massDateId": "m2", "role": "acolyte" }));
        let missing_field = document("c", json!({ "role": "acolyte" }));
        let wrong_type = document("d", json!({ "massDateId": 1, "role": "acolyte" }));

        assert!(query.matches(&hit));
        assert!(!query.matches(&wrong_value));
        assert!(!query.matches(&missing_field));
        assert!(!query.matches(&wrong_type));
    }

    #[test]
    fn sorts_ascending_with_missing_fields_first() {
        let query = Query::collection("students").order_by("name", Direction::Ascending);

        let mut documents = vec![
            document("b", json!({ "name": "Miriam" })),
            document("a", json!({ "name": "Ana" })),
            document("x", json!({})),
        ];

        query.sort(&mut documents);

        assert_eq!(ids(&documents), vec!["x", "a", "b"]);
    }

    #[test]
    fn sorts_descending() {
        let query = Query::collection("students").order_by("order", Direction::Descending);

        let mut documents = vec![
            document("a", json!({ "order": 1 })),
            document("c", json!({ "order": 3 })),
            document("b", json!({ "order": 2 })),
        ];

        query.sort(&mut documents);

        assert_eq!(ids(&documents), vec!["c", "b", "a"]);
    }

    #[test]
    fn unordered_queries_keep_incoming_order() {
        let query = Query::collection("students");

        let mut documents = vec![
            document("b", json!({ "name": "Miriam" })),
            document("a", json!({ "name": "Ana" })),
        ];

        query.sort(&mut documents);

        assert_eq!(ids(&documents), vec!["b", "a"]);
    }
}
