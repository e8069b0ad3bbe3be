use chrono::{DateTime, Utc};

use crate::{FieldValue, Fields};

/// The type used for document identifiers in the store.
pub type DocumentId = String;

/// A raw document as the store delivers it: an external key plus a
/// schema-flexible field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the field as text, if it is present and textual.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.field(name) {
            Some(FieldValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the field as text, or an empty string when it is absent or
    /// not textual.
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.field(name) {
            Some(FieldValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        match self.field(name) {
            Some(FieldValue::Double(value)) => Some(*value),
            Some(FieldValue::Integer(value)) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.field(name) {
            Some(FieldValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Decodes a backend timestamp into the application-native form.
    ///
    /// Absent, null, mistyped, and still-pending (`ServerTime`) fields all
    /// decode to `None`. A partially written document is an expected state
    /// while a write propagates, never an error.
    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.field(name) {
            Some(FieldValue::Timestamp(value)) => value.to_datetime(),
            _ => None,
        }
    }

    /// Returns the field as a list of strings, skipping non-text entries.
    pub fn text_list(&self, name: &str) -> Vec<String> {
        match self.field(name) {
            Some(FieldValue::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    FieldValue::Text(value) => Some(value.clone()),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }
}

/// A domain record that can be decoded from a stored document.
///
/// Decoding is total: a partial or malformed document decodes to a record
/// with the affected fields unset, and the record id is always taken from
/// the document's external key, even if the field map happens to carry an
/// `id` field of its own.
pub trait FromDocument: Sized {
    /// The collection this record lives in.
    const COLLECTION: &'static str;

    fn from_document(document: &Document) -> Self;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fields_from_json;
    use serde_json::json;

    #[test]
    fn reads_typed_fields() {
        let document = Document::new(
            "a",
            fields_from_json(json!({
                "name": "Ana",
                "order": 2,
                "active": true,
                "roles": ["acolyte", 7, "lector"],
            })),
        );

        assert_eq!(document.text("name"), Some("Ana"));
        assert_eq!(document.integer("order"), Some(2));
        assert_eq!(document.boolean("active"), Some(true));
        assert_eq!(document.text_list("roles"), vec!["acolyte", "lector"]);
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let document = Document::new("a", fields_from_json(json!({ "name": 42 })));

        assert_eq!(document.text("name"), None);
        assert_eq!(document.text_or_empty("name"), "");
        assert_eq!(document.boolean("name"), None);
        assert_eq!(document.text_list("name"), Vec::<String>::new());
    }

    #[test]
    fn unresolved_timestamps_read_as_absent() {
        let mut fields = fields_from_json(json!({ "note": null }));
        fields.insert("createdAt".to_string(), FieldValue::ServerTime);

        let document = Document::new("a", fields);

        assert_eq!(document.timestamp("createdAt"), None);
        assert_eq!(document.timestamp("updatedAt"), None);
        assert_eq!(document.timestamp("note"), None);
    }

    #[test]
    fn resolved_timestamps_read_back() {
        let instant = chrono::Utc::now();

        let mut fields = Fields::new();
        fields.insert("createdAt".to_string(), instant.into());

        let document = Document::new("a", fields);

        assert_eq!(document.timestamp("createdAt"), Some(instant));
    }
}
