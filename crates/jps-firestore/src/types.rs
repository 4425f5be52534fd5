//! Firestore REST API types.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jps_models::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Firestore document value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String), // base64
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Update time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Last path segment of the resource name.
    pub fn doc_id(&self) -> Option<&str> {
        self.name
            .as_deref()
            .and_then(|n| n.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }

    /// Look up a field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.as_ref().and_then(|f| f.get(key))
    }

    /// Look up and convert a field.
    pub fn get<T: FromFirestoreValue>(&self, key: &str) -> Option<T> {
        self.field(key).and_then(T::from_firestore_value)
    }
}

/// List documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Option<Vec<Document>>,
    pub next_page_token: Option<String>,
}

// ============================================================================
// Structured Query Types
// ============================================================================

/// Request body for `:runQuery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

/// One element of the `:runQuery` response stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

impl StructuredQuery {
    /// Equality on one field, ordered by document id ascending.
    pub fn field_equals(collection: &str, field: &str, value: Value, limit: Option<u32>) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection.to_string(),
                all_descendants: None,
            }],
            r#where: Some(Filter {
                field_filter: Some(FieldFilter {
                    field: FieldReference::new(field),
                    op: "EQUAL".to_string(),
                    value,
                }),
            }),
            order_by: Some(vec![Order {
                field: FieldReference::new(DOCUMENT_ID_FIELD),
                direction: "ASCENDING".to_string(),
            }]),
            limit: limit.map(|l| l.min(i32::MAX as u32) as i32),
        }
    }
}

/// Special field path addressing the document name.
pub const DOCUMENT_ID_FIELD: &str = "__name__";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_descendants: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_filter: Option<FieldFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

impl FieldReference {
    pub fn new(path: &str) -> Self {
        Self {
            field_path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub field: FieldReference,
    pub direction: String,
}

// ============================================================================
// Value Conversion
// ============================================================================

/// Convert a Rust value to Firestore Value.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for u64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339())
    }
}

/// Identifiers are stored in their binary form.
impl ToFirestoreValue for ObjectId {
    fn to_firestore_value(&self) -> Value {
        Value::BytesValue(STANDARD.encode(self.bytes()))
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Vec<T> {
    fn to_firestore_value(&self) -> Value {
        Value::ArrayValue(ArrayValue {
            values: Some(self.iter().map(|v| v.to_firestore_value()).collect()),
        })
    }
}

/// Convert Firestore Value to Rust type.
pub trait FromFirestoreValue: Sized {
    fn from_firestore_value(value: &Value) -> Option<Self>;
}

impl FromFirestoreValue for String {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromFirestoreValue for u64 {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(f) if *f >= 0.0 => Some(*f as u64),
            _ => None,
        }
    }
}

impl FromFirestoreValue for DateTime<Utc> {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::TimestampValue(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into()),
            _ => None,
        }
    }
}

/// Reads the binary form, or a hex string written by other tools.
impl FromFirestoreValue for ObjectId {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::BytesValue(b64) => STANDARD
                .decode(b64)
                .ok()
                .and_then(|bytes| ObjectId::from_slice(&bytes).ok()),
            Value::StringValue(hex) => ObjectId::parse_str(hex).ok(),
            _ => None,
        }
    }
}

/// Arrays convert element-wise; any element that fails to convert fails the whole array.
impl<T: FromFirestoreValue> FromFirestoreValue for Vec<T> {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::ArrayValue(arr) => arr
                .values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(T::from_firestore_value)
                .collect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_round_trips_through_bytes_value() {
        let id = ObjectId::parse_str("650abcde0102030405ff0010").unwrap();
        let value = id.to_firestore_value();
        assert!(matches!(value, Value::BytesValue(_)));
        assert_eq!(ObjectId::from_firestore_value(&value), Some(id));
    }

    #[test]
    fn test_object_id_accepts_hex_string_value() {
        let value = Value::StringValue("650abcde0102030405ff0010".to_string());
        assert_eq!(
            ObjectId::from_firestore_value(&value).map(|id| id.to_hex()),
            Some("650abcde0102030405ff0010".to_string())
        );
        assert_eq!(
            ObjectId::from_firestore_value(&Value::StringValue("bogus".into())),
            None
        );
    }

    #[test]
    fn test_vec_conversion_keeps_order_and_rejects_bad_elements() {
        let ids = vec![ObjectId::new(), ObjectId::new()];
        let value = ids.to_firestore_value();
        assert_eq!(Vec::<ObjectId>::from_firestore_value(&value), Some(ids));

        let empty = Value::ArrayValue(ArrayValue { values: None });
        assert_eq!(Vec::<ObjectId>::from_firestore_value(&empty), Some(vec![]));

        let mixed = Value::ArrayValue(ArrayValue {
            values: Some(vec![Value::BooleanValue(true)]),
        });
        assert_eq!(Vec::<ObjectId>::from_firestore_value(&mixed), None);
    }

    #[test]
    fn test_version_counter_reads_only_non_negative_numbers() {
        let value = 3u64.to_firestore_value();
        assert_eq!(value, Value::IntegerValue("3".into()));
        assert_eq!(u64::from_firestore_value(&value), Some(3));
        assert_eq!(u64::from_firestore_value(&Value::IntegerValue("-1".into())), None);
        assert_eq!(u64::from_firestore_value(&Value::BooleanValue(true)), None);
    }

    #[test]
    fn test_value_wire_format() {
        let json = serde_json::to_value(Value::IntegerValue("7".into())).unwrap();
        assert_eq!(json, serde_json::json!({"integerValue": "7"}));

        let json = serde_json::to_value(Value::NullValue(())).unwrap();
        assert_eq!(json, serde_json::json!({"nullValue": null}));
    }

    #[test]
    fn test_field_equals_query_shape() {
        let query = StructuredQuery::field_equals(
            "recruiters",
            "email",
            "a@b.co".to_firestore_value(),
            Some(1),
        );
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["from"][0]["collectionId"], "recruiters");
        assert_eq!(json["where"]["fieldFilter"]["field"]["fieldPath"], "email");
        assert_eq!(json["where"]["fieldFilter"]["op"], "EQUAL");
        assert_eq!(json["orderBy"][0]["field"]["fieldPath"], "__name__");
        assert_eq!(json["limit"], 1);
    }

    #[test]
    fn test_doc_id_is_last_path_segment() {
        let mut doc = Document::new(HashMap::new());
        assert_eq!(doc.doc_id(), None);
        doc.name = Some("projects/p/databases/(default)/documents/jobs/abc".into());
        assert_eq!(doc.doc_id(), Some("abc"));
    }
}
