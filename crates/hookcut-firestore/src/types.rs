//! Firestore REST API types and the JSON bridge used to persist models.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FirestoreError, FirestoreResult};

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
    BytesValue(String),
    ReferenceValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, Value>>,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::StringValue(s.into())
    }

    /// Convert a JSON value into its Firestore representation.
    pub fn from_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::NullValue(()),
            Json::Bool(b) => Value::BooleanValue(b),
            Json::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::IntegerValue(i.to_string()),
                (None, Some(u)) => Value::IntegerValue(u.to_string()),
                _ => Value::DoubleValue(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::StringValue(s),
            Json::Array(items) => Value::ArrayValue(ArrayValue {
                values: Some(items.into_iter().map(Value::from_json).collect()),
            }),
            Json::Object(map) => Value::MapValue(MapValue {
                fields: Some(map.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect()),
            }),
        }
    }

    /// Convert back to plain JSON. Timestamps and references become strings.
    pub fn into_json(self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::NullValue(()) => Json::Null,
            Value::BooleanValue(b) => Json::Bool(b),
            Value::IntegerValue(s) => s
                .parse::<i64>()
                .map(Json::from)
                .or_else(|_| s.parse::<u64>().map(Json::from))
                .unwrap_or(Json::String(s)),
            Value::DoubleValue(f) => serde_json::Number::from_f64(f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::TimestampValue(s)
            | Value::StringValue(s)
            | Value::BytesValue(s)
            | Value::ReferenceValue(s) => Json::String(s),
            Value::ArrayValue(a) => Json::Array(
                a.values
                    .unwrap_or_default()
                    .into_iter()
                    .map(Value::into_json)
                    .collect(),
            ),
            Value::MapValue(m) => Json::Object(fields_to_json(m.fields.unwrap_or_default())),
        }
    }
}

fn fields_to_json(fields: HashMap<String, Value>) -> serde_json::Map<String, serde_json::Value> {
    fields.into_iter().map(|(k, v)| (k, v.into_json())).collect()
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
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

    /// Same as [`Document::new`] but addressed by full resource name, for writes.
    pub fn named(name: String, fields: HashMap<String, Value>) -> Self {
        Self {
            name: Some(name),
            ..Self::new(fields)
        }
    }

    /// Last path segment of the resource name.
    pub fn doc_id(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.rsplit('/').next())
    }

    /// Deserialize the document's fields into a model.
    pub fn to_model<T: DeserializeOwned>(&self) -> FirestoreResult<T> {
        let fields = self.fields.clone().unwrap_or_default();
        let json = serde_json::Value::Object(fields_to_json(fields));
        serde_json::from_value(json).map_err(|e| {
            FirestoreError::serialization(format!(
                "{}: {}",
                self.name.as_deref().unwrap_or("document"),
                e
            ))
        })
    }
}

/// Serialize a model into document fields. The model must serialize to a JSON object.
pub fn fields_from_model<T: Serialize>(model: &T) -> FirestoreResult<HashMap<String, Value>> {
    match serde_json::to_value(model)? {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(v)))
            .collect()),
        other => Err(FirestoreError::serialization(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

// ============================================================================
// Writes and transactions
// ============================================================================

/// A single write operation in a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,

    /// Delete a document by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

impl Write {
    /// Insert that fails if the document already exists.
    pub fn create(doc: Document) -> Self {
        Self {
            update: Some(doc),
            delete: None,
            update_mask: None,
            current_document: Some(Precondition::exists(false)),
        }
    }

    /// Partial update of an existing document.
    pub fn patch(doc: Document, field_paths: &[&str]) -> Self {
        Self {
            update: Some(doc),
            delete: None,
            update_mask: Some(DocumentMask {
                field_paths: field_paths.iter().map(|f| f.to_string()).collect(),
            }),
            current_document: Some(Precondition::exists(true)),
        }
    }

    pub fn delete(name: String) -> Self {
        Self {
            update: None,
            delete: Some(name),
            update_mask: None,
            current_document: None,
        }
    }
}

/// Document field mask for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

/// Precondition for a write operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Precondition {
    pub fn exists(exists: bool) -> Self {
        Self {
            exists: Some(exists),
            update_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginTransactionRequest {
    pub options: TransactionOptions,
}

impl BeginTransactionRequest {
    pub fn read_write() -> Self {
        Self {
            options: TransactionOptions {
                read_write: Some(serde_json::json!({})),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_write: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeginTransactionResponse {
    pub transaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub writes: Vec<Write>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub write_results: Option<Vec<WriteResult>>,
    #[serde(default)]
    pub commit_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub transaction: String,
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

/// One element of the streamed `runQuery` response array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub read_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

impl StructuredQuery {
    /// `SELECT * FROM collection WHERE field == value`.
    pub fn field_equals(collection: &str, field: &str, value: Value) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection.to_string(),
            }],
            filter: Some(Filter {
                field_filter: FieldFilter {
                    field: FieldReference {
                        field_path: field.to_string(),
                    },
                    op: "EQUAL".to_string(),
                    value,
                },
            }),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_filter: FieldFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integers_are_strings_on_the_wire() {
        let v = Value::from_json(json!(42));
        assert_eq!(serde_json::to_value(&v).unwrap(), json!({"integerValue": "42"}));
        assert_eq!(v.into_json(), json!(42));
    }

    #[test]
    fn test_nested_model_survives_document_bridge() {
        let model = json!({
            "hook": "Listen",
            "hookStyle": {"fontSize": 90.5, "position": {"x": 50, "y": 22}},
            "transcript": [{"word": "a", "start": 0.0, "end": 1.5}],
            "failureReason": null
        });
        let fields = fields_from_model(&model).unwrap();
        let doc = Document::named("projects/p/databases/d/documents/clips/c1".into(), fields);
        assert_eq!(doc.doc_id(), Some("c1"));

        let back: serde_json::Value = doc.to_model().unwrap();
        assert_eq!(back["hookStyle"]["fontSize"], json!(90.5));
        assert_eq!(back["hookStyle"]["position"]["x"], json!(50));
        assert_eq!(back["transcript"][0]["end"], json!(1.5));
        assert!(back["failureReason"].is_null());
    }

    #[test]
    fn test_query_serializes_where_clause() {
        let q = StructuredQuery::field_equals("clips", "projectId", Value::string("p1")).with_limit(1);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["from"][0]["collectionId"], "clips");
        assert_eq!(json["where"]["fieldFilter"]["op"], "EQUAL");
        assert_eq!(json["where"]["fieldFilter"]["value"]["stringValue"], "p1");
        assert_eq!(json["limit"], 1);
    }

    #[test]
    fn test_create_write_requires_absence() {
        let w = Write::create(Document::named("x".into(), HashMap::new()));
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["currentDocument"]["exists"], false);
    }
}
