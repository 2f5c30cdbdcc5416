// Mapper between domain models and Firestore REST typed values
use crate::domain::device::{AccessType, DeviceAccessGrant, HistoryRecord, TankDataPoint};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Firestore document as returned by the REST API.
#[derive(Debug, Deserialize)]
pub struct FirestoreDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl FirestoreDocument {
    /// Last path segment of the document name
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    pub fn string_field(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(as_string)
    }
}

pub fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

pub fn double_value(value: f64) -> Value {
    json!({ "doubleValue": value })
}

pub fn map_value(fields: Map<String, Value>) -> Value {
    json!({ "mapValue": { "fields": fields } })
}

pub fn as_string(value: &Value) -> Option<String> {
    value.get("stringValue")?.as_str().map(str::to_string)
}

pub fn encode_data_point(point: &TankDataPoint) -> Value {
    let mut fields = Map::new();
    fields.insert("timestamp".to_string(), string_value(&point.timestamp));
    fields.insert("level".to_string(), double_value(point.level));
    map_value(fields)
}

pub fn encode_history(record: &HistoryRecord) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("timestamp".to_string(), string_value(&record.timestamp));
    fields.insert("level".to_string(), double_value(record.level));
    fields.insert("distance".to_string(), double_value(record.distance));
    fields
}

pub fn decode_access_grant(doc: &FirestoreDocument) -> DeviceAccessGrant {
    DeviceAccessGrant::new(
        doc.string_field("deviceId").unwrap_or_default(),
        doc.string_field("userId"),
        AccessType::parse(&doc.string_field("accessType").unwrap_or_default()),
    )
}
