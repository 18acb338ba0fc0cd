//! JSON interop
//!
//! `Document` and `Value` serialize through serde using the extended JSON
//! shapes below, and [`from_json`] reads the same shapes back.
//!
//! | Value     | JSON                                              |
//! |-----------|---------------------------------------------------|
//! | ObjectId  | `{"$oid": "<24 hex>"}`                            |
//! | DateTime  | `{"$date": <millis>}`                             |
//! | Int64     | `{"$numberLong": "<digits>"}`                     |
//! | Binary    | `{"$binary": {"base64": "..", "subType": "hh"}}`  |
//! | Regex     | `{"$regex": "..", "$options": ".."}`              |
//! | MinKey    | `{"$minKey": 1}`                                  |
//! | MaxKey    | `{"$maxKey": 1}`                                  |

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::error::{DriverError, Result};

use super::{Binary, Document, ObjectId, Regex, Value};

// =============================================================================
// Serialize
// =============================================================================

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn single_entry<S: Serializer, V: Serialize + ?Sized>(
    serializer: S,
    key: &str,
    value: &V,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

#[derive(Serialize)]
struct BinaryJson {
    base64: String,
    #[serde(rename = "subType")]
    sub_type: String,
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Document(d) => d.serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Binary(b) => single_entry(
                serializer,
                "$binary",
                &BinaryJson {
                    base64: STANDARD.encode(&b.bytes),
                    sub_type: format!("{:02x}", b.subtype),
                },
            ),
            Value::ObjectId(oid) => single_entry(serializer, "$oid", &oid.to_hex()),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::DateTime(ms) => single_entry(serializer, "$date", ms),
            Value::Null => serializer.serialize_unit(),
            Value::Regex(r) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$regex", &r.pattern)?;
                map.serialize_entry("$options", &r.options)?;
                map.end()
            }
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Int64(v) => single_entry(serializer, "$numberLong", &v.to_string()),
            Value::MinKey => single_entry(serializer, "$minKey", &1),
            Value::MaxKey => single_entry(serializer, "$maxKey", &1),
        }
    }
}

// =============================================================================
// From JSON
// =============================================================================

/// Convert a JSON object into a document, keeping key order
pub fn from_json(json: Json) -> Result<Document> {
    match json {
        Json::Object(map) => object_to_document(map),
        other => Err(DriverError::TypeMismatch {
            key: "<root>".to_string(),
            expected: "object",
            found: json_type_name(&other),
        }),
    }
}

/// Parse a JSON text into a document
pub fn parse_json(text: &str) -> Result<Document> {
    let json: Json = serde_json::from_str(text)
        .map_err(|e| DriverError::Config(format!("invalid JSON: {}", e)))?;
    from_json(json)
}

fn json_type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn object_to_document(map: Map<String, Json>) -> Result<Document> {
    let mut document = Document::with_capacity(map.len());
    for (key, value) in map {
        let value = value_from_json(&key, value)?;
        // JSON object keys are already unique
        document.push_new(key, value);
    }
    Ok(document)
}

fn value_from_json(key: &str, json: Json) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::Boolean(v),
        Json::Number(n) => match n.as_i64() {
            Some(v) => match i32::try_from(v) {
                Ok(small) => Value::Int32(small),
                Err(_) => Value::Int64(v),
            },
            None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| value_from_json(key, item))
                .collect::<Result<_>>()?,
        ),
        Json::Object(map) => match extended_value(key, &map)? {
            Some(value) => value,
            None => Value::Document(object_to_document(map)?),
        },
    })
}

fn bad_extended(key: &str, what: &str) -> DriverError {
    DriverError::Config(format!("field '{}': malformed {}", key, what))
}

/// Recognise the extended JSON wrappers; `None` for ordinary objects
fn extended_value(key: &str, map: &Map<String, Json>) -> Result<Option<Value>> {
    let first = match map.keys().next() {
        Some(first) if first.starts_with('$') => first.as_str(),
        _ => return Ok(None),
    };

    let value = match (first, map.len()) {
        ("$oid", 1) => {
            let hex = map[first].as_str().ok_or_else(|| bad_extended(key, "$oid"))?;
            Value::ObjectId(ObjectId::parse_str(hex)?)
        }
        ("$date", 1) => {
            let ms = match &map[first] {
                Json::Number(n) => n.as_i64(),
                Json::Object(inner) => inner
                    .get("$numberLong")
                    .and_then(Json::as_str)
                    .and_then(|s| s.parse().ok()),
                _ => None,
            };
            Value::DateTime(ms.ok_or_else(|| bad_extended(key, "$date"))?)
        }
        ("$numberLong", 1) => {
            let v = map[first]
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| bad_extended(key, "$numberLong"))?;
            Value::Int64(v)
        }
        ("$binary", 1) => {
            let inner = map[first]
                .as_object()
                .ok_or_else(|| bad_extended(key, "$binary"))?;
            let data = inner
                .get("base64")
                .and_then(Json::as_str)
                .ok_or_else(|| bad_extended(key, "$binary.base64"))?;
            let subtype = inner
                .get("subType")
                .and_then(Json::as_str)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| bad_extended(key, "$binary.subType"))?;
            let bytes = STANDARD
                .decode(data)
                .map_err(|e| DriverError::Config(format!("field '{}': {}", key, e)))?;
            Value::Binary(Binary { subtype, bytes })
        }
        ("$regex", 1) | ("$regex", 2) => {
            let pattern = map[first]
                .as_str()
                .ok_or_else(|| bad_extended(key, "$regex"))?;
            let options = match map.get("$options") {
                Some(options) => options
                    .as_str()
                    .ok_or_else(|| bad_extended(key, "$options"))?,
                None if map.len() == 1 => "",
                // Two keys but the second is not $options: an operator document
                None => return Ok(None),
            };
            Value::Regex(Regex::new(pattern, options))
        }
        ("$minKey", 1) => Value::MinKey,
        ("$maxKey", 1) => Value::MaxKey,
        // Query operators such as {"$gt": 5} stay ordinary documents
        _ => return Ok(None),
    };

    Ok(Some(value))
}
