//! JSON Interop Tests
//!
//! These tests verify:
//! - Documents serialize to extended JSON shapes
//! - JSON input keeps key order and maps numbers to the narrowest type
//! - Extended shapes are read back into typed values

use docwire::bson::{from_json, parse_json, Binary, ObjectId, Regex, Value};
use docwire::{doc, DriverError};
use serde_json::json;

// =============================================================================
// Serialize
// =============================================================================

#[test]
fn test_plain_values_serialize_naturally() {
    let document = doc! {
        "s" => "x",
        "i" => 5,
        "d" => 1.5,
        "b" => true,
        "n" => Value::Null,
        "a" => vec![1, 2],
        "o" => doc! { "k" => "v" },
    };

    let text = serde_json::to_string(&document).unwrap();
    assert_eq!(
        text,
        r#"{"s":"x","i":5,"d":1.5,"b":true,"n":null,"a":[1,2],"o":{"k":"v"}}"#
    );
}

#[test]
fn test_extended_shapes() {
    let oid = ObjectId::from_bytes([0xAB; 12]);
    let document = doc! {
        "oid" => oid,
        "date" => Value::DateTime(1234),
        "long" => 1i64,
        "bin" => Binary::with_subtype(Binary::UUID, vec![1u8, 2, 3]),
        "re" => Regex::new("^x", "m"),
        "min" => Value::MinKey,
        "max" => Value::MaxKey,
    };

    let json = serde_json::to_value(&document).unwrap();
    assert_eq!(
        json,
        json!({
            "oid": { "$oid": "abababababababababababab" },
            "date": { "$date": 1234 },
            "long": { "$numberLong": "1" },
            "bin": { "$binary": { "base64": "AQID", "subType": "03" } },
            "re": { "$regex": "^x", "$options": "m" },
            "min": { "$minKey": 1 },
            "max": { "$maxKey": 1 },
        })
    );
}

// =============================================================================
// From JSON
// =============================================================================

#[test]
fn test_key_order_is_preserved() {
    let document = parse_json(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
    assert_eq!(document.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_number_mapping() {
    let document = parse_json(r#"{"small": 7, "big": 5000000000, "real": 2.5}"#).unwrap();
    assert_eq!(document.get("small"), Some(&Value::Int32(7)));
    assert_eq!(document.get("big"), Some(&Value::Int64(5_000_000_000)));
    assert_eq!(document.get("real"), Some(&Value::Double(2.5)));
}

#[test]
fn test_extended_shapes_round_trip() {
    let original = doc! {
        "oid" => ObjectId::from_bytes([7; 12]),
        "date" => Value::DateTime(-5),
        "long" => 12i64,
        "bin" => Binary::new(vec![0u8, 255]),
        "re" => Regex::new("a+", ""),
        "min" => Value::MinKey,
        "max" => Value::MaxKey,
        "nested" => doc! { "list" => vec![Value::Null, Value::Boolean(false)] },
    };

    let json = serde_json::to_value(&original).unwrap();
    assert_eq!(from_json(json).unwrap(), original);
}

#[test]
fn test_query_operators_stay_documents() {
    let document = parse_json(r#"{"age": {"$gt": 21, "$lt": 65}}"#).unwrap();
    let age = document.get_document("age").unwrap();
    assert_eq!(age.get_i32("$gt").unwrap(), 21);
    assert_eq!(age.get_i32("$lt").unwrap(), 65);
}

#[test]
fn test_regex_with_other_operator_is_a_document() {
    let document = parse_json(r#"{"name": {"$regex": "^a", "$ne": "ab"}}"#).unwrap();
    assert!(document.get_document("name").is_ok());
}

#[test]
fn test_non_object_root() {
    match from_json(json!([1, 2])) {
        Err(DriverError::TypeMismatch { key, found, .. }) => {
            assert_eq!(key, "<root>");
            assert_eq!(found, "array");
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_invalid_input() {
    assert!(matches!(parse_json("{not json"), Err(DriverError::Config(_))));
    assert!(matches!(
        parse_json(r#"{"id": {"$oid": "xyz"}}"#),
        Err(DriverError::Config(_))
    ));
    assert!(matches!(
        parse_json(r#"{"n": {"$numberLong": 5}}"#),
        Err(DriverError::Config(_))
    ));
}
