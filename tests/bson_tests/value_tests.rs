//! Document and Value Tests
//!
//! These tests verify:
//! - Insertion order is kept through insert/replace/remove
//! - Typed accessors fail explicitly instead of coercing
//! - The doc! macro and conversions

use docwire::bson::{Binary, Document, ElementType, Value};
use docwire::{doc, DriverError};

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_insertion_order_is_kept() {
    let document = doc! { "b" => 1, "a" => 2, "c" => 3 };
    let keys: Vec<&str> = document.keys().collect();
    assert_eq!(keys, vec!["b", "a", "c"]);
    assert_eq!(document.first_key(), Some("b"));
}

#[test]
fn test_replacing_a_key_keeps_its_position() {
    let mut document = doc! { "x" => 1, "y" => 2, "z" => 3 };
    let previous = document.insert("y", "two");

    assert_eq!(previous, Some(Value::Int32(2)));
    assert_eq!(document.keys().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    assert_eq!(document.get("y"), Some(&Value::String("two".into())));
    assert_eq!(document.len(), 3);
}

#[test]
fn test_remove_shifts_later_keys() {
    let mut document = doc! { "a" => 1, "b" => 2, "c" => 3 };
    assert_eq!(document.remove("b"), Some(Value::Int32(2)));
    assert_eq!(document.remove("missing"), None);
    assert_eq!(document.keys().collect::<Vec<_>>(), vec!["a", "c"]);
}

#[test]
fn test_from_iterator_and_into_iterator() {
    let document: Document = vec![("one", 1), ("two", 2)].into_iter().collect();
    let pairs: Vec<(String, Value)> = document.into_iter().collect();
    assert_eq!(
        pairs,
        vec![
            ("one".to_string(), Value::Int32(1)),
            ("two".to_string(), Value::Int32(2))
        ]
    );
}

#[test]
fn test_get_mut_updates_in_place() {
    let mut document = doc! { "count" => 1 };
    if let Some(Value::Int32(n)) = document.get_mut("count") {
        *n += 1;
    }
    assert_eq!(document.get_i32("count").unwrap(), 2);
}

// =============================================================================
// Typed Accessors
// =============================================================================

#[test]
fn test_typed_accessors() {
    let document = doc! {
        "name" => "ada",
        "age" => 36,
        "big" => 1i64 << 40,
        "score" => 9.5,
        "active" => true,
        "nested" => doc! { "k" => "v" },
        "tags" => vec!["a", "b"],
        "blob" => Binary::new(vec![1u8, 2, 3]),
    };

    assert_eq!(document.get_str("name").unwrap(), "ada");
    assert_eq!(document.get_i32("age").unwrap(), 36);
    assert_eq!(document.get_i64("big").unwrap(), 1i64 << 40);
    assert_eq!(document.get_f64("score").unwrap(), 9.5);
    assert!(document.get_bool("active").unwrap());
    assert_eq!(document.get_document("nested").unwrap().get_str("k").unwrap(), "v");
    assert_eq!(document.get_array("tags").unwrap().len(), 2);
    assert_eq!(document.get_binary("blob").unwrap().bytes, vec![1, 2, 3]);
}

#[test]
fn test_accessor_does_not_coerce() {
    let document = doc! { "n" => 5 };

    match document.get_i64("n") {
        Err(DriverError::TypeMismatch {
            key,
            expected,
            found,
        }) => {
            assert_eq!(key, "n");
            assert_eq!(expected, "int64");
            assert_eq!(found, "int32");
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_missing_key_is_reported() {
    let document = Document::new();
    assert!(matches!(
        document.get_str("absent"),
        Err(DriverError::KeyNotFound(key)) if key == "absent"
    ));
}

#[test]
fn test_get_integer_accepts_integral_numbers_only() {
    let document = doc! {
        "int" => 7,
        "long" => 7_000_000_000i64,
        "whole" => 42.0,
        "fraction" => 4.2,
        "text" => "7",
    };

    assert_eq!(document.get_integer("int").unwrap(), 7);
    assert_eq!(document.get_integer("long").unwrap(), 7_000_000_000);
    assert_eq!(document.get_integer("whole").unwrap(), 42);
    assert!(matches!(
        document.get_integer("fraction"),
        Err(DriverError::TypeMismatch { .. })
    ));
    assert!(matches!(
        document.get_integer("text"),
        Err(DriverError::TypeMismatch { .. })
    ));
}

#[test]
fn test_lossless_conversion_rejects_out_of_range_doubles() {
    assert_eq!(Value::Double(f64::NAN).to_i64_lossless(), None);
    assert_eq!(Value::Double(1e30).to_i64_lossless(), None);
    assert_eq!(Value::Double(-3.0).to_i64_lossless(), Some(-3));
    assert_eq!(Value::Int32(3).to_f64(), Some(3.0));
    assert_eq!(Value::Null.to_f64(), None);
}

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn test_conversions_pick_expected_variants() {
    assert_eq!(Value::from(1).element_type(), ElementType::Int32);
    assert_eq!(Value::from(1i64).element_type(), ElementType::Int64);
    assert_eq!(Value::from(1.0).element_type(), ElementType::Double);
    assert_eq!(Value::from("s").element_type(), ElementType::String);
    assert_eq!(Value::from(None::<i32>), Value::Null);
    assert_eq!(Value::from(Some(3)), Value::Int32(3));
    assert_eq!(
        Value::from(vec![1, 2]),
        Value::Array(vec![Value::Int32(1), Value::Int32(2)])
    );
}

#[test]
fn test_element_type_tags() {
    assert_eq!(ElementType::from_u8(0x01), Some(ElementType::Double));
    assert_eq!(ElementType::from_u8(0x12), Some(ElementType::Int64));
    assert_eq!(ElementType::from_u8(0xFF), Some(ElementType::MinKey));
    assert_eq!(ElementType::from_u8(0x7F), Some(ElementType::MaxKey));
    assert_eq!(ElementType::from_u8(0x06), None);
    assert_eq!(ElementType::from_u8(0x00), None);
}

#[test]
fn test_empty_macro() {
    let document = doc! {};
    assert!(document.is_empty());
}
