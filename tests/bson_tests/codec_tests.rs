//! Document Codec Tests
//!
//! These tests verify:
//! - Byte-exact encoding of known documents
//! - Every element type survives encode/decode
//! - Truncated and corrupt input is rejected, never partially decoded
//! - Strings the wire cannot carry are refused at encode time
//! - Wide documents decode in linear time

use docwire::bson::{
    decode, encode, Binary, Document, ObjectId, Regex, Value, MAX_NESTING_DEPTH,
};
use std::time::{Duration, Instant};

use docwire::{doc, DriverError};

fn assert_malformed(bytes: &[u8]) {
    match decode(bytes) {
        Err(DriverError::MalformedDocument(_)) => {}
        other => panic!("Expected MalformedDocument, got {:?}", other),
    }
}

// =============================================================================
// Known Encodings
// =============================================================================

#[test]
fn test_hello_world_bytes() {
    let encoded = encode(&doc! { "hello" => "world" }).unwrap();
    assert_eq!(
        encoded,
        b"\x16\x00\x00\x00\x02hello\x00\x06\x00\x00\x00world\x00\x00".to_vec()
    );
}

#[test]
fn test_empty_document_bytes() {
    assert_eq!(encode(&Document::new()).unwrap(), vec![5, 0, 0, 0, 0]);

    let (document, consumed) = decode(&[5, 0, 0, 0, 0]).unwrap();
    assert!(document.is_empty());
    assert_eq!(consumed, 5);
}

#[test]
fn test_int32_element_bytes() {
    let encoded = encode(&doc! { "a" => 1 }).unwrap();
    assert_eq!(encoded, vec![0x0C, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]);
}

#[test]
fn test_keys_encoded_in_insertion_order() {
    let encoded = encode(&doc! { "b" => 1, "a" => 2 }).unwrap();
    let b_at = encoded.iter().position(|&c| c == b'b').unwrap();
    let a_at = encoded.iter().position(|&c| c == b'a').unwrap();
    assert!(b_at < a_at);

    let (decoded, _) = decode(&encoded).unwrap();
    assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["b", "a"]);
}

#[test]
fn test_array_uses_index_keys() {
    let encoded = encode(&doc! { "xs" => vec!["p", "q"] }).unwrap();

    // outer len, tag 0x04, "xs\0", then the inner document
    let inner = &encoded[4 + 1 + 3..];
    assert_eq!(inner[4], 0x02);
    assert_eq!(&inner[5..7], b"0\0");

    assert!(inner.windows(2).skip(7).any(|w| w == b"1\0"));

    let (decoded, _) = decode(&encoded).unwrap();
    assert_eq!(
        decoded.get_array("xs").unwrap(),
        &[Value::String("p".into()), Value::String("q".into())]
    );
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_every_element_type_round_trips() {
    let oid = ObjectId::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    let original = doc! {
        "double" => 3.25,
        "string" => "héllo",
        "document" => doc! { "inner" => 1 },
        "array" => vec![Value::Int32(1), Value::String("two".into()), Value::Null],
        "binary" => Binary::with_subtype(Binary::MD5, vec![0xDE, 0xAD, 0xBE, 0xEF]),
        "oid" => oid,
        "true" => true,
        "false" => false,
        "date" => Value::DateTime(1_700_000_000_123),
        "null" => Value::Null,
        "regex" => Regex::new("^a.*z$", "i"),
        "int32" => i32::MIN,
        "int64" => i64::MAX,
        "min" => Value::MinKey,
        "max" => Value::MaxKey,
        "empty" => "",
    };

    let encoded = encode(&original).unwrap();
    let (decoded, consumed) = decode(&encoded).unwrap();

    assert_eq!(consumed, encoded.len());
    assert_eq!(decoded, original);
    assert_eq!(
        decoded.keys().collect::<Vec<_>>(),
        original.keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_trailing_bytes_are_left_alone() {
    let mut encoded = encode(&doc! { "k" => 1 }).unwrap();
    let len = encoded.len();
    encoded.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

    let (decoded, consumed) = decode(&encoded).unwrap();
    assert_eq!(consumed, len);
    assert_eq!(decoded.get_i32("k").unwrap(), 1);
}

#[test]
fn test_deep_nesting_within_limit() {
    let mut document = doc! { "leaf" => 1 };
    for _ in 0..50 {
        document = doc! { "d" => document };
    }
    let (decoded, _) = decode(&encode(&document).unwrap()).unwrap();
    assert_eq!(decoded, document);
}

#[test]
fn test_nesting_beyond_limit_is_rejected() {
    let mut document = Document::new();
    for _ in 0..MAX_NESTING_DEPTH + 2 {
        document = doc! { "d" => document };
    }
    assert_malformed(&encode(&document).unwrap());
}

// =============================================================================
// Unencodable Documents
// =============================================================================

fn assert_invalid(document: &Document) {
    match encode(document) {
        Err(DriverError::InvalidDocument(message)) => assert!(message.contains("NUL")),
        other => panic!("Expected InvalidDocument, got {:?}", other),
    }
}

#[test]
fn test_nul_in_key_is_refused() {
    let mut document = Document::new();
    document.insert("a\0b", 1);
    assert_invalid(&document);
}

#[test]
fn test_nul_in_nested_key_is_refused() {
    let mut inner = Document::new();
    inner.insert("x\0", 1);
    assert_invalid(&doc! { "ok" => 1, "inner" => inner });
}

#[test]
fn test_nul_in_regex_is_refused() {
    assert_invalid(&doc! { "re" => Regex::new("a\0b", "") });
    assert_invalid(&doc! { "re" => Regex::new("ab", "i\0") });
}

#[test]
fn test_nul_inside_string_value_is_fine() {
    // String values are length-prefixed, so NUL is ordinary content
    let original = doc! { "s" => "a\0b" };
    let (decoded, _) = decode(&encode(&original).unwrap()).unwrap();
    assert_eq!(decoded.get_str("s").unwrap(), "a\0b");
}

// =============================================================================
// Wide Documents
// =============================================================================

/// Hand-build a flat document of `count` int32 fields named k0, k1, ...
fn wide_document_bytes(count: usize, last_key: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    let mut push = |key: &str, n: i32| {
        body.push(0x10);
        body.extend_from_slice(key.as_bytes());
        body.push(0);
        body.extend_from_slice(&n.to_le_bytes());
    };
    for i in 0..count {
        push(&format!("k{}", i), i as i32);
    }
    if let Some(key) = last_key {
        push(key, -1);
    }

    let mut bytes = ((body.len() + 5) as i32).to_le_bytes().to_vec();
    bytes.extend_from_slice(&body);
    bytes.push(0);
    bytes
}

#[test]
fn test_wide_document_decodes_quickly() {
    let bytes = wide_document_bytes(50_000, None);

    let started = Instant::now();
    let (document, consumed) = decode(&bytes).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(consumed, bytes.len());
    assert_eq!(document.len(), 50_000);
    assert_eq!(document.first_key(), Some("k0"));
    assert_eq!(document.get_i32("k49999").unwrap(), 49_999);
    assert!(elapsed < Duration::from_secs(5), "decode took {:?}", elapsed);
}

#[test]
fn test_wide_document_with_late_duplicate() {
    assert_malformed(&wide_document_bytes(10_000, Some("k3")));
}

// =============================================================================
// Malformed Input
// =============================================================================

#[test]
fn test_every_truncation_is_rejected() {
    let encoded = encode(&doc! {
        "s" => "text",
        "n" => 42,
        "d" => doc! { "x" => 1.5 },
        "a" => vec![1, 2, 3],
    })
    .unwrap();

    for cut in 0..encoded.len() {
        assert_malformed(&encoded[..cut]);
    }
}

#[test]
fn test_declared_length_below_minimum() {
    assert_malformed(&[4, 0, 0, 0, 0]);
    assert_malformed(&[0xFF, 0xFF, 0xFF, 0xFF, 0]);
}

#[test]
fn test_declared_length_past_terminator() {
    // Declares 6 bytes but the terminator is at offset 4
    assert_malformed(&[6, 0, 0, 0, 0, 0]);
}

#[test]
fn test_unknown_tag() {
    // tag 0x06 (undefined) is not supported
    assert_malformed(&[8, 0, 0, 0, 0x06, b'k', 0, 0]);
}

#[test]
fn test_bad_boolean_byte() {
    let mut encoded = encode(&doc! { "b" => true }).unwrap();
    // len(4) tag(1) "b\0"(2) then the boolean byte
    assert_eq!(encoded[7], 1);
    encoded[7] = 2;
    assert_malformed(&encoded);
}

#[test]
fn test_string_without_nul_terminator() {
    let mut encoded = encode(&doc! { "s" => "ab" }).unwrap();
    // len(4) tag(1) "s\0"(2) strlen(4) 'a' 'b' NUL
    assert_eq!(encoded[13], 0);
    encoded[13] = b'c';
    assert_malformed(&encoded);
}

#[test]
fn test_invalid_utf8_string() {
    let mut encoded = encode(&doc! { "s" => "ab" }).unwrap();
    encoded[11] = 0xFF;
    assert_malformed(&encoded);
}

#[test]
fn test_zero_string_length() {
    let mut encoded = encode(&doc! { "s" => "ab" }).unwrap();
    encoded[7..11].copy_from_slice(&0i32.to_le_bytes());
    assert_malformed(&encoded);
}

#[test]
fn test_duplicate_keys_are_rejected() {
    let bytes = [
        0x13, 0, 0, 0, //
        0x10, b'k', 0, 1, 0, 0, 0, //
        0x10, b'k', 0, 2, 0, 0, 0, //
        0,
    ];
    assert_malformed(&bytes);
}

#[test]
fn test_nested_length_overrunning_parent() {
    let mut encoded = encode(&doc! { "d" => doc! { "x" => 1 } }).unwrap();
    // Inner document length word starts after len(4) tag(1) "d\0"(2)
    encoded[7] = 0x40;
    assert_malformed(&encoded);
}
