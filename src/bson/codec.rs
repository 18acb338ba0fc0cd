//! Document codec
//!
//! ## Document Layout
//! ```text
//! ┌───────────┬──────────────────────────────────────────┬──────────┐
//! │ Len (4 LE)│ Element*                                 │ 0x00     │
//! └───────────┴──────────────────────────────────────────┴──────────┘
//!
//! Element: ┌─────────┬──────────────┬──────────────────────┐
//!          │ Tag (1) │ Key (cstring)│ Payload (per tag)    │
//!          └─────────┴──────────────┴──────────────────────┘
//! ```
//!
//! `Len` counts itself and the terminator. Arrays use the same layout with
//! keys "0", "1", ...
//!
//! ### Payloads
//! - double:   8 bytes LE
//! - string:   len (4, includes NUL) + UTF-8 + NUL
//! - document / array: nested document
//! - binary:   len (4) + subtype (1) + bytes
//! - objectId: 12 bytes
//! - bool:     1 byte (0 or 1)
//! - datetime: int64 millis
//! - null, minKey, maxKey: empty
//! - regex:    cstring pattern + cstring options
//! - int32 / int64: 4 / 8 bytes LE

use std::collections::HashSet;

use bytes::{BufMut, BytesMut};

use crate::error::{DriverError, Result};

use super::reader::{ByteReader, ReadError};
use super::{Binary, Document, ElementType, ObjectId, Regex, Value};

/// Smallest possible document: length word plus terminator
pub const MIN_DOCUMENT_SIZE: usize = 5;

/// Nesting limit for decoding
pub const MAX_NESTING_DEPTH: usize = 100;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a document to bytes.
///
/// Fails with `InvalidDocument` if a key or regex contains a NUL byte, since
/// C strings on the wire cannot carry one.
pub fn encode(document: &Document) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(64);
    encode_into(document, &mut buf)?;
    Ok(buf.to_vec())
}

/// Append the encoding of a document to an existing buffer.
///
/// On error `buf` may hold a partial document and should be discarded.
pub fn encode_into(document: &Document, buf: &mut BytesMut) -> Result<()> {
    let start = begin_document(buf);
    for (key, value) in document {
        write_element(buf, key, value)?;
    }
    finish_document(buf, start);
    Ok(())
}

/// Reserve the length word; returns its offset
fn begin_document(buf: &mut BytesMut) -> usize {
    let start = buf.len();
    buf.put_i32_le(0);
    start
}

/// Write the terminator, then patch the length word now that the size is known
fn finish_document(buf: &mut BytesMut, start: usize) {
    buf.put_u8(0);
    let len = (buf.len() - start) as i32;
    buf[start..start + 4].copy_from_slice(&len.to_le_bytes());
}

fn write_array(buf: &mut BytesMut, items: &[Value]) -> Result<()> {
    let start = begin_document(buf);
    for (index, value) in items.iter().enumerate() {
        write_element(buf, &index.to_string(), value)?;
    }
    finish_document(buf, start);
    Ok(())
}

/// Write a NUL-terminated string, refusing one with an interior NUL
pub(crate) fn write_cstring(buf: &mut BytesMut, what: &str, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(DriverError::InvalidDocument(format!(
            "{} {:?} contains a NUL byte",
            what, s
        )));
    }
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
    Ok(())
}

fn write_string(buf: &mut BytesMut, s: &str) {
    buf.put_i32_le(s.len() as i32 + 1);
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
}

fn write_element(buf: &mut BytesMut, key: &str, value: &Value) -> Result<()> {
    buf.put_u8(value.element_type() as u8);
    write_cstring(buf, "key", key)?;

    match value {
        Value::Double(v) => buf.put_f64_le(*v),
        Value::String(s) => write_string(buf, s),
        Value::Document(d) => encode_into(d, buf)?,
        Value::Array(items) => write_array(buf, items)?,
        Value::Binary(b) => {
            buf.put_i32_le(b.bytes.len() as i32);
            buf.put_u8(b.subtype);
            buf.put_slice(&b.bytes);
        }
        Value::ObjectId(oid) => buf.put_slice(&oid.bytes()),
        Value::Boolean(v) => buf.put_u8(u8::from(*v)),
        Value::DateTime(ms) => buf.put_i64_le(*ms),
        Value::Null | Value::MinKey | Value::MaxKey => {}
        Value::Regex(r) => {
            write_cstring(buf, "regex pattern", &r.pattern)?;
            write_cstring(buf, "regex options", &r.options)?;
        }
        Value::Int32(v) => buf.put_i32_le(*v),
        Value::Int64(v) => buf.put_i64_le(*v),
    }
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one document from the front of `bytes`.
///
/// Returns the document and the number of bytes it occupied. Bytes after the
/// declared length are left untouched.
pub fn decode(bytes: &[u8]) -> Result<(Document, usize)> {
    let (document, consumed) = read_document(bytes, 0)?;
    Ok((document, consumed))
}

fn malformed(context: &str, err: ReadError) -> DriverError {
    DriverError::MalformedDocument(format!("{}: {}", context, err))
}

/// Slice out one document by its length prefix and parse its elements
fn read_document(bytes: &[u8], depth: usize) -> Result<(Document, usize)> {
    let body = document_body(bytes, depth)?;
    let mut reader = ByteReader::new(body);
    let mut document = Document::new();
    let mut seen = HashSet::new();

    loop {
        let tag = reader
            .read_u8()
            .map_err(|e| malformed("missing document terminator", e))?;
        if tag == 0 {
            break;
        }
        let key = reader
            .read_cstring()
            .map_err(|e| malformed("element key", e))?;
        if !seen.insert(key) {
            return Err(DriverError::MalformedDocument(format!(
                "duplicate key '{}'",
                key
            )));
        }
        let value = read_value(&mut reader, tag, key, depth)?;
        document.push_new(key.to_string(), value);
    }

    if !reader.is_empty() {
        return Err(DriverError::MalformedDocument(format!(
            "declared length {} but terminator found {} bytes early",
            body.len() + 4,
            reader.remaining()
        )));
    }

    Ok((document, body.len() + 4))
}

/// Validate the length prefix and return the bytes after it, up to and
/// including the terminator
fn document_body(bytes: &[u8], depth: usize) -> Result<&[u8]> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DriverError::MalformedDocument(format!(
            "nesting deeper than {} levels",
            MAX_NESTING_DEPTH
        )));
    }

    let mut reader = ByteReader::new(bytes);
    let declared = reader
        .read_i32()
        .map_err(|e| malformed("document length", e))?;

    if declared < MIN_DOCUMENT_SIZE as i32 {
        return Err(DriverError::MalformedDocument(format!(
            "declared length {} is below the minimum of {}",
            declared, MIN_DOCUMENT_SIZE
        )));
    }

    let declared = declared as usize;
    if declared > bytes.len() {
        return Err(DriverError::MalformedDocument(format!(
            "declared length {} exceeds the {} bytes available",
            declared,
            bytes.len()
        )));
    }

    Ok(&bytes[4..declared])
}

fn read_array(bytes: &[u8], depth: usize) -> Result<(Vec<Value>, usize)> {
    let body = document_body(bytes, depth)?;
    let mut reader = ByteReader::new(body);
    let mut items = Vec::new();

    loop {
        let tag = reader
            .read_u8()
            .map_err(|e| malformed("missing array terminator", e))?;
        if tag == 0 {
            break;
        }
        // Index keys carry no information beyond position
        let key = reader
            .read_cstring()
            .map_err(|e| malformed("array index", e))?
            .to_string();
        items.push(read_value(&mut reader, tag, &key, depth)?);
    }

    if !reader.is_empty() {
        return Err(DriverError::MalformedDocument(format!(
            "array terminator found {} bytes before its declared end",
            reader.remaining()
        )));
    }

    Ok((items, body.len() + 4))
}

fn read_string(reader: &mut ByteReader<'_>, key: &str) -> Result<String> {
    let len = reader
        .read_i32()
        .map_err(|e| malformed(&format!("string length of '{}'", key), e))?;
    if len < 1 {
        return Err(DriverError::MalformedDocument(format!(
            "string '{}' has invalid length {}",
            key, len
        )));
    }

    let raw = reader
        .take(len as usize)
        .map_err(|e| malformed(&format!("string '{}'", key), e))?;
    let (text, terminator) = raw.split_at(raw.len() - 1);
    if terminator != [0] {
        return Err(DriverError::MalformedDocument(format!(
            "string '{}' is not NUL terminated",
            key
        )));
    }

    String::from_utf8(text.to_vec())
        .map_err(|_| DriverError::MalformedDocument(format!("string '{}' is not UTF-8", key)))
}

fn read_value(reader: &mut ByteReader<'_>, tag: u8, key: &str, depth: usize) -> Result<Value> {
    let element_type = ElementType::from_u8(tag).ok_or_else(|| {
        DriverError::MalformedDocument(format!("unknown type tag 0x{:02x} for '{}'", tag, key))
    })?;
    let field = |e: ReadError| malformed(&format!("value of '{}'", key), e);

    let value = match element_type {
        ElementType::Double => Value::Double(reader.read_f64().map_err(field)?),
        ElementType::String => Value::String(read_string(reader, key)?),
        ElementType::Document => {
            let (document, consumed) = read_document(reader.rest(), depth + 1)?;
            reader.take(consumed).map_err(field)?;
            Value::Document(document)
        }
        ElementType::Array => {
            let (items, consumed) = read_array(reader.rest(), depth + 1)?;
            reader.take(consumed).map_err(field)?;
            Value::Array(items)
        }
        ElementType::Binary => {
            let len = reader.read_i32().map_err(field)?;
            if len < 0 {
                return Err(DriverError::MalformedDocument(format!(
                    "binary '{}' has negative length {}",
                    key, len
                )));
            }
            let subtype = reader.read_u8().map_err(field)?;
            let bytes = reader.take(len as usize).map_err(field)?.to_vec();
            Value::Binary(Binary { subtype, bytes })
        }
        ElementType::ObjectId => {
            Value::ObjectId(ObjectId::from_bytes(reader.read_array().map_err(field)?))
        }
        ElementType::Boolean => match reader.read_u8().map_err(field)? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            other => {
                return Err(DriverError::MalformedDocument(format!(
                    "boolean '{}' has invalid byte 0x{:02x}",
                    key, other
                )))
            }
        },
        ElementType::DateTime => Value::DateTime(reader.read_i64().map_err(field)?),
        ElementType::Null => Value::Null,
        ElementType::Regex => {
            let pattern = reader.read_cstring().map_err(field)?.to_string();
            let options = reader.read_cstring().map_err(field)?.to_string();
            Value::Regex(Regex { pattern, options })
        }
        ElementType::Int32 => Value::Int32(reader.read_i32().map_err(field)?),
        ElementType::Int64 => Value::Int64(reader.read_i64().map_err(field)?),
        ElementType::MinKey => Value::MinKey,
        ElementType::MaxKey => Value::MaxKey,
    };

    Ok(value)
}
