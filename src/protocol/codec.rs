//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Header (all messages)
//! ```text
//! ┌──────────┬──────────────┬───────────────┬──────────┐
//! │ Len (4)  │ RequestID (4)│ ResponseTo (4)│ OpCode(4)│
//! └──────────┴──────────────┴───────────────┴──────────┘
//! ```
//!
//! ### Body by OpCode
//! - INSERT:       flags (4) + namespace + document*
//! - UPDATE:       ZERO (4) + namespace + flags (4) + selector + update
//! - DELETE:       ZERO (4) + namespace + flags (4) + selector
//! - QUERY:        flags (4) + namespace + skip (4) + return (4) + query [+ fields]
//! - GET_MORE:     ZERO (4) + namespace + return (4) + cursorID (8)
//! - KILL_CURSORS: ZERO (4) + count (4) + cursorID (8)*
//! - REPLY:        flags (4) + cursorID (8) + startingFrom (4) + count (4) + document*
//!
//! Integers are little-endian; namespaces are NUL-terminated "db.collection".

use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};

use crate::bson::reader::{ByteReader, ReadError};
use crate::bson::{self, Document};
use crate::error::{DriverError, Result};

use super::header::check_length;
use super::{
    Delete, DeleteFlags, GetMore, Insert, KillCursors, Message, MessageHeader, OpCode, Query,
    QueryFlags, Reply, ResponseFlags, Update, UpdateFlags, HEADER_SIZE,
};

// =============================================================================
// Framing
// =============================================================================

/// Reserve the header; the length is only known once the body is written
fn begin_frame(capacity: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + capacity);
    buf.put_bytes(0, HEADER_SIZE);
    buf
}

fn finish_frame(mut buf: BytesMut, request_id: i32, response_to: i32, op_code: OpCode) -> Vec<u8> {
    let header = MessageHeader {
        message_length: buf.len() as i32,
        request_id,
        response_to,
        op_code,
    };
    header.write(&mut buf[..HEADER_SIZE]);
    buf.to_vec()
}

fn truncated(context: &str, err: ReadError) -> DriverError {
    DriverError::Protocol(format!("{}: {}", context, err))
}

/// Decode one embedded document and advance past it
fn read_document(reader: &mut ByteReader<'_>) -> Result<Document> {
    let (document, consumed) = bson::decode(reader.rest())?;
    reader
        .advance(consumed)
        .map_err(|e| truncated("document", e))?;
    Ok(document)
}

/// Split a complete frame into its header and body, checking the length word
fn split_frame(bytes: &[u8]) -> Result<(MessageHeader, &[u8])> {
    let header = MessageHeader::parse(bytes)?;
    let length = header.message_length as usize;
    if bytes.len() != length {
        return Err(DriverError::Protocol(format!(
            "Frame length mismatch: header says {} bytes, got {}",
            length,
            bytes.len()
        )));
    }
    Ok((header, &bytes[HEADER_SIZE..]))
}

// =============================================================================
// Message Encoding/Decoding
// =============================================================================

/// Encode a client message with the given request id
pub fn encode_message(request_id: i32, message: &Message) -> Result<Vec<u8>> {
    let mut buf = begin_frame(64);

    match message {
        Message::Insert(m) => {
            buf.put_i32_le(m.flags);
            bson::write_cstring(&mut buf, "namespace", &m.namespace)?;
            for document in &m.documents {
                bson::encode_into(document, &mut buf)?;
            }
        }
        Message::Update(m) => {
            buf.put_i32_le(0);
            bson::write_cstring(&mut buf, "namespace", &m.namespace)?;
            buf.put_i32_le(m.flags.bits());
            bson::encode_into(&m.selector, &mut buf)?;
            bson::encode_into(&m.update, &mut buf)?;
        }
        Message::Delete(m) => {
            buf.put_i32_le(0);
            bson::write_cstring(&mut buf, "namespace", &m.namespace)?;
            buf.put_i32_le(m.flags.bits());
            bson::encode_into(&m.selector, &mut buf)?;
        }
        Message::Query(m) => {
            buf.put_i32_le(m.flags.bits());
            bson::write_cstring(&mut buf, "namespace", &m.namespace)?;
            buf.put_i32_le(m.number_to_skip);
            buf.put_i32_le(m.number_to_return);
            bson::encode_into(&m.query, &mut buf)?;
            if let Some(fields) = &m.fields {
                bson::encode_into(fields, &mut buf)?;
            }
        }
        Message::GetMore(m) => {
            buf.put_i32_le(0);
            bson::write_cstring(&mut buf, "namespace", &m.namespace)?;
            buf.put_i32_le(m.number_to_return);
            buf.put_i64_le(m.cursor_id);
        }
        Message::KillCursors(m) => {
            buf.put_i32_le(0);
            buf.put_i32_le(m.cursor_ids.len() as i32);
            for id in &m.cursor_ids {
                buf.put_i64_le(*id);
            }
        }
    }

    Ok(finish_frame(buf, request_id, 0, message.op_code()))
}

/// Decode a complete client message frame
pub fn decode_message(bytes: &[u8]) -> Result<(MessageHeader, Message)> {
    let (header, body) = split_frame(bytes)?;
    let mut reader = ByteReader::new(body);

    let message = match header.op_code {
        OpCode::Insert => decode_insert(&mut reader)?,
        OpCode::Update => decode_update(&mut reader)?,
        OpCode::Delete => decode_delete(&mut reader)?,
        OpCode::Query => decode_query(&mut reader)?,
        OpCode::GetMore => decode_get_more(&mut reader)?,
        OpCode::KillCursors => decode_kill_cursors(&mut reader)?,
        OpCode::Reply => {
            return Err(DriverError::Protocol(
                "Reply opcode in a client message".to_string(),
            ))
        }
    };

    if !reader.is_empty() {
        return Err(DriverError::Protocol(format!(
            "{:?} message: {} trailing bytes",
            header.op_code,
            reader.remaining()
        )));
    }

    Ok((header, message))
}

fn read_namespace(reader: &mut ByteReader<'_>) -> Result<String> {
    reader
        .read_cstring()
        .map(str::to_string)
        .map_err(|e| truncated("namespace", e))
}

fn read_word(reader: &mut ByteReader<'_>, what: &str) -> Result<i32> {
    reader.read_i32().map_err(|e| truncated(what, e))
}

fn decode_insert(reader: &mut ByteReader<'_>) -> Result<Message> {
    let flags = read_word(reader, "INSERT flags")?;
    let namespace = read_namespace(reader)?;
    let mut documents = Vec::new();
    while !reader.is_empty() {
        documents.push(read_document(reader)?);
    }
    Ok(Message::Insert(Insert {
        flags,
        namespace,
        documents,
    }))
}

fn decode_update(reader: &mut ByteReader<'_>) -> Result<Message> {
    read_word(reader, "UPDATE reserved word")?;
    let namespace = read_namespace(reader)?;
    let flags = UpdateFlags(read_word(reader, "UPDATE flags")?);
    let selector = read_document(reader)?;
    let update = read_document(reader)?;
    Ok(Message::Update(Update {
        namespace,
        flags,
        selector,
        update,
    }))
}

fn decode_delete(reader: &mut ByteReader<'_>) -> Result<Message> {
    read_word(reader, "DELETE reserved word")?;
    let namespace = read_namespace(reader)?;
    let flags = DeleteFlags(read_word(reader, "DELETE flags")?);
    let selector = read_document(reader)?;
    Ok(Message::Delete(Delete {
        namespace,
        flags,
        selector,
    }))
}

fn decode_query(reader: &mut ByteReader<'_>) -> Result<Message> {
    let flags = QueryFlags(read_word(reader, "QUERY flags")?);
    let namespace = read_namespace(reader)?;
    let number_to_skip = read_word(reader, "QUERY numberToSkip")?;
    let number_to_return = read_word(reader, "QUERY numberToReturn")?;
    let query = read_document(reader)?;
    let fields = if reader.is_empty() {
        None
    } else {
        Some(read_document(reader)?)
    };
    Ok(Message::Query(Query {
        flags,
        namespace,
        number_to_skip,
        number_to_return,
        query,
        fields,
    }))
}

fn decode_get_more(reader: &mut ByteReader<'_>) -> Result<Message> {
    read_word(reader, "GET_MORE reserved word")?;
    let namespace = read_namespace(reader)?;
    let number_to_return = read_word(reader, "GET_MORE numberToReturn")?;
    let cursor_id = reader
        .read_i64()
        .map_err(|e| truncated("GET_MORE cursorID", e))?;
    Ok(Message::GetMore(GetMore {
        namespace,
        number_to_return,
        cursor_id,
    }))
}

fn decode_kill_cursors(reader: &mut ByteReader<'_>) -> Result<Message> {
    read_word(reader, "KILL_CURSORS reserved word")?;
    let count = read_word(reader, "KILL_CURSORS count")?;
    if count < 0 || count as usize > reader.remaining() / 8 {
        return Err(DriverError::Protocol(format!(
            "KILL_CURSORS: count {} does not match {} remaining bytes",
            count,
            reader.remaining()
        )));
    }
    let cursor_ids = (0..count)
        .map(|_| {
            reader
                .read_i64()
                .map_err(|e| truncated("KILL_CURSORS cursorID", e))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Message::KillCursors(KillCursors { cursor_ids }))
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply answering `response_to`
pub fn encode_reply(request_id: i32, response_to: i32, reply: &Reply) -> Result<Vec<u8>> {
    let mut buf = begin_frame(20 + 64 * reply.documents.len());
    buf.put_i32_le(reply.flags.0);
    buf.put_i64_le(reply.cursor_id);
    buf.put_i32_le(reply.starting_from);
    buf.put_i32_le(reply.number_returned());
    for document in &reply.documents {
        bson::encode_into(document, &mut buf)?;
    }
    Ok(finish_frame(buf, request_id, response_to, OpCode::Reply))
}

/// Decode a complete reply frame
pub fn decode_reply(bytes: &[u8]) -> Result<(MessageHeader, Reply)> {
    let (header, body) = split_frame(bytes)?;
    if header.op_code != OpCode::Reply {
        return Err(DriverError::Protocol(format!(
            "Expected a reply, got {:?}",
            header.op_code
        )));
    }

    let mut reader = ByteReader::new(body);
    let flags = ResponseFlags(read_word(&mut reader, "REPLY responseFlags")?);
    let cursor_id = reader
        .read_i64()
        .map_err(|e| truncated("REPLY cursorID", e))?;
    let starting_from = read_word(&mut reader, "REPLY startingFrom")?;
    let number_returned = read_word(&mut reader, "REPLY numberReturned")?;

    if number_returned < 0 {
        return Err(DriverError::Protocol(format!(
            "REPLY: negative numberReturned {}",
            number_returned
        )));
    }

    let mut documents = Vec::with_capacity((number_returned as usize).min(1024));
    for _ in 0..number_returned {
        if reader.is_empty() {
            return Err(DriverError::Protocol(format!(
                "REPLY: numberReturned is {} but only {} documents present",
                number_returned,
                documents.len()
            )));
        }
        documents.push(read_document(&mut reader)?);
    }

    if !reader.is_empty() {
        return Err(DriverError::Protocol(format!(
            "REPLY: {} bytes left after {} documents",
            reader.remaining(),
            number_returned
        )));
    }

    Ok((
        header,
        Reply {
            flags,
            cursor_id,
            starting_from,
            documents,
        },
    ))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one whole frame: the length word first, then exactly the rest
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut length_word = [0u8; 4];
    reader.read_exact(&mut length_word)?;
    let length = check_length(i32::from_le_bytes(length_word))?;

    let mut frame = vec![0u8; length];
    frame[..4].copy_from_slice(&length_word);
    reader.read_exact(&mut frame[4..])?;
    Ok(frame)
}

/// Read a complete client message from a stream
///
/// Blocks until a complete message is received or an error occurs
pub fn read_message<R: Read>(reader: &mut R) -> Result<(MessageHeader, Message)> {
    let frame = read_frame(reader)?;
    decode_message(&frame)
}

/// Write a client message to a stream
pub fn write_message<W: Write>(writer: &mut W, request_id: i32, message: &Message) -> Result<()> {
    let bytes = encode_message(request_id, message)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete reply from a stream
pub fn read_reply<R: Read>(reader: &mut R) -> Result<(MessageHeader, Reply)> {
    let frame = read_frame(reader)?;
    decode_reply(&frame)
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(
    writer: &mut W,
    request_id: i32,
    response_to: i32,
    reply: &Reply,
) -> Result<()> {
    let bytes = encode_reply(request_id, response_to, reply)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
