//! Message header
//!
//! Every message in either direction starts with the same 16 bytes.

use crate::error::{DriverError, Result};

/// Header size: length + requestID + responseTo + opCode
pub const HEADER_SIZE: usize = 16;

/// Maximum accepted message size (48 MB)
pub const MAX_MESSAGE_SIZE: usize = 48 * 1024 * 1024;

/// Operation codes as assigned by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OpCode {
    Reply = 1,
    Update = 2001,
    Insert = 2002,
    Query = 2004,
    GetMore = 2005,
    Delete = 2006,
    KillCursors = 2007,
}

impl OpCode {
    pub fn from_i32(code: i32) -> Result<Self> {
        Ok(match code {
            1 => OpCode::Reply,
            2001 => OpCode::Update,
            2002 => OpCode::Insert,
            2004 => OpCode::Query,
            2005 => OpCode::GetMore,
            2006 => OpCode::Delete,
            2007 => OpCode::KillCursors,
            other => {
                return Err(DriverError::Protocol(format!("Unknown opcode: {}", other)));
            }
        })
    }
}

/// Parsed message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total message size including this header
    pub message_length: i32,
    pub request_id: i32,
    /// Zero for client-originated messages
    pub response_to: i32,
    pub op_code: OpCode,
}

impl MessageHeader {
    /// Parse the first `HEADER_SIZE` bytes of a frame
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DriverError::Protocol(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let word = |i: usize| i32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let message_length = word(0);
        check_length(message_length)?;

        Ok(Self {
            message_length,
            request_id: word(4),
            response_to: word(8),
            op_code: OpCode::from_i32(word(12))?,
        })
    }

    pub(crate) fn write(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.message_length.to_le_bytes());
        out[4..8].copy_from_slice(&self.request_id.to_le_bytes());
        out[8..12].copy_from_slice(&self.response_to.to_le_bytes());
        out[12..16].copy_from_slice(&(self.op_code as i32).to_le_bytes());
    }
}

/// Validate a declared message length before allocating for it
pub fn check_length(message_length: i32) -> Result<usize> {
    if message_length < HEADER_SIZE as i32 {
        return Err(DriverError::Protocol(format!(
            "Message length {} is smaller than the header",
            message_length
        )));
    }
    let length = message_length as usize;
    if length > MAX_MESSAGE_SIZE {
        return Err(DriverError::Protocol(format!(
            "Message too large: {} bytes (max {})",
            length, MAX_MESSAGE_SIZE
        )));
    }
    Ok(length)
}
