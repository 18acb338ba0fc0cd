//! Protocol Module
//!
//! Defines the wire protocol spoken with the database server. Byte layouts
//! and opcode numbers must match the server exactly.
//!
//! ## Message Format
//! ```text
//! ┌──────────┬──────────────┬───────────────┬──────────┬──────────────┐
//! │ Len (4)  │ RequestID (4)│ ResponseTo (4)│ OpCode(4)│    Body      │
//! └──────────┴──────────────┴───────────────┴──────────┴──────────────┘
//! ```
//!
//! ### OpCodes
//! - 1:    REPLY        (server → client)
//! - 2001: UPDATE
//! - 2002: INSERT
//! - 2004: QUERY
//! - 2005: GET_MORE
//! - 2006: DELETE
//! - 2007: KILL_CURSORS
//!
//! ### Reply Flags
//! - bit 0: cursor not found
//! - bit 1: query failure (`$err` in the first document)
//! - bit 3: await capable
//!
//! INSERT, UPDATE and DELETE get no reply at all.

mod codec;
mod header;
mod message;
mod reply;

pub use codec::{
    decode_message, decode_reply, encode_message, encode_reply, read_message, read_reply,
    write_message, write_reply,
};
pub use header::{check_length, MessageHeader, OpCode, HEADER_SIZE, MAX_MESSAGE_SIZE};
pub use message::{
    Delete, DeleteFlags, GetMore, Insert, KillCursors, Message, Query, QueryFlags, Update,
    UpdateFlags,
};
pub use reply::{Reply, ResponseFlags};
