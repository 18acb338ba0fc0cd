//! Document Module
//!
//! The in-memory value model and its binary encoding.
//!
//! ## Responsibilities
//! - Ordered documents of tagged values
//! - Byte-exact encode/decode of the binary document format
//! - Object identifier generation
//! - JSON interop for tooling
//!
//! ## Encoded Document
//! ```text
//! ┌───────────┬─────────────────────────────┬──────┐
//! │ Len (4)   │ (Tag, Key, Payload)*        │ 0x00 │
//! └───────────┴─────────────────────────────┴──────┘
//! ```

mod codec;
mod document;
mod json;
mod oid;
pub(crate) mod reader;
mod value;

pub use codec::{decode, encode, encode_into, MAX_NESTING_DEPTH, MIN_DOCUMENT_SIZE};
pub(crate) use codec::write_cstring;
pub use document::{Document, Iter};
pub use json::{from_json, parse_json};
pub use oid::{ObjectId, OidGenerator};
pub use value::{Binary, ElementType, Regex, Value};
