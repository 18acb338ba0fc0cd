//! # docwire
//!
//! A synchronous client driver for a document database:
//! - Order-preserving document model with a byte-exact binary codec
//! - Wire protocol framing with request/reply correlation
//! - Single connections and left/right failover pairs
//! - Streaming cursors that release server resources on every exit path
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Client / Database / Collection                    │
//! │               (CRUD and command helpers)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Cursor                                  │
//! │        (QUERY, GET_MORE, KILL_CURSORS on release)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Link
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────────┐
//!   │ Connection  │◀─────────│ PairedConnection│
//!   │   (TCP)     │   x2     │   (failover)    │
//!   └──────┬──────┘          └─────────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Protocol   │─────────▶│    BSON     │
//!   │  (framing)  │          │   (codec)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod bson;
pub mod protocol;
pub mod network;
pub mod cursor;
pub mod client;
pub mod database;
pub mod collection;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use bson::{Document, ObjectId, OidGenerator, Value};
pub use client::{Client, Topology};
pub use collection::Collection;
pub use config::{Config, ServerAddress};
pub use cursor::Cursor;
pub use database::Database;
pub use error::{DriverError, Result};
pub use network::{Connection, Link, PairedConnection, Route};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of docwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
