//! Reply definitions
//!
//! The only server-to-client message.

use crate::bson::Document;
use crate::error::{DriverError, Result};

/// Reply flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseFlags(pub i32);

impl ResponseFlags {
    pub const CURSOR_NOT_FOUND: i32 = 1 << 0;
    pub const QUERY_FAILURE: i32 = 1 << 1;
    pub const AWAIT_CAPABLE: i32 = 1 << 3;

    pub fn cursor_not_found(self) -> bool {
        self.0 & Self::CURSOR_NOT_FOUND != 0
    }

    pub fn query_failure(self) -> bool {
        self.0 & Self::QUERY_FAILURE != 0
    }

    pub fn await_capable(self) -> bool {
        self.0 & Self::AWAIT_CAPABLE != 0
    }
}

/// A parsed reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub flags: ResponseFlags,
    /// 0 once the result set is exhausted
    pub cursor_id: i64,
    pub starting_from: i32,
    /// Equal to the number of documents returned
    pub documents: Vec<Document>,
}

impl Reply {
    /// Create a reply carrying `documents`
    pub fn new(cursor_id: i64, documents: Vec<Document>) -> Self {
        Self {
            flags: ResponseFlags::default(),
            cursor_id,
            starting_from: 0,
            documents,
        }
    }

    /// Create a query-failure reply with an `$err` document
    pub fn failure(message: &str) -> Self {
        Self {
            flags: ResponseFlags(ResponseFlags::QUERY_FAILURE),
            cursor_id: 0,
            starting_from: 0,
            documents: vec![crate::doc! { "$err" => message }],
        }
    }

    /// Create a cursor-not-found reply
    pub fn cursor_not_found() -> Self {
        Self {
            flags: ResponseFlags(ResponseFlags::CURSOR_NOT_FOUND),
            ..Self::default()
        }
    }

    pub fn number_returned(&self) -> i32 {
        self.documents.len() as i32
    }

    /// Turn error flags into errors.
    ///
    /// `requested_cursor` is the cursor id the request referred to (0 for an
    /// initial query), reported back in `CursorInvalidated`.
    pub fn into_result(self, requested_cursor: i64) -> Result<Self> {
        if self.flags.cursor_not_found() {
            return Err(DriverError::CursorInvalidated {
                cursor_id: requested_cursor,
            });
        }

        if self.flags.query_failure() {
            let message = self
                .documents
                .first()
                .and_then(|d| d.get("$err"))
                .and_then(|v| v.as_str())
                .unwrap_or("query failure")
                .to_string();
            return Err(DriverError::CommandFailure(message));
        }

        Ok(self)
    }
}
