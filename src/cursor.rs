//! Cursor Module
//!
//! Lazy, forward-only streaming of query results.
//!
//! ## Lifecycle
//! ```text
//!  Pending ──first next()──▶ QUERY ──▶ Open ──batch empty, id≠0──▶ GET_MORE
//!                                       │
//!              id = 0 / limit reached / error / drop
//!                                       ▼
//!                                     Done  (KILL_CURSORS if id≠0)
//! ```
//!
//! Only one batch is held in memory at a time. A server cursor that is still
//! open when the `Cursor` is closed or dropped is released with KILL_CURSORS;
//! that release is best-effort and its failure is only logged.
//!
//! GET_MORE and KILL_CURSORS follow the [`Route`] of the initial QUERY, so on a
//! paired link they reach the server that owns the cursor id even after the
//! pair fails over. If that connection is lost the id is forgotten locally.

use std::collections::VecDeque;

use crate::bson::Document;
use crate::error::{DriverError, Result};
use crate::network::{Link, Route};
use crate::protocol::{GetMore, KillCursors, Message, Query, QueryFlags, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Initial query not yet sent
    Pending,
    Open,
    Done,
}

/// Iterator over the documents matching a query
pub struct Cursor<'a, L: Link + ?Sized> {
    link: &'a L,
    namespace: String,
    query: Document,
    fields: Option<Document>,
    skip: i32,
    limit: i32,
    batch_size: i32,
    flags: QueryFlags,

    state: CursorState,
    /// Server that answered the initial query
    route: Route,
    cursor_id: i64,
    batch: VecDeque<Document>,
    produced: usize,
}

impl<'a, L: Link + ?Sized> Cursor<'a, L> {
    /// Prepare a query; nothing is sent until the first call to `next`
    pub fn new(link: &'a L, namespace: impl Into<String>, query: Document) -> Self {
        let mut flags = QueryFlags::empty();
        if link.slave_ok() {
            flags.insert(QueryFlags::SLAVE_OK);
        }

        Self {
            link,
            namespace: namespace.into(),
            query,
            fields: None,
            skip: 0,
            limit: 0,
            batch_size: 0,
            flags,
            state: CursorState::Pending,
            route: Route::Direct,
            cursor_id: 0,
            batch: VecDeque::new(),
            produced: 0,
        }
    }

    /// Restrict the returned fields
    pub fn fields(mut self, fields: Document) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Skip documents at the start of the result set
    pub fn skip(mut self, skip: i32) -> Self {
        self.skip = skip;
        self
    }

    /// Cap the number of documents.
    ///
    /// A negative value is a hard limit: the server sends a single batch of at
    /// most `-limit` documents and the cursor closes after it.
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = limit;
        self
    }

    /// Documents to request per round trip (0 = server default)
    pub fn batch_size(mut self, batch_size: i32) -> Self {
        self.batch_size = batch_size.max(0);
        self
    }

    /// Extra query flags; slaveOk is already set when the link allows it
    pub fn flags(mut self, flags: QueryFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Server cursor id, 0 when none is open
    pub fn cursor_id(&self) -> i64 {
        self.cursor_id
    }

    /// Documents handed out so far
    pub fn produced(&self) -> usize {
        self.produced
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Done
    }

    /// Stop iterating and release the server cursor now
    pub fn close(mut self) {
        self.finish();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn remaining_limit(&self) -> Option<usize> {
        (self.limit > 0).then(|| (self.limit as usize).saturating_sub(self.produced))
    }

    /// `numberToReturn` for the next request
    fn next_request_size(&self) -> i32 {
        if self.limit < 0 {
            return self.limit;
        }
        match self.remaining_limit() {
            Some(remaining) => {
                let remaining = remaining.min(i32::MAX as usize) as i32;
                if self.batch_size > 0 {
                    self.batch_size.min(remaining)
                } else {
                    remaining
                }
            }
            None => self.batch_size,
        }
    }

    fn accept(&mut self, reply: Reply) {
        self.cursor_id = reply.cursor_id;
        self.batch.extend(reply.documents);
        self.state = CursorState::Open;
    }

    fn send_query(&mut self) -> Result<()> {
        let query = Query::new(self.namespace.clone(), self.query.clone())
            .flags(self.flags)
            .skip(self.skip)
            .number_to_return(self.next_request_size())
            .fields(self.fields.clone());

        tracing::trace!("Opening cursor on {}", self.namespace);
        let (reply, route) = self.link.exchange_routed(&Message::Query(query))?;
        self.route = route;
        self.accept(reply.into_result(0)?);
        Ok(())
    }

    fn send_get_more(&mut self) -> Result<()> {
        let requested = self.cursor_id;
        let get_more = GetMore::new(self.namespace.clone(), self.next_request_size(), requested);

        tracing::trace!("GET_MORE on cursor {} ({})", requested, self.namespace);
        let reply = self
            .link
            .exchange_via(self.route, &Message::GetMore(get_more))
            .and_then(|reply| reply.into_result(requested));

        match reply {
            Ok(reply) => {
                self.accept(reply);
                Ok(())
            }
            Err(e) => {
                if matches!(e, DriverError::CursorInvalidated { .. }) || e.is_connection_failure() {
                    // Nothing left to release through this route
                    tracing::debug!("Forgetting cursor {} on {}", requested, self.namespace);
                    self.cursor_id = 0;
                }
                Err(e)
            }
        }
    }

    /// Mark done and release the server cursor if one is still open
    fn finish(&mut self) {
        self.state = CursorState::Done;
        self.batch.clear();
        self.release();
    }

    fn release(&mut self) {
        if self.cursor_id == 0 {
            return;
        }

        let cursor_id = std::mem::replace(&mut self.cursor_id, 0);
        let kill = Message::KillCursors(KillCursors::new(vec![cursor_id]));
        match self.link.submit_via(self.route, &kill) {
            Ok(()) => tracing::debug!("Released cursor {} on {}", cursor_id, self.namespace),
            Err(e) => tracing::warn!(
                "Could not release cursor {} on {}: {}",
                cursor_id,
                self.namespace,
                e
            ),
        }
    }
}

impl<L: Link + ?Sized> Iterator for Cursor<'_, L> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state == CursorState::Done {
                return None;
            }

            if self.remaining_limit() == Some(0) {
                self.finish();
                return None;
            }

            if let Some(document) = self.batch.pop_front() {
                self.produced += 1;
                return Some(Ok(document));
            }

            let fetched = match self.state {
                CursorState::Pending => self.send_query(),
                CursorState::Open if self.cursor_id == 0 || self.limit < 0 => {
                    self.finish();
                    return None;
                }
                CursorState::Open => self.send_get_more(),
                CursorState::Done => return None,
            };

            if let Err(e) = fetched {
                self.finish();
                return Some(Err(e));
            }
        }
    }
}

impl<L: Link + ?Sized> Drop for Cursor<'_, L> {
    fn drop(&mut self) {
        self.release();
    }
}
