//! Paired Connection
//!
//! Best-effort failover between a left and a right server.
//!
//! ## Routing
//! - One side is active at a time, initially left.
//! - A connection failure on the active side marks it `Failed`, closes it and
//!   makes the other side active for the next operation.
//! - Writes are never retried: replaying a write elsewhere risks applying it
//!   twice, so the failure goes back to the caller.
//! - Queries are retried once on the other side.
//! - A side only becomes `Healthy` again after an operation on it succeeds.
//! - `open` tries left first, then right, and makes whichever opened active.
//!   Between opens the active side only moves on failure.
//! - Requests tied to one server (GET_MORE and KILL_CURSORS for a cursor) go
//!   through `call_on`/`send_on`, which use that side only and never reopen it.
//!
//! This keeps the client making progress against whichever side answers; it
//! does not make the two servers agree on anything.

use std::io;

use parking_lot::Mutex;

use crate::config::{Config, ServerAddress};
use crate::error::{DriverError, Result};
use crate::protocol::{Message, Reply};

use super::{Connection, Link, Route};

/// Which member of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Last known state of one side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Unknown,
    Healthy,
    Failed,
}

struct PairState {
    active: Side,
    health: [Health; 2],
    /// Side holding the request `receive` should answer
    last_sent: Option<Side>,
}

/// Two connections with failover between them
pub struct PairedConnection {
    left: Connection,
    right: Connection,
    slave_ok: bool,
    state: Mutex<PairState>,
}

impl PairedConnection {
    /// Create a closed pair; `slave_ok` is taken from `config`
    pub fn new(left: ServerAddress, right: ServerAddress, config: &Config) -> Self {
        Self {
            left: Connection::new(left, config),
            right: Connection::new(right, config),
            slave_ok: config.slave_ok,
            state: Mutex::new(PairState {
                active: Side::Left,
                health: [Health::Unknown; 2],
                last_sent: None,
            }),
        }
    }

    pub fn connection(&self, side: Side) -> &Connection {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn slave_ok(&self) -> bool {
        self.slave_ok
    }

    pub fn health(&self, side: Side) -> Health {
        self.state.lock().health[side.index()]
    }

    /// Side the next operation will target
    pub fn active(&self) -> Side {
        self.state.lock().active
    }

    /// Open left, falling back to right if left is unreachable
    pub fn open(&self) -> Result<()> {
        let side = match self.attempt(Side::Left, |_| Ok(())) {
            Ok(()) => Side::Left,
            Err(e) if e.is_connection_failure() => {
                tracing::warn!("Could not open left ({}), trying right", e);
                self.attempt(Side::Right, |_| Ok(()))?;
                Side::Right
            }
            Err(e) => return Err(e),
        };
        self.state.lock().active = side;
        Ok(())
    }

    /// Close both sides
    pub fn close(&self) {
        self.left.close();
        self.right.close();
        self.state.lock().last_sent = None;
    }

    /// Send on the active side. Failures are surfaced, never retried.
    pub fn send(&self, message: &Message) -> Result<i32> {
        let side = self.active();
        let request_id = self.attempt(side, |c| c.send(message))?;
        self.state.lock().last_sent = Some(side);
        Ok(request_id)
    }

    /// Receive on the side that carried the last `send`
    pub fn receive(&self) -> Result<Reply> {
        let side = self.state.lock().last_sent.take().ok_or_else(|| {
            DriverError::Protocol("No request is waiting for a reply".to_string())
        })?;
        let result = self.connection(side).receive();
        self.record(side, &result);
        result
    }

    /// Request/reply exchange; a query that hits a connection failure is
    /// retried once on the other side
    pub fn call(&self, message: &Message) -> Result<Reply> {
        self.call_routed(message).map(|(reply, _)| reply)
    }

    /// [`call`](Self::call), also reporting the side that answered
    pub fn call_routed(&self, message: &Message) -> Result<(Reply, Side)> {
        let side = self.active();
        match self.attempt(side, |c| c.call(message)) {
            Ok(reply) => Ok((reply, side)),
            Err(e) if e.is_connection_failure() && matches!(message, Message::Query(_)) => {
                let other = side.other();
                tracing::warn!("Query on {:?} failed ({}), retrying on {:?}", side, e, other);
                self.attempt(other, |c| c.call(message))
                    .map(|reply| (reply, other))
            }
            Err(e) => Err(e),
        }
    }

    /// Request/reply exchange on `side` only
    pub fn call_on(&self, side: Side, message: &Message) -> Result<Reply> {
        self.pinned(side, |c| c.call(message))
    }

    /// Send on `side` only
    pub fn send_on(&self, side: Side, message: &Message) -> Result<i32> {
        let request_id = self.pinned(side, |c| c.send(message))?;
        self.state.lock().last_sent = Some(side);
        Ok(request_id)
    }

    /// Run `op` on `side` if its connection is still open
    fn pinned<T>(&self, side: Side, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let connection = self.connection(side);
        if !connection.is_open() {
            return Err(DriverError::connection(
                format!("using {:?} side ({})", side, connection.address()),
                io::Error::new(io::ErrorKind::NotConnected, "connection was lost"),
            ));
        }
        let result = op(connection);
        self.record(side, &result);
        result
    }

    /// Open `side` if needed, run `op` on it and record the outcome
    fn attempt<T>(&self, side: Side, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let connection = self.connection(side);
        let result = connection.open().and_then(|_| op(connection));
        self.record(side, &result);
        result
    }

    fn record<T>(&self, side: Side, result: &Result<T>) {
        let mut state = self.state.lock();
        match result {
            Ok(_) => {
                if state.health[side.index()] != Health::Healthy {
                    tracing::debug!("{:?} side ({}) is healthy", side, self.connection(side).address());
                }
                state.health[side.index()] = Health::Healthy;
            }
            Err(e) if e.is_connection_failure() => {
                tracing::warn!(
                    "{:?} side ({}) failed: {}",
                    side,
                    self.connection(side).address(),
                    e
                );
                state.health[side.index()] = Health::Failed;
                if state.active == side {
                    state.active = side.other();
                }
                if state.last_sent == Some(side) {
                    state.last_sent = None;
                }
                drop(state);
                self.connection(side).close();
            }
            Err(_) => {}
        }
    }
}

impl Link for PairedConnection {
    fn submit(&self, message: &Message) -> Result<()> {
        self.send(message).map(|_| ())
    }

    fn exchange(&self, message: &Message) -> Result<Reply> {
        self.call(message)
    }

    fn slave_ok(&self) -> bool {
        self.slave_ok
    }

    fn exchange_routed(&self, message: &Message) -> Result<(Reply, Route)> {
        self.call_routed(message)
            .map(|(reply, side)| (reply, Route::Side(side)))
    }

    fn exchange_via(&self, route: Route, message: &Message) -> Result<Reply> {
        match route {
            Route::Side(side) => self.call_on(side, message),
            Route::Direct => self.call(message),
        }
    }

    fn submit_via(&self, route: Route, message: &Message) -> Result<()> {
        match route {
            Route::Side(side) => self.send_on(side, message).map(|_| ()),
            Route::Direct => self.submit(message),
        }
    }
}
