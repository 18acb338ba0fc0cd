//! Network Module
//!
//! TCP sessions with the database server.
//!
//! ## Architecture
//! - [`Connection`]: one socket, one request in flight
//! - [`PairedConnection`]: left/right failover over two Connections
//! - [`Link`]: what cursors and collections need from either
//! - [`Route`]: which server answered, for requests that must go back to it

mod connection;
mod paired;

pub use connection::{Connection, ConnectionState};
pub use paired::{Health, PairedConnection, Side};

use crate::error::Result;
use crate::protocol::{Message, Reply};

/// The server that answered a request.
///
/// A cursor id only means something to the server that issued it, so
/// GET_MORE and KILL_CURSORS for that cursor are sent back along the same
/// route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The link has only one server
    Direct,
    /// One member of a pair
    Side(Side),
}

/// A transport that can carry protocol messages.
///
/// Implemented by [`Connection`] and [`PairedConnection`]; the rest of the
/// driver is written against this trait.
pub trait Link {
    /// Send a message that gets no reply (writes, KillCursors)
    fn submit(&self, message: &Message) -> Result<()>;

    /// Send a request and wait for its reply
    fn exchange(&self, message: &Message) -> Result<Reply>;

    /// Whether queries may be answered by a non-primary server
    fn slave_ok(&self) -> bool {
        false
    }

    /// [`exchange`](Self::exchange), also reporting which server answered
    fn exchange_routed(&self, message: &Message) -> Result<(Reply, Route)> {
        self.exchange(message).map(|reply| (reply, Route::Direct))
    }

    /// Exchange with the server behind `route` only. Never fails over and
    /// never reopens a connection that was lost.
    fn exchange_via(&self, _route: Route, message: &Message) -> Result<Reply> {
        self.exchange(message)
    }

    /// Submit to the server behind `route` only, with the same rules as
    /// [`exchange_via`](Self::exchange_via)
    fn submit_via(&self, _route: Route, message: &Message) -> Result<()> {
        self.submit(message)
    }
}
