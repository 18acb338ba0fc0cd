//! Client
//!
//! Entry point tying configuration, transport and identifier generation
//! together.

use std::sync::Arc;

use crate::bson::OidGenerator;
use crate::config::Config;
use crate::database::Database;
use crate::error::Result;
use crate::network::{Connection, Link, PairedConnection, Route};
use crate::protocol::{Message, Reply};

/// The transport a client talks through
pub enum Topology {
    Single(Connection),
    Paired(PairedConnection),
}

impl Topology {
    /// Build a single connection or a pair, depending on `config.right`
    pub fn from_config(config: &Config) -> Self {
        match &config.right {
            Some(right) => Topology::Paired(PairedConnection::new(
                config.left.clone(),
                right.clone(),
                config,
            )),
            None => Topology::Single(Connection::new(config.left.clone(), config)),
        }
    }

    pub fn open(&self) -> Result<()> {
        match self {
            Topology::Single(c) => c.open(),
            Topology::Paired(p) => p.open(),
        }
    }

    pub fn close(&self) {
        match self {
            Topology::Single(c) => c.close(),
            Topology::Paired(p) => p.close(),
        }
    }
}

impl Link for Topology {
    fn submit(&self, message: &Message) -> Result<()> {
        match self {
            Topology::Single(c) => c.submit(message),
            Topology::Paired(p) => p.submit(message),
        }
    }

    fn exchange(&self, message: &Message) -> Result<Reply> {
        match self {
            Topology::Single(c) => c.exchange(message),
            Topology::Paired(p) => p.exchange(message),
        }
    }

    fn slave_ok(&self) -> bool {
        match self {
            Topology::Single(c) => c.slave_ok(),
            Topology::Paired(p) => p.slave_ok(),
        }
    }

    fn exchange_routed(&self, message: &Message) -> Result<(Reply, Route)> {
        match self {
            Topology::Single(c) => c.exchange_routed(message),
            Topology::Paired(p) => p.exchange_routed(message),
        }
    }

    fn exchange_via(&self, route: Route, message: &Message) -> Result<Reply> {
        match self {
            Topology::Single(c) => c.exchange_via(route, message),
            Topology::Paired(p) => p.exchange_via(route, message),
        }
    }

    fn submit_via(&self, route: Route, message: &Message) -> Result<()> {
        match self {
            Topology::Single(c) => c.submit_via(route, message),
            Topology::Paired(p) => p.submit_via(route, message),
        }
    }
}

/// A database client
///
/// Owns the transport and the [`OidGenerator`] used to mint `_id` values.
/// Sockets are closed when the client is dropped.
pub struct Client {
    config: Config,
    topology: Topology,
    oids: Arc<OidGenerator>,
}

impl Client {
    /// Create a client with its own identifier generator
    pub fn new(config: Config) -> Self {
        Self::with_oid_generator(config, Arc::new(OidGenerator::new()))
    }

    /// Create a client sharing an existing identifier generator
    pub fn with_oid_generator(config: Config, oids: Arc<OidGenerator>) -> Self {
        let topology = Topology::from_config(&config);
        Self {
            config,
            topology,
            oids,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn oid_generator(&self) -> &Arc<OidGenerator> {
        &self.oids
    }

    /// Open the transport
    pub fn connect(&self) -> Result<()> {
        tracing::info!("Connecting to {}", self.config.left);
        self.topology.open()
    }

    /// Close the transport; the client can be reconnected later
    pub fn disconnect(&self) {
        self.topology.close();
    }

    /// Handle to a database; no network traffic until it is used
    pub fn database(&self, name: &str) -> Database<'_> {
        Database::new(self, name)
    }
}
