//! Configuration for docwire
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DriverError, Result};

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";

/// Default server port
pub const DEFAULT_PORT: u16 = 27017;

/// A resolvable host/port pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(port: &str, input: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|e| DriverError::Config(format!("invalid port in '{}': {}", input, e)))
}

impl FromStr for ServerAddress {
    type Err = DriverError;

    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DriverError::Config("empty server address".to_string()));
        }

        if let Some(bracketed) = s.strip_prefix('[') {
            let (host, rest) = bracketed.split_once(']').ok_or_else(|| {
                DriverError::Config(format!("unterminated '[' in '{}'", s))
            })?;
            if host.is_empty() {
                return Err(DriverError::Config(format!("missing host in '{}'", s)));
            }
            return match rest {
                "" => Ok(Self::new(host, DEFAULT_PORT)),
                _ => match rest.strip_prefix(':') {
                    Some(port) => Ok(Self::new(host, parse_port(port, s)?)),
                    None => Err(DriverError::Config(format!(
                        "unexpected '{}' after ']' in '{}'",
                        rest, s
                    ))),
                },
            };
        }

        match s.split_once(':') {
            Some((_, rest)) if rest.contains(':') => Err(DriverError::Config(format!(
                "IPv6 address '{}' must be written as [address]:port",
                s
            ))),
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(DriverError::Config(format!("missing host in '{}'", s)));
                }
                Ok(Self::new(host, parse_port(port, s)?))
            }
            None => Ok(Self::new(s, DEFAULT_PORT)),
        }
    }
}

/// Main configuration for a docwire client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Topology
    // -------------------------------------------------------------------------
    /// Primary ("left") server
    pub left: ServerAddress,

    /// Secondary ("right") server; when set the client uses a paired connection
    pub right: Option<ServerAddress>,

    /// Allow reads to be answered by a non-primary server
    pub slave_ok: bool,

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------
    /// TCP connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Socket read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            left: ServerAddress::default(),
            right: None,
            slave_ok: false,
            connect_timeout_ms: 0,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            nodelay: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub(crate) fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub(crate) fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub(crate) fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the primary server
    pub fn server(mut self, address: ServerAddress) -> Self {
        self.config.left = address;
        self
    }

    /// Configure a left/right pair
    pub fn pair(mut self, left: ServerAddress, right: ServerAddress) -> Self {
        self.config.left = left;
        self.config.right = Some(right);
        self
    }

    /// Allow reads from the secondary
    pub fn slave_ok(mut self, slave_ok: bool) -> Self {
        self.config.slave_ok = slave_ok;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
