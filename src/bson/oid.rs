//! Object identifiers
//!
//! ## Layout
//! ```text
//! ┌────────────────┬──────────────┬─────────────┬──────────────┐
//! │ seconds (4 BE) │ machine (3)  │ process (2) │ counter (3)  │
//! └────────────────┴──────────────┴─────────────┴──────────────┘
//! ```
//!
//! Timestamp and counter are big-endian so that byte order follows
//! generation order.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{DriverError, Result};

/// 12-byte object identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const LEN: usize = 12;

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Creation time in seconds since the Unix epoch
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse the 24-character hex form
    pub fn parse_str(s: &str) -> Result<Self> {
        if s.len() != 24 || !s.is_ascii() {
            return Err(DriverError::Config(format!(
                "invalid ObjectId '{}': expected 24 hex characters",
                s
            )));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|e| DriverError::Config(format!("invalid ObjectId '{}': {}", s, e)))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Mints object identifiers.
///
/// Construct one per process (or per client) and share it through an `Arc`;
/// the counter is atomic so `generate` is safe from any number of threads.
/// Two generators in the same process only stay collision-free because their
/// counters start at different points, so prefer sharing a single instance.
pub struct OidGenerator {
    machine: [u8; 3],
    process: [u8; 2],
    counter: AtomicU32,
}

impl OidGenerator {
    const COUNTER_MASK: u32 = 0x00FF_FFFF;

    /// Identify this host by a hash of its name and this process by its pid
    pub fn new() -> Self {
        let host = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        let machine = crc32fast::hash(host.as_bytes()).to_be_bytes();
        let pid = (std::process::id() & 0xFFFF) as u16;

        tracing::debug!("ObjectId generator for host {} (pid {})", host, pid);

        Self::with_identity([machine[1], machine[2], machine[3]], pid, initial_counter())
    }

    /// Build a generator with explicit machine/process bytes and counter seed
    pub fn with_identity(machine: [u8; 3], process: u16, counter: u32) -> Self {
        Self {
            machine,
            process: process.to_be_bytes(),
            counter: AtomicU32::new(counter & Self::COUNTER_MASK),
        }
    }

    /// Generate an identifier stamped with the current time
    pub fn generate(&self) -> ObjectId {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        self.generate_at(seconds)
    }

    /// Generate an identifier with an explicit timestamp
    pub fn generate_at(&self, seconds: u32) -> ObjectId {
        let count = self.counter.fetch_add(1, Ordering::Relaxed) & Self::COUNTER_MASK;
        let count = count.to_be_bytes();

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..7].copy_from_slice(&self.machine);
        bytes[7..9].copy_from_slice(&self.process);
        bytes[9..12].copy_from_slice(&count[1..4]);
        ObjectId(bytes)
    }
}

impl Default for OidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn initial_counter() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0)
}
