//! Bounds-checked little-endian reader over a byte slice
//!
//! Shared by the document codec and the message decoder. Every read checks
//! the remaining length first, so malformed input can never index past the
//! end of the slice.

use std::fmt;

/// Why a read could not be satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadError {
    Truncated { needed: usize, available: usize },
    Unterminated,
    InvalidUtf8,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Truncated { needed, available } => write!(
                f,
                "truncated input: needed {} bytes, {} available",
                needed, available
            ),
            ReadError::Unterminated => write!(f, "missing NUL terminator"),
            ReadError::InvalidUtf8 => write!(f, "invalid UTF-8"),
        }
    }
}

pub(crate) type ReadResult<T> = std::result::Result<T, ReadError>;

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread part of the input
    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.bytes[self.position..]
    }

    pub(crate) fn advance(&mut self, count: usize) -> ReadResult<()> {
        self.take(count).map(|_| ())
    }

    pub(crate) fn take(&mut self, count: usize) -> ReadResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(ReadError::Truncated {
                needed: count,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self) -> ReadResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_i32(&mut self) -> ReadResult<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub(crate) fn read_i64(&mut self) -> ReadResult<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    pub(crate) fn read_f64(&mut self) -> ReadResult<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// NUL-terminated UTF-8 string; the terminator is consumed but not returned
    pub(crate) fn read_cstring(&mut self) -> ReadResult<&'a str> {
        let rest = self.rest();
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ReadError::Unterminated)?;
        let text = std::str::from_utf8(&rest[..end]).map_err(|_| ReadError::InvalidUtf8)?;
        self.position += end + 1;
        Ok(text)
    }
}
