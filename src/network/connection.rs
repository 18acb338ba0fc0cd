//! Connection
//!
//! A single TCP session with one server.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use parking_lot::Mutex;

use crate::config::{Config, ServerAddress};
use crate::error::{DriverError, Result};
use crate::protocol::{encode_message, read_reply, Message, Reply};

use super::Link;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Opened,
}

/// Buffered halves of one TCP stream
struct Socket {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

struct Inner {
    state: ConnectionState,
    socket: Option<Socket>,
    /// Next request id; increases for the lifetime of the Connection
    next_request_id: i32,
    /// Request still waiting for its reply
    outstanding: Option<i32>,
}

/// A single TCP session.
///
/// The protocol allows one request in flight, so all socket access goes
/// through one mutex. [`call`](Connection::call) holds it across the send
/// and the receive.
pub struct Connection {
    address: ServerAddress,
    config: Config,
    inner: Mutex<Inner>,
}

impl Connection {
    /// Create a closed connection to `address`, taking transport options from `config`
    pub fn new(address: ServerAddress, config: &Config) -> Self {
        Self {
            address,
            config: config.clone(),
            inner: Mutex::new(Inner {
                state: ConnectionState::Closed,
                socket: None,
                next_request_id: 1,
                outstanding: None,
            }),
        }
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Opened
    }

    /// Establish the TCP session. Does nothing if already open.
    pub fn open(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state == ConnectionState::Opened {
            return Ok(());
        }

        inner.state = ConnectionState::Opening;
        match self.connect() {
            Ok(socket) => {
                tracing::debug!("Connected to {}", self.address);
                inner.socket = Some(socket);
                inner.outstanding = None;
                inner.state = ConnectionState::Opened;
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Failed to connect to {}: {}", self.address, e);
                inner.state = ConnectionState::Closed;
                Err(e)
            }
        }
    }

    /// Release the socket. Safe to call any number of times.
    pub fn close(&self) {
        self.inner.lock().close(&self.address);
    }

    /// Frame and write one message; returns the request id it was sent with
    pub fn send(&self, message: &Message) -> Result<i32> {
        self.inner.lock().send(&self.address, message)
    }

    /// Read the reply to the outstanding request
    pub fn receive(&self) -> Result<Reply> {
        self.inner.lock().receive(&self.address)
    }

    /// Send a request and read its reply as one exchange
    pub fn call(&self, message: &Message) -> Result<Reply> {
        let mut inner = self.inner.lock();
        inner.send(&self.address, message)?;
        inner.receive(&self.address)
    }

    fn connect(&self) -> Result<Socket> {
        let target = format!("connecting to {}", self.address);
        let addrs = (self.address.host.as_str(), self.address.port)
            .to_socket_addrs()
            .map_err(|e| DriverError::connection(format!("resolving {}", self.address), e))?;

        let mut last_error = None;
        for addr in addrs {
            let attempt = match self.config.connect_timeout() {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    return self
                        .configure(stream)
                        .map_err(|e| DriverError::connection(target.clone(), e));
                }
                Err(e) => last_error = Some(e),
            }
        }

        let source = last_error.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "host resolved to no addresses",
            )
        });
        Err(DriverError::connection(target, source))
    }

    fn configure(&self, stream: TcpStream) -> std::io::Result<Socket> {
        stream.set_nodelay(self.config.nodelay)?;
        stream.set_read_timeout(self.config.read_timeout())?;
        stream.set_write_timeout(self.config.write_timeout())?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        Ok(Socket {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inner.get_mut().close(&self.address);
    }
}

impl Link for Connection {
    fn submit(&self, message: &Message) -> Result<()> {
        self.send(message).map(|_| ())
    }

    fn exchange(&self, message: &Message) -> Result<Reply> {
        self.call(message)
    }
}

impl Inner {
    fn close(&mut self, address: &ServerAddress) {
        if self.socket.take().is_some() {
            tracing::debug!("Closed connection to {}", address);
        }
        self.outstanding = None;
        self.state = ConnectionState::Closed;
    }

    fn socket(&mut self, address: &ServerAddress) -> Result<&mut Socket> {
        self.socket.as_mut().ok_or_else(|| {
            DriverError::connection(
                format!("using {}", address),
                std::io::Error::new(std::io::ErrorKind::NotConnected, "connection is not open"),
            )
        })
    }

    fn send(&mut self, address: &ServerAddress, message: &Message) -> Result<i32> {
        let request_id = self.next_request_id;
        let bytes = encode_message(request_id, message)?;

        let socket = self.socket(address)?;
        let written = socket
            .writer
            .write_all(&bytes)
            .and_then(|_| socket.writer.flush());

        if let Err(e) = written {
            self.close(address);
            return Err(DriverError::connection(format!("writing to {}", address), e));
        }

        tracing::trace!(
            "Sent {:?} #{} ({} bytes) to {}",
            message.op_code(),
            request_id,
            bytes.len(),
            address
        );

        self.next_request_id = self.next_request_id.wrapping_add(1);
        if message.expects_reply() {
            self.outstanding = Some(request_id);
        }
        Ok(request_id)
    }

    fn receive(&mut self, address: &ServerAddress) -> Result<Reply> {
        let expected = self.outstanding.ok_or_else(|| {
            DriverError::Protocol("No request is waiting for a reply".to_string())
        })?;

        let socket = self.socket(address)?;
        let received = read_reply(&mut socket.reader);
        self.outstanding = None;

        let (header, reply) = match received {
            Ok(parsed) => parsed,
            Err(DriverError::ConnectionFailure { source, .. }) => {
                self.close(address);
                return Err(DriverError::connection(
                    format!("reading reply from {}", address),
                    source,
                ));
            }
            Err(e) => {
                // The stream position is unknown after a bad frame
                tracing::warn!("Closing connection to {} after bad reply: {}", address, e);
                self.close(address);
                return Err(e);
            }
        };

        if header.response_to != expected {
            self.close(address);
            return Err(DriverError::Protocol(format!(
                "Reply from {} answers request {} but {} is outstanding",
                address, header.response_to, expected
            )));
        }

        tracing::trace!(
            "Reply to #{} from {}: {} documents, cursor {}",
            expected,
            address,
            reply.documents.len(),
            reply.cursor_id
        );
        Ok(reply)
    }
}
