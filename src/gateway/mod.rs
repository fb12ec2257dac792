//! TCP client for the bus gateway daemon.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::proto::{Command, Response};

pub mod link;

pub use link::{TransactionResult, transact};

pub const DEFAULT_PORT: u16 = 55825;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unsupported frame: {bits} bits (gateway carries 16-bit frames only)")]
    UnsupportedFrame { bits: u8 },
    #[error("connect {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("gateway I/O: {0}")]
    Io(#[from] io::Error),
    #[error("gateway status was {0}")]
    Status(u8),
}

/// Anything that can carry one command to the bus and return its decoded answer.
///
/// At most one transaction is in flight per link.
pub trait Link {
    fn transact(&mut self, command: &Command) -> Result<Option<Response>, GatewayError>;
}

/// Address and connection policy for one gateway daemon.
#[derive(Debug, Clone)]
pub struct Gateway {
    host: String,
    port: u16,
    reuse_connection: bool,
    timeout: Option<Duration>,
}

impl Gateway {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reuse_connection: false,
            timeout: None,
        }
    }

    /// Hold one connection open for the life of each [`BusScope`].
    pub fn reuse_connection(mut self, reuse: bool) -> Self {
        self.reuse_connection = reuse;
        self
    }

    /// Hard deadline for connecting and for each read or write.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect(&self) -> Result<Connection, GatewayError> {
        let target = self.target();
        let connect_err = |source| GatewayError::Connect {
            target: target.clone(),
            source,
        };
        let stream = match self.timeout {
            None => TcpStream::connect((self.host.as_str(), self.port)).map_err(connect_err)?,
            Some(t) => {
                let addrs = (self.host.as_str(), self.port)
                    .to_socket_addrs()
                    .map_err(connect_err)?;
                let stream = connect_any(addrs, t).map_err(connect_err)?;
                stream.set_read_timeout(Some(t))?;
                stream.set_write_timeout(Some(t))?;
                stream
            }
        };
        stream.set_nodelay(true)?;
        debug!(target = %target, "gateway connected");
        Ok(Connection { stream, target })
    }

    /// Acquire the bus. With connection reuse the connection opens here and
    /// closes when the scope is dropped.
    pub fn scope(&self) -> Result<BusScope<'_>, GatewayError> {
        let held = if self.reuse_connection {
            Some(self.connect()?)
        } else {
            None
        };
        Ok(BusScope {
            gateway: self,
            held,
        })
    }
}

/// Try each resolved address in turn, as `TcpStream::connect` does, each
/// bounded by `timeout`. Returns the last error if none accepts.
fn connect_any(
    addrs: impl IntoIterator<Item = SocketAddr>,
    timeout: Duration,
) -> io::Result<TcpStream> {
    let mut last = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last = Some(e);
            }
        }
    }
    Err(last.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address for host")))
}

/// One connection per transaction, closed as soon as the transaction ends.
impl Link for Gateway {
    fn transact(&mut self, command: &Command) -> Result<Option<Response>, GatewayError> {
        let mut conn = self.connect()?;
        conn.transact(command)
    }
}

/// An open TCP connection to the daemon.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: S,
    target: String,
}

impl<S: Read + Write> Connection<S> {
    pub fn from_stream(stream: S, target: impl Into<String>) -> Self {
        Self {
            stream,
            target: target.into(),
        }
    }
}

impl<S> Connection<S> {
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl<S: Read + Write> Link for Connection<S> {
    fn transact(&mut self, command: &Command) -> Result<Option<Response>, GatewayError> {
        link::transact(&mut self.stream, command)
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        debug!(target = %self.target, "gateway connection closed");
    }
}

impl Connection<TcpStream> {
    /// Close explicitly, reporting any shutdown error instead of dropping it.
    pub fn close(self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

/// Exclusive use of one bus for a run of sequences.
///
/// Must not be shared between concurrently running sequences.
#[derive(Debug)]
pub struct BusScope<'g> {
    gateway: &'g Gateway,
    held: Option<Connection>,
}

impl BusScope<'_> {
    pub fn is_persistent(&self) -> bool {
        self.held.is_some()
    }

    pub fn gateway(&self) -> &Gateway {
        self.gateway
    }

    /// Release the bus, closing a held connection.
    pub fn release(mut self) -> io::Result<()> {
        match self.held.take() {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }
}

impl Link for BusScope<'_> {
    fn transact(&mut self, command: &Command) -> Result<Option<Response>, GatewayError> {
        match self.held.as_mut() {
            Some(conn) => conn.transact(command),
            None => self.gateway.connect()?.transact(command),
        }
    }
}
