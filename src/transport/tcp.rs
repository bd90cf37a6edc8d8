//! # Raw TCP Transport
//!
//! Network label printers accept their command language as a raw byte
//! stream on TCP port 9100. This transport owns one such connection.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! connect ──► write_all ... write_all ──► shutdown
//!   │                                        │
//!   └── timeout on connect                   └── half-close, then drop
//! ```
//!
//! Each write is bounded by the write timeout so a wedged printer surfaces
//! as a transport error instead of a hung worker.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::error::{EtiketError, Result};

/// Default raw printing port
pub const DEFAULT_PORT: u16 = 9100;

/// Default connect and write timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// # TCP Printer Transport
///
/// ## Example
///
/// ```no_run
/// use etiket::transport::TcpTransport;
///
/// let mut transport = TcpTransport::connect("192.168.1.50", Default::default())?;
/// transport.write_all(b"PRINTFEED\r\n")?;
/// transport.shutdown();
///
/// # Ok::<(), etiket::error::EtiketError>(())
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    addr: SocketAddr,
}

/// Connection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpOptions {
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TcpTransport {
    /// Connect to `host` or `host:port` (port defaults to 9100).
    #[instrument(skip_all, fields(printer = %printer))]
    pub fn connect(printer: &str, options: TcpOptions) -> Result<Self> {
        let addr = resolve(printer)?;
        info!(%addr, "Connecting to printer");

        let stream = TcpStream::connect_timeout(&addr, options.connect_timeout)
            .map_err(|e| EtiketError::Transport(format!("Failed to connect to {}: {}", addr, e)))?;
        stream
            .set_write_timeout(Some(options.write_timeout))
            .map_err(|e| EtiketError::Transport(format!("Failed to set write timeout: {}", e)))?;
        stream.set_nodelay(true).ok();

        info!(%addr, "Connected");
        Ok(Self { stream, addr })
    }

    /// Peer address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Write data and flush.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .map_err(|e| EtiketError::Transport(format!("Write to {} failed: {}", self.addr, e)))?;
        self.stream
            .flush()
            .map_err(|e| EtiketError::Transport(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    /// Half-close the connection and drop it.
    ///
    /// Shutdown errors are logged, not returned: the printer may already have
    /// closed its end.
    pub fn shutdown(self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Write) {
            warn!(addr = %self.addr, error = %e, "Shutdown failed");
        }
        info!(addr = %self.addr, "Connection closed");
    }
}

/// Resolve `host` or `host:port` to the first socket address.
pub fn resolve(printer: &str) -> Result<SocketAddr> {
    let target = if has_port(printer) {
        printer.to_string()
    } else {
        format!("{}:{}", printer, DEFAULT_PORT)
    };
    target
        .to_socket_addrs()
        .map_err(|e| EtiketError::Transport(format!("Invalid printer address {}: {}", printer, e)))?
        .next()
        .ok_or_else(|| EtiketError::Transport(format!("No address for {}", printer)))
}

fn has_port(printer: &str) -> bool {
    if printer.starts_with('[') {
        return printer.contains("]:");
    }
    match printer.rsplit_once(':') {
        Some((host, port)) => !host.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}
