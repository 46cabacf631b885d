//! Byte and datagram transports used by device threads.
//!
//! Every read is bounded: a transport that has nothing to deliver returns
//! `Ok(0)` (or `Ok(None)` for datagrams) within its read timeout so the
//! polling thread can observe cancellation.

use std::io;

mod event_file;
mod mock;
mod serial;
mod udp;

pub use event_file::EventFileTransport;
pub use mock::{MockDatagrams, MockTransport};
pub use serial::SerialTransport;
pub use udp::UdpTransport;

/// Bidirectional byte stream.
pub trait Transport: Send {
    /// Read available bytes; `Ok(0)` when the read timed out.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Discard unread input, e.g. after a device reset.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn clear_input(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Endpoint description for log messages.
    fn endpoint(&self) -> String;
}

/// Datagram receiver with an optional command channel.
pub trait DatagramSource: Send {
    /// Receive one datagram; `Ok(None)` when the read timed out.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>>;

    /// Send a control command; a no-op without a control endpoint.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn send_command(&mut self, command: &str) -> io::Result<()>;

    fn endpoint(&self) -> String;
}

pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
