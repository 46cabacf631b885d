//! UDP datagram transport.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use super::{DatagramSource, is_timeout};

/// Read timeout of the data socket.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Receives frames on a local data port and optionally sends commands to a
/// remote control port.
#[derive(Debug)]
pub struct UdpTransport {
    data: UdpSocket,
    control: Option<(UdpSocket, SocketAddr)>,
}

impl UdpTransport {
    /// Bind `0.0.0.0:<data_port>`. Port 0 picks an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the port cannot be bound.
    pub fn bind(data_port: u16) -> io::Result<Self> {
        let data = UdpSocket::bind(("0.0.0.0", data_port))?;
        data.set_read_timeout(Some(READ_TIMEOUT))?;
        info!(addr = %data.local_addr()?, "Bound data socket");
        Ok(Self {
            data,
            control: None,
        })
    }

    /// Send control commands to `server:port` from an ephemeral socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not resolve or no socket can be
    /// bound.
    pub fn with_control(mut self, server: &str, port: u16) -> io::Result<Self> {
        let addr = (server, port).to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{server} did not resolve"))
        })?;
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        self.control = Some((socket, addr));
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns the socket error.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.data.local_addr()
    }
}

impl DatagramSource for UdpTransport {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        match self.data.recv(buffer) {
            Ok(n) => Ok(Some(n)),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn send_command(&mut self, command: &str) -> io::Result<()> {
        if let Some((socket, addr)) = &self.control {
            debug!(%addr, command, "Sending control command");
            let mut message = command.as_bytes().to_vec();
            message.push(0);
            socket.send_to(&message, addr)?;
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.data
            .local_addr()
            .map_or_else(|_| "udp".to_string(), |a| a.to_string())
    }
}
