//! In-memory transports for tests and demos.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DatagramSource, Transport};

#[derive(Debug, Default)]
struct StreamInner {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    /// Bytes queued in response to a written byte sequence.
    replies: Vec<(Vec<u8>, Vec<u8>)>,
    disconnected: bool,
}

/// Byte stream backed by shared buffers; clones share state so a test can
/// keep a handle after moving one into a device.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<StreamInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for reading.
    pub fn inject(&self, data: &[u8]) {
        self.inner.lock().incoming.extend(data);
    }

    /// Queue `reply` for reading whenever `command` is written.
    pub fn reply_to(&self, command: &[u8], reply: &[u8]) {
        self.inner
            .lock()
            .replies
            .push((command.to_vec(), reply.to_vec()));
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().written.clone()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().incoming.len()
    }

    /// Make every further read fail with a broken pipe.
    pub fn disconnect(&self) {
        self.inner.lock().disconnected = true;
    }

    /// Undo [`MockTransport::disconnect`].
    pub fn reconnect(&self) {
        self.inner.lock().disconnected = false;
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        if inner.disconnected {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let n = buffer.len().min(inner.incoming.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.disconnected {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        inner.written.extend_from_slice(data);
        let replies: Vec<u8> = inner
            .replies
            .iter()
            .filter(|(command, _)| command.as_slice() == data)
            .flat_map(|(_, reply)| reply.iter().copied())
            .collect();
        inner.incoming.extend(replies);
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.inner.lock().incoming.clear();
        Ok(())
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}

#[derive(Debug, Default)]
struct DatagramInner {
    queue: VecDeque<Vec<u8>>,
    commands: Vec<String>,
}

/// Datagram source fed from a shared queue.
#[derive(Debug, Clone, Default)]
pub struct MockDatagrams {
    inner: Arc<Mutex<DatagramInner>>,
}

impl MockDatagrams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, datagram: Vec<u8>) {
        self.inner.lock().queue.push_back(datagram);
    }

    /// Control commands sent so far.
    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().commands.clone()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }
}

impl DatagramSource for MockDatagrams {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        let Some(datagram) = self.inner.lock().queue.pop_front() else {
            std::thread::sleep(std::time::Duration::from_millis(1));
            return Ok(None);
        };
        let n = datagram.len().min(buffer.len());
        if let (Some(dst), Some(src)) = (buffer.get_mut(..n), datagram.get(..n)) {
            dst.copy_from_slice(src);
        }
        Ok(Some(n))
    }

    fn send_command(&mut self, command: &str) -> io::Result<()> {
        self.inner.lock().commands.push(command.to_string());
        Ok(())
    }

    fn endpoint(&self) -> String {
        "mock-udp".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_reply_on_command() -> TestResult {
        let handle = MockTransport::new();
        handle.reply_to(b"S", b"21S ok\r\n");
        let mut transport: Box<dyn Transport> = Box::new(handle.clone());
        transport.write_all(b"S")?;
        let mut buffer = [0u8; 32];
        let n = transport.read(&mut buffer)?;
        assert_eq!(buffer.get(..n), Some(&b"21S ok\r\n"[..]));
        assert_eq!(handle.written(), b"S");
        Ok(())
    }

    #[test]
    fn test_disconnect() {
        let handle = MockTransport::new();
        let mut transport = handle.clone();
        handle.disconnect();
        let err = transport.read(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        handle.reconnect();
        assert_eq!(transport.read(&mut [0u8; 4]).unwrap(), 0);
    }
}
