//! Non-blocking character device, e.g. `/dev/input/js0`.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::info;

use super::{Transport, is_timeout};

#[derive(Debug)]
pub struct EventFileTransport {
    path: PathBuf,
    file: File,
}

impl EventFileTransport {
    /// Open `path` read-only without blocking reads.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.read(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NONBLOCK);
        }
        let file = options.open(&path)?;
        info!(path = %path.display(), "Opened event file");
        Ok(Self { path, file })
    }
}

impl Transport for EventFileTransport {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.file.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if is_timeout(&e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "event files are read-only",
        ))
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_reads_file_contents() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&[1, 2, 3, 4, 5, 6, 7, 8])?;
        let mut transport = EventFileTransport::open(file.path())?;
        let mut buffer = [0u8; 16];
        assert_eq!(transport.read(&mut buffer)?, 8);
        assert_eq!(transport.read(&mut buffer)?, 0);
        assert!(transport.write_all(b"x").is_err());
        Ok(())
    }
}
