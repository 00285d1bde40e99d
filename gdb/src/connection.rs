use std::net::TcpStream;
use std::time::Duration;

/// Byte transport underneath a remote debug session.
pub trait Connection {
    type Error: std::fmt::Debug;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        for b in buf {
            self.write(*b)?;
        }
        Ok(())
    }
    fn flush(&mut self) -> Result<(), Self::Error>;
    fn on_session_start(&mut self) -> Result<(), Self::Error>;
    fn on_session_end(&mut self) -> Result<(), Self::Error>;
    /// Blocks until one byte is available.
    fn read(&mut self) -> Result<u8, Self::Error>;
}

/// How long a blocking read waits for the stub before giving up.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

impl Connection for TcpStream {
    type Error = std::io::Error;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        std::io::Write::write_all(self, &[byte])
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        std::io::Write::write_all(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(self)
    }

    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        self.set_nodelay(true)?;
        self.set_read_timeout(Some(READ_TIMEOUT))
    }

    fn read(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8];
        std::io::Read::read_exact(self, &mut buf)?;
        Ok(buf[0])
    }

    fn on_session_end(&mut self) -> Result<(), Self::Error> {
        self.shutdown(std::net::Shutdown::Both)
    }
}
