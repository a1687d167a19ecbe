//! Duplex byte-stream trait used to talk to a GDB server.
//!
//! The [`crate::session::Session`] only ever reads and writes raw bytes - it
//! has no knowledge of what carries them.
//!
//! # Possible implementations
//!
//! - For PC-based applications: a TCP socket connected to OpenOCD, pyOCD,
//!   a Black Magic Probe, QEMU's gdbstub, etc.
//! - For accessing embedded devices: a UART connected to a probe exposing a
//!   GDB server
//! - For testing: an in-memory script or simulated GDB server
//!
//! With the `std` feature, [`StdConnection`] wraps any
//! [`std::io::Read`] + [`std::io::Write`] object.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

/// Connection trait.
pub trait Connection {
    /// The error type returned by read and write operations.
    ///
    /// This allows implementations to use their own error types
    /// (e.g., `std::io::Error` for sockets, custom errors for UARTs).
    type Error: core::fmt::Debug;

    /// Read whatever bytes are available into `buf`, blocking until at least
    /// one read attempt completes.
    ///
    /// Returns the number of bytes read.  Returning 0 means nothing arrived
    /// this time, and the caller reads again.  A connection which has been
    /// closed must return an error instead.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write all of `data` to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails or the connection has
    /// gone away.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

impl<T: Connection + ?Sized> Connection for &mut T {
    type Error = T::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write_all(data)
    }
}

/// [`Connection`] implementation for standard library streams, such as
/// [`std::net::TcpStream`] or a serial port object.
///
/// ```rust,no_run
/// use std::net::TcpStream;
/// use airfrog_gdb::io::StdConnection;
/// use airfrog_gdb::{Session, SessionConfig};
///
/// let stream = TcpStream::connect("localhost:3333").unwrap();
/// let mut session = Session::new(StdConnection::new(stream), SessionConfig::default());
/// ```
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StdConnection<T> {
    inner: T,
}

#[cfg(feature = "std")]
impl<T: std::io::Read + std::io::Write> StdConnection<T> {
    /// Wrap a stream
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Return the wrapped stream
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<T: std::io::Read + std::io::Write> Connection for StdConnection<T> {
    type Error = std::io::Error;

    /// A read of 0 bytes into a non-empty buffer is end of stream, and is
    /// returned as [`std::io::ErrorKind::UnexpectedEof`].
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match std::io::Read::read(&mut self.inner, buf)? {
            0 if !buf.is_empty() => Err(std::io::ErrorKind::UnexpectedEof.into()),
            n => Ok(n),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        std::io::Write::write_all(&mut self.inner, data)?;
        std::io::Write::flush(&mut self.inner)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::{Error, Session, SessionConfig};
    use std::io::{Cursor, Read, Write};

    // Reads from a script, and discards writes
    struct Stream {
        rx: Cursor<Vec<u8>>,
    }

    impl Read for Stream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.rx.read(buf)
        }
    }

    impl Write for Stream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn connection(rx: &[u8]) -> StdConnection<Stream> {
        StdConnection::new(Stream {
            rx: Cursor::new(rx.to_vec()),
        })
    }

    #[test]
    fn test_read_eof_is_error() {
        let mut conn = connection(b"+");
        let mut buf = [0u8; 4];
        assert_eq!(Connection::read(&mut conn, &mut buf).unwrap(), 1);
        let err = Connection::read(&mut conn, &mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_empty_buffer() {
        let mut conn = connection(b"");
        let mut buf = [0u8; 0];
        assert_eq!(Connection::read(&mut conn, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_exchange_closed_mid_reply() {
        let mut session = Session::new(connection(b"+$O"), SessionConfig::default());
        assert_eq!(session.exchange(b"g"), Err(Error::Io));
    }

    #[test]
    fn test_exchange_closed_before_ack() {
        let mut session = Session::new(connection(b""), SessionConfig::default());
        assert_eq!(session.exchange(b"g"), Err(Error::Io));
    }

    #[test]
    fn test_exchange() {
        let mut session = Session::new(connection(b"+$OK#9a"), SessionConfig::default());
        assert_eq!(session.exchange(b"G00").unwrap(), b"OK");
    }
}
