//! GDB Remote Serial Protocol (RSP) client for controlling ARM targets, including synchronous
//! remote function calls.
//!
//! This crate drives a debug target through any GDB server - OpenOCD, pyOCD, a Black Magic
//! Probe, QEMU - over a duplex byte stream such as a TCP socket or UART.  On top of memory,
//! register and execution control it allows the host to call functions on the target as if
//! they were local, using the target as a co-processor.
//!
//! `no_std`, requires `alloc`.  The default `std` feature adds an adapter for standard library
//! streams.
//!
//! ## Architecture
//!
//! The crate is layered, leaves first:
//! - **Packet codec** ([`packet`]) - framing, checksums, escaping, run-length decoding and
//!   error reply detection
//! - **Transport** ([`Session::exchange()`]) - acknowledgement and resend, reassembly of
//!   packets from arbitrarily chunked reads
//! - **Memory and registers** ([`Session::memory_read()`], [`Session::registers_read()`],
//!   etc) - chunked to the configured transfer sizes
//! - **Execution control** ([`Session::continue_execution()`], [`Session::breakpoint_set()`])
//! - **Remote calls** ([`Session::call()`])
//!
//! Everything is blocking.  Every operation is a complete request/response round trip, and
//! there are no timeouts - a GDB server which stops responding blocks the caller.
//!
//! A [`Session`] is not re-entrant.  If it must be shared between threads, wrap it in a
//! mutex.
//!
//! ## Remote calls
//!
//! To call a function the target must provide a small "work area" of RAM which the host may
//! scribble over.  The top word of the work area is used for a trap - a branch-to-self
//! instruction with a breakpoint on it - which the called function returns to.  The
//! remainder of the work area is used as the function's stack.
//!
//! The trap is planted on the first call and re-used for subsequent calls using the same
//! work area, so a sequence of calls costs only the register writes, run and register reads.
//!
//! ## Modules
//!
//! - [`io`] - [`io::Connection`] trait for the byte stream to the GDB server
//! - [`packet`] - RSP packet encoding and decoding
//! - [`registers`] - Register file capability and per-architecture register layouts
//! - [`session`] - The GDB session itself
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::net::TcpStream;
//! use airfrog_gdb::io::StdConnection;
//! use airfrog_gdb::{CallParameters, Session, SessionConfig};
//!
//! # fn main() -> Result<(), airfrog_gdb::Error> {
//! let stream = TcpStream::connect("localhost:3333").map_err(|_| airfrog_gdb::Error::Io)?;
//! let mut session = Session::new(StdConnection::new(stream), SessionConfig::default());
//!
//! // Call a function at 0x0800_1000, using 0x2000_0000-0x2000_1000 as the work area
//! let sum = session.call(&CallParameters {
//!     addr: 0x0800_1000,
//!     work_area_top: 0x2000_1000,
//!     params: &[5, 7],
//!     ..Default::default()
//! })?;
//! # let _ = sum;
//! # Ok(())
//! # }
//! ```

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod io;
pub mod packet;
pub mod registers;
pub mod session;

pub use registers::{CallRegisters, RegisterFile, Registers, ThumbRegisters};
pub use session::{Architecture, Breakpoint, CallParameters, Session, SessionConfig};

/// Error reply (`Exx`) returned by the GDB server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GdbError {
    /// Error code supplied by the server.  Its meaning is server specific.
    pub code: u8,
}

impl core::fmt::Display for GdbError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GDB error code {}", self.code)
    }
}

/// GDB client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Underlying connection read or write failed
    Io,
    /// Received something other than `+` or `-` when waiting for an
    /// acknowledgement
    UnexpectedAck(u8),
    /// GDB server returned an error reply
    Remote(GdbError),
    /// Malformed run-length encoding in a received packet
    InvalidRle,
    /// Response was not valid hex
    InvalidHex,
    /// Decoded data was the wrong length
    InvalidLength { expected: usize, actual: usize },
    /// More call parameters than can be passed in registers
    TooManyParameters { max: usize, actual: usize },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Io => write!(f, "connection I/O error"),
            Error::UnexpectedAck(byte) => write!(f, "unexpected acknowledgment: {byte:02x}"),
            Error::Remote(err) => write!(f, "{err}"),
            Error::InvalidRle => write!(f, "invalid RLE encoding"),
            Error::InvalidHex => write!(f, "invalid hex data"),
            Error::InvalidLength { expected, actual } => {
                write!(f, "invalid data length: expected {expected}, got {actual}")
            }
            Error::TooManyParameters { max, actual } => {
                write!(f, "too many parameters for call: {actual} (max {max})")
            }
        }
    }
}

impl core::error::Error for Error {}

impl From<GdbError> for Error {
    fn from(err: GdbError) -> Self {
        Error::Remote(err)
    }
}

/// Type to represent the result of a GDB operation
pub type Result<T> = core::result::Result<T, Error>;
