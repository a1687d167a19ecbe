//! GDB session - one connection to one GDB server.
//!
//! [`Session`] owns the [`Connection`] and all protocol state.  Its operations
//! are split by layer:
//! - [`transport`] - packet send/receive and the [`Session::exchange()`]
//!   primitive everything else is built on
//! - [`memory`] - memory and register access
//! - [`control`] - continue and breakpoints
//! - [`call`] - remote function calls

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod call;
pub mod control;
pub mod memory;
pub mod transport;

pub use call::CallParameters;
pub use control::Breakpoint;

use crate::io::Connection;
use crate::packet::PacketParser;
use crate::registers::thumb::THUMB_MAX_PARAMS;
use crate::registers::{RegisterFile, ThumbRegisters};

/// Transfer size used when a configured maximum is 0
pub const DEFAULT_MAX_TRANSFER_SIZE: usize = 1024;

/// Size of the inbound buffer
pub const RX_BUF_SIZE: usize = 2048;

/// Target architecture
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Architecture {
    /// ARM Cortex-M, Thumb instruction set
    #[default]
    Thumb,
}

impl Architecture {
    /// Size argument for `Z1`/`z1` breakpoint commands.
    ///
    /// Some architectures have variable breakpoint sizes depending on the
    /// instruction.  2 is valid for all Thumb trap locations used here.
    pub const fn breakpoint_size(&self) -> u64 {
        match self {
            Architecture::Thumb => 2,
        }
    }

    /// Instruction sequence written at the trap location.
    ///
    /// For Thumb two `b .` instructions, so the trap is hit whichever
    /// halfword execution lands on.
    pub const fn trap_instruction(&self) -> &'static [u8] {
        match self {
            Architecture::Thumb => &[0xfe, 0xe7, 0xfe, 0xe7],
        }
    }

    /// Maximum number of parameters a call can pass in registers
    pub const fn max_call_params(&self) -> usize {
        match self {
            Architecture::Thumb => THUMB_MAX_PARAMS,
        }
    }

    /// A zeroed register file for this architecture
    pub fn register_file(&self) -> RegisterFile {
        match self {
            Architecture::Thumb => RegisterFile::Thumb(ThumbRegisters::default()),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Target architecture
    pub architecture: Architecture,
    /// Maximum bytes per `M` command.  0 means [`DEFAULT_MAX_TRANSFER_SIZE`].
    pub max_write_size: usize,
    /// Maximum bytes per `m` command.  0 means [`DEFAULT_MAX_TRANSFER_SIZE`].
    pub max_read_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::default(),
            max_write_size: DEFAULT_MAX_TRANSFER_SIZE,
            max_read_size: DEFAULT_MAX_TRANSFER_SIZE,
        }
    }
}

/// A GDB session.
///
/// Example usage:
///
/// ```rust,no_run
/// use airfrog_gdb::{Session, SessionConfig};
/// # fn example(conn: impl airfrog_gdb::io::Connection) -> airfrog_gdb::Result<()> {
/// let mut session = Session::new(conn, SessionConfig::default());
///
/// let mut buf = [0u8; 16];
/// session.memory_read(0x0800_0000, &mut buf)?;
/// session.memory_write(0x2000_0000, &buf)?;
/// # Ok(())
/// # }
/// ```
pub struct Session<C: Connection> {
    conn: C,
    config: SessionConfig,

    rx_buf: [u8; RX_BUF_SIZE],
    rx_buf_len: usize,
    rx_buf_index: usize,
    parser: PacketParser,

    // Breakpoint on the trap planted by the call engine
    trap: Option<Breakpoint>,
}

impl<C: Connection> Session<C> {
    /// Create a new session over an established connection.
    ///
    /// Nothing is sent to the server until the first operation.
    pub fn new(conn: C, mut config: SessionConfig) -> Self {
        if config.max_write_size == 0 {
            config.max_write_size = DEFAULT_MAX_TRANSFER_SIZE;
        }
        if config.max_read_size == 0 {
            config.max_read_size = DEFAULT_MAX_TRANSFER_SIZE;
        }

        Self {
            conn,
            config,
            rx_buf: [0; RX_BUF_SIZE],
            rx_buf_len: 0,
            rx_buf_index: 0,
            parser: PacketParser::new(),
            trap: None,
        }
    }

    /// The session's configuration, with defaults applied
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Address of the trap planted by [`Session::call()`], if any
    pub fn cached_trap(&self) -> Option<u64> {
        self.trap.map(|bp| bp.addr)
    }

    /// Consume the session, returning the connection.
    ///
    /// Any planted trap breakpoint is left in place - use
    /// [`Session::release_trap()`] first to remove it.
    pub fn into_inner(self) -> C {
        self.conn
    }
}
