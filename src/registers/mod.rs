//! Register file capability.
//!
//! The session reads and writes whole register files with the `g` and `G`
//! commands.  The layout of the hex blob they carry is architecture
//! specific, so the session only deals in the [`Registers`] trait.
//!
//! The remote call engine additionally needs to set up a call frame and
//! retrieve a return value, which is what [`CallRegisters`] adds.
//!
//! [`RegisterFile`] wraps each supported layout, and is what
//! [`crate::Architecture::register_file()`] hands out.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod thumb;

pub use thumb::ThumbRegisters;

use alloc::vec::Vec;

use crate::Result;

/// A register file which can be transferred with `g`/`G`.
///
/// [`core::fmt::Display`] provides a human readable rendering.
pub trait Registers: core::fmt::Display {
    /// Encode into the architecture's `g` packet layout.
    fn encode(&self) -> Vec<u8>;

    /// Decode from the architecture's `g` packet layout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidLength`] if `data` is not exactly the
    /// architecture's register file length.
    fn decode(&mut self, data: &[u8]) -> Result<()>;
}

/// Register file operations needed to invoke a function on the target.
pub trait CallRegisters: Registers {
    /// Replace the register file with a fresh call frame.
    ///
    /// Arguments:
    /// - `entry` - Address of the function to call
    /// - `trap` - Address of the trap, whose preceding memory is used as the
    ///   stack
    /// - `return_addr` - Address the function returns to (normally `trap`)
    /// - `params` - Parameters, already checked to be no more than the
    ///   architecture supports
    fn prepare_call(&mut self, entry: u64, trap: u64, return_addr: u64, params: &[u64]);

    /// The function's return value, after the call completes
    fn return_value(&self) -> u64;
}

/// A register file for one of the supported architectures
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegisterFile {
    Thumb(ThumbRegisters),
}

impl core::fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RegisterFile::Thumb(regs) => regs.fmt(f),
        }
    }
}

impl Registers for RegisterFile {
    fn encode(&self) -> Vec<u8> {
        match self {
            RegisterFile::Thumb(regs) => regs.encode(),
        }
    }

    fn decode(&mut self, data: &[u8]) -> Result<()> {
        match self {
            RegisterFile::Thumb(regs) => regs.decode(data),
        }
    }
}

impl CallRegisters for RegisterFile {
    fn prepare_call(&mut self, entry: u64, trap: u64, return_addr: u64, params: &[u64]) {
        match self {
            RegisterFile::Thumb(regs) => regs.prepare_call(entry, trap, return_addr, params),
        }
    }

    fn return_value(&self) -> u64 {
        match self {
            RegisterFile::Thumb(regs) => regs.return_value(),
        }
    }
}
