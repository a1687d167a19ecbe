//! Memory and register access.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::Connection;
use crate::registers::Registers;
use crate::session::Session;
use crate::{Error, Result};

impl<C: Connection> Session<C> {
    /// Read target memory into `buf`.
    ///
    /// Split into `m` commands of at most the configured `max_read_size`.
    ///
    /// Arguments:
    /// - `addr` - Absolute address to read from (e.g., `0x08000200`)
    /// - `buf` - Buffer to fill
    pub fn memory_read(&mut self, mut addr: u64, buf: &mut [u8]) -> Result<()> {
        for chunk in buf.chunks_mut(self.config.max_read_size) {
            let response = self.exchange(format!("m{addr:x},{:x}", chunk.len()).as_bytes())?;

            let data = decode_hex(&response)?;
            if data.len() != chunk.len() {
                return Err(Error::InvalidLength {
                    expected: chunk.len(),
                    actual: data.len(),
                });
            }
            chunk.copy_from_slice(&data);

            addr += chunk.len() as u64;
        }

        Ok(())
    }

    /// Read `len` bytes of target memory into a new buffer
    pub fn memory_read_vec(&mut self, addr: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.memory_read(addr, &mut buf)?;
        Ok(buf)
    }

    /// Write `data` to target memory.
    ///
    /// Split into `M` commands of at most the configured `max_write_size`.
    pub fn memory_write(&mut self, mut addr: u64, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(self.config.max_write_size) {
            let command = format!("M{addr:08x},{:x}:{}", chunk.len(), hex::encode(chunk));
            self.exchange(command.as_bytes())?;

            addr += chunk.len() as u64;
        }

        Ok(())
    }

    /// Read the target's register file into `regs`
    pub fn registers_read<R: Registers + ?Sized>(&mut self, regs: &mut R) -> Result<()> {
        let response = self.exchange(b"g")?;
        let data = decode_hex(&response)?;
        regs.decode(&data)
    }

    /// Write `regs` to the target's register file
    pub fn registers_write<R: Registers + ?Sized>(&mut self, regs: &R) -> Result<()> {
        let command = format!("G{}", hex::encode(regs.encode()));
        self.exchange(command.as_bytes())?;
        Ok(())
    }
}

fn decode_hex(data: &[u8]) -> Result<Vec<u8>> {
    hex::decode(data).map_err(|e| {
        debug!("Invalid hex in response: {e}");
        Error::InvalidHex
    })
}
