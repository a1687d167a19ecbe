//! ARM Thumb (Cortex-M) register file.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec;
use alloc::vec::Vec;

use crate::registers::{CallRegisters, Registers};
use crate::{Error, Result};

/// Length of the Thumb `g` packet register file in bytes.
///
/// R0-R15 occupy the first 64 bytes, followed by the legacy FPA registers
/// (which are not used), with XPSR in the final word.
pub const THUMB_REGISTERS_LEN: usize = 168;

/// Number of parameters which can be passed in registers (R0-R3)
pub const THUMB_MAX_PARAMS: usize = 4;

/// XPSR for a call - Thumb state bit set, plus the Z flag
pub const THUMB_CALL_XPSR: u32 = 0x4100_0000;

const SP_OFFSET: usize = 52;
const LR_OFFSET: usize = 56;
const PC_OFFSET: usize = 60;
const XPSR_OFFSET: usize = 164;

/// ARM Thumb register file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThumbRegisters {
    /// R0-R12
    pub reg: [u32; 13],
    /// R13
    pub stack_pointer: u32,
    /// R14
    pub link_register: u32,
    /// R15
    pub program_counter: u32,
    pub xpsr: u32,
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

impl Registers for ThumbRegisters {
    fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; THUMB_REGISTERS_LEN];

        for (ii, reg) in self.reg.iter().enumerate() {
            put_u32(&mut data, ii * 4, *reg);
        }
        put_u32(&mut data, SP_OFFSET, self.stack_pointer);
        put_u32(&mut data, LR_OFFSET, self.link_register);
        put_u32(&mut data, PC_OFFSET, self.program_counter);
        put_u32(&mut data, XPSR_OFFSET, self.xpsr);

        data
    }

    fn decode(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != THUMB_REGISTERS_LEN {
            return Err(Error::InvalidLength {
                expected: THUMB_REGISTERS_LEN,
                actual: data.len(),
            });
        }

        for (ii, reg) in self.reg.iter_mut().enumerate() {
            *reg = get_u32(data, ii * 4);
        }
        self.stack_pointer = get_u32(data, SP_OFFSET);
        self.link_register = get_u32(data, LR_OFFSET);
        self.program_counter = get_u32(data, PC_OFFSET);
        self.xpsr = get_u32(data, XPSR_OFFSET);

        Ok(())
    }
}

impl CallRegisters for ThumbRegisters {
    fn prepare_call(&mut self, entry: u64, trap: u64, return_addr: u64, params: &[u64]) {
        // Registers are 32-bit, so addresses and parameters are truncated
        *self = Self {
            stack_pointer: (trap as u32).wrapping_sub(4),
            link_register: return_addr as u32 | 1,
            program_counter: entry as u32 | 1,
            xpsr: THUMB_CALL_XPSR,
            ..Default::default()
        };

        for (reg, param) in self.reg.iter_mut().zip(params.iter().take(THUMB_MAX_PARAMS)) {
            *reg = *param as u32;
        }
    }

    fn return_value(&self) -> u64 {
        self.reg[0] as u64
    }
}

impl core::fmt::Display for ThumbRegisters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (ii, reg) in self.reg.iter().enumerate() {
            write!(f, "R{ii}: {reg:08x} ")?;
        }
        write!(
            f,
            "SP: {:08x} LR: {:08x} PC: {:08x} XPSR: {:08x}",
            self.stack_pointer, self.link_register, self.program_counter, self.xpsr
        )
    }
}
