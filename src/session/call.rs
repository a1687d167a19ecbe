//! Remote function calls.
//!
//! A call is made by planting a trap (a branch-to-self with a breakpoint on
//! it) at the top of a work area in target RAM, setting the registers up as
//! if the function had been called from the trap, and running until the
//! breakpoint is hit.  The return value is then read from the registers.
//!
//! The trap is cached by the session.  Calls using the same work area re-use
//! it, and only a change of work area causes the old breakpoint to be
//! removed and a new trap to be planted.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::Connection;
use crate::registers::CallRegisters;
use crate::session::Session;
use crate::{Error, Result};

/// Parameters for [`Session::call()`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallParameters<'a> {
    /// Address of the function to call
    pub addr: u64,
    /// Address just past the end of the work area.  The last word holds the
    /// trap, and the stack grows down from below it.
    pub work_area_top: u64,
    /// Function parameters, passed in registers
    pub params: &'a [u64],
    /// Don't save the registers before the call and restore them after
    pub skip_restore_context: bool,
    /// Don't read the return value - [`Session::call()`] returns 0
    pub ignore_return_value: bool,
    /// Return to this address instead of the trap.  Execution must still
    /// stop somewhere for the call to complete.
    pub return_addr: Option<u64>,
}

impl<C: Connection> Session<C> {
    /// Call a function on the target, blocking until it returns.
    ///
    /// Returns the function's return value, or 0 if
    /// [`CallParameters::ignore_return_value`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyParameters`], without touching the target, if
    /// more parameters are given than the architecture passes in registers.
    /// Any other error aborts the call part way through - the target's
    /// registers are not restored.
    pub fn call(&mut self, params: &CallParameters<'_>) -> Result<u64> {
        let arch = self.config.architecture;
        let max = arch.max_call_params();
        if params.params.len() > max {
            return Err(Error::TooManyParameters {
                max,
                actual: params.params.len(),
            });
        }

        let trap = params.work_area_top.wrapping_sub(arch.trap_instruction().len() as u64);
        self.plant_trap(trap)?;

        let saved = if params.skip_restore_context {
            None
        } else {
            let mut saved = arch.register_file();
            self.registers_read(&mut saved)?;
            Some(saved)
        };

        let mut regs = arch.register_file();
        regs.prepare_call(
            params.addr,
            trap,
            params.return_addr.unwrap_or(trap),
            params.params,
        );
        trace!("Call registers: {regs}");

        self.registers_write(&regs)?;
        self.continue_execution(None)?;

        let result = if params.ignore_return_value {
            0
        } else {
            self.registers_read(&mut regs)?;
            regs.return_value()
        };
        debug!("Call to {:#x} returned {result:#x}", params.addr);

        if let Some(saved) = saved {
            self.registers_write(&saved)?;
        }

        Ok(result)
    }

    /// Remove the trap breakpoint planted by [`Session::call()`].
    ///
    /// The next call plants the trap again.  Does nothing if no trap is
    /// planted.
    pub fn release_trap(&mut self) -> Result<()> {
        if let Some(breakpoint) = self.trap.take() {
            breakpoint.cancel(self)?;
        }
        Ok(())
    }
}

// Internal functions
impl<C: Connection> Session<C> {
    fn plant_trap(&mut self, trap: u64) -> Result<()> {
        if self.cached_trap() == Some(trap) {
            trace!("Re-using trap at {trap:#x}");
            return Ok(());
        }

        // The old trap may no longer be reachable, so failing to remove its
        // breakpoint doesn't stop us planting the new one
        if let Some(old) = self.trap.take() {
            if let Err(e) = old.cancel(self) {
                debug!("Ignoring failure to clear old trap at {:#x}: {e}", old.addr);
            }
        }

        let instruction = self.config.architecture.trap_instruction();
        self.memory_write(trap, instruction)?;
        let breakpoint = self.breakpoint_set(trap)?;
        self.trap = Some(breakpoint);

        debug!("Trap planted at {trap:#x}");
        Ok(())
    }
}
