//! Execution control - continue and breakpoints.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::format;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::Result;
use crate::io::Connection;
use crate::session::Session;

/// A breakpoint planted with `Z1`.
///
/// Remove it with [`Breakpoint::cancel()`].  Cancelling sends `z1` each time
/// it is called, so only cancel a breakpoint once - a second `z1` for a
/// breakpoint which no longer exists is likely to error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    /// Address of the breakpoint
    pub addr: u64,
    /// Architecture specific breakpoint size
    pub size: u64,
}

impl Breakpoint {
    /// Remove this breakpoint from the target
    pub fn cancel<C: Connection>(&self, session: &mut Session<C>) -> Result<()> {
        session.breakpoint_clear(self)
    }
}

impl<C: Connection> Session<C> {
    /// Start or resume execution, and block until the target stops.
    ///
    /// Arguments:
    /// - `addr` - If given, resume at this address instead of the current PC.
    ///   The Thumb bit is set.
    pub fn continue_execution(&mut self, addr: Option<u64>) -> Result<()> {
        match addr {
            Some(addr) => {
                let addr = addr | 1;
                debug!("Continue at {addr:#x}");
                self.exchange(format!("c{addr:x}").as_bytes())?;
            }
            None => {
                debug!("Continue");
                self.exchange(b"c")?;
            }
        }
        debug!("Target stopped");
        Ok(())
    }

    /// Plant a breakpoint at `addr`.
    ///
    /// Returns a [`Breakpoint`] which can be used to remove it again.
    pub fn breakpoint_set(&mut self, addr: u64) -> Result<Breakpoint> {
        let breakpoint = Breakpoint {
            addr,
            size: self.config.architecture.breakpoint_size(),
        };

        self.exchange(format!("Z1,{addr:x},{:x}", breakpoint.size).as_bytes())?;
        info!("Breakpoint set at {addr:#x}");

        Ok(breakpoint)
    }

    /// Remove a breakpoint previously planted by [`Session::breakpoint_set()`]
    pub fn breakpoint_clear(&mut self, breakpoint: &Breakpoint) -> Result<()> {
        let Breakpoint { addr, size } = *breakpoint;
        self.exchange(format!("z1,{addr:x},{size:x}").as_bytes())?;
        debug!("Breakpoint cleared at {addr:#x}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionConfig;
    use crate::packet;
    use crate::session::mock::MockConnection;
    use alloc::vec::Vec;

    fn session(bodies: &[&[u8]]) -> Session<MockConnection> {
        let mut conn = MockConnection::default();
        for body in bodies {
            conn.reads.push_back(b"+".to_vec());
            conn.reads.push_back(packet::encode(body));
        }
        Session::new(conn, SessionConfig::default())
    }

    fn sent(session: Session<MockConnection>) -> Vec<u8> {
        session.into_inner().written
    }

    fn frames(bodies: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for body in bodies {
            out.extend(packet::encode(body));
            out.push(b'+');
        }
        out
    }

    #[test]
    fn test_continue() {
        let mut session = session(&[b"S05"]);
        session.continue_execution(None).unwrap();
        assert_eq!(sent(session), frames(&[b"c"]));
    }

    #[test]
    fn test_continue_at_sets_thumb_bit() {
        let mut session = session(&[b"S05", b"T05"]);
        session.continue_execution(Some(0x0800_0100)).unwrap();
        session.continue_execution(Some(0x0800_0201)).unwrap();
        assert_eq!(sent(session), frames(&[b"c8000101", b"c8000201"]));
    }

    #[test]
    fn test_breakpoint_set_and_cancel() {
        let mut session = session(&[b"OK", b"OK"]);
        let bp = session.breakpoint_set(0x2000_0ffc).unwrap();
        assert_eq!(
            bp,
            Breakpoint {
                addr: 0x2000_0ffc,
                size: 2
            }
        );
        bp.cancel(&mut session).unwrap();
        assert_eq!(sent(session), frames(&[b"Z1,20000ffc,2", b"z1,20000ffc,2"]));
    }

    #[test]
    fn test_breakpoint_cancel_resends() {
        let mut session = session(&[b"OK", b"OK", b"E01"]);
        let bp = session.breakpoint_set(0x100).unwrap();
        bp.cancel(&mut session).unwrap();
        assert!(bp.cancel(&mut session).is_err());
        assert_eq!(
            sent(session),
            frames(&[b"Z1,100,2", b"z1,100,2", b"z1,100,2"])
        );
    }

    #[test]
    fn test_breakpoint_set_error() {
        let mut session = session(&[b"E22"]);
        assert_eq!(
            session.breakpoint_set(0x100),
            Err(crate::Error::Remote(crate::GdbError { code: 22 }))
        );
    }
}
