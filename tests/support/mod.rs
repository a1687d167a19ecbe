//! Simulated GDB server for integration tests.
//!
//! Decodes framed commands written by the session, keeps memory, registers
//! and breakpoints, and queues acknowledgements and replies for the session
//! to read.  Continuing "executes" the function at the PC by looking it up
//! in [`SimTarget::functions`] and returning to the link register.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use airfrog_gdb::io::Connection;
use airfrog_gdb::packet;
use airfrog_gdb::registers::{Registers, ThumbRegisters};

pub type Function = fn(&[u32]) -> u32;

#[derive(Default)]
pub struct SimTarget {
    pending: VecDeque<u8>,
    last_reply: Vec<u8>,

    pub memory: BTreeMap<u64, u8>,
    pub regs: ThumbRegisters,
    pub breakpoints: BTreeSet<u64>,
    pub functions: BTreeMap<u64, Function>,

    /// Every command received, in order
    pub commands: Vec<String>,
    /// Every register file written with `G`
    pub reg_writes: Vec<ThumbRegisters>,
    /// Number of upcoming replies to corrupt before sending correctly
    pub corrupt_replies: usize,
    /// Number of upcoming commands to reject with a NACK
    pub reject_commands: usize,
    /// Maximum bytes returned by a single read, 0 for unlimited
    pub max_read: usize,
    /// Number of NACKs received from the session
    pub nacks: usize,
}

impl SimTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, addr: u64, function: Function) -> Self {
        self.functions.insert(addr, function);
        self
    }

    pub fn commands_starting(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn memory_at(&self, addr: u64, len: usize) -> Vec<u8> {
        (addr..addr + len as u64)
            .map(|a| self.memory.get(&a).copied().unwrap_or(0))
            .collect()
    }

    fn reply(&mut self, body: &[u8]) {
        let frame = packet::encode(body);
        self.pending.push_back(b'+');
        if self.corrupt_replies > 0 {
            self.corrupt_replies -= 1;
            let mut bad = frame.clone();
            let len = bad.len();
            let csum = packet::checksum(body).wrapping_add(1);
            bad[len - 2..].copy_from_slice(hex::encode([csum]).as_bytes());
            self.pending.extend(bad);
        } else {
            self.pending.extend(frame.iter().copied());
        }
        self.last_reply = frame;
    }

    fn handle(&mut self, command: &str) -> Vec<u8> {
        let (kind, args) = command.split_at(1);
        match kind {
            "m" => {
                let (addr, len) = parse_addr_len(args);
                hex::encode(self.memory_at(addr, len as usize)).into_bytes()
            }
            "M" => {
                let (range, data) = args.split_once(':').unwrap();
                let (addr, len) = parse_addr_len(range);
                let data = hex::decode(data).unwrap();
                assert_eq!(data.len() as u64, len);
                for (ii, byte) in data.into_iter().enumerate() {
                    self.memory.insert(addr + ii as u64, byte);
                }
                b"OK".to_vec()
            }
            "g" => hex::encode(self.regs.encode()).into_bytes(),
            "G" => {
                self.regs.decode(&hex::decode(args).unwrap()).unwrap();
                self.reg_writes.push(self.regs);
                b"OK".to_vec()
            }
            "c" => {
                if !args.is_empty() {
                    self.regs.program_counter = u32::from_str_radix(args, 16).unwrap();
                }
                self.run();
                b"S05".to_vec()
            }
            "Z" => {
                let addr = parse_breakpoint(args);
                self.breakpoints.insert(addr);
                b"OK".to_vec()
            }
            "z" => {
                let addr = parse_breakpoint(args);
                if self.breakpoints.remove(&addr) {
                    b"OK".to_vec()
                } else {
                    b"E01".to_vec()
                }
            }
            _ => Vec::new(),
        }
    }

    fn run(&mut self) {
        let pc = (self.regs.program_counter & !1) as u64;
        if let Some(&function) = self.functions.get(&pc) {
            self.regs.reg[0] = function(&self.regs.reg[..4]);
        }
        self.regs.program_counter = self.regs.link_register & !1;

        // Returning anywhere other than a planted trap means the target runs
        // off into the weeds
        let ret = self.regs.program_counter as u64;
        assert!(self.breakpoints.contains(&ret), "no breakpoint at {ret:#x}");
        assert_eq!(self.memory_at(ret, 4), [0xfe, 0xe7, 0xfe, 0xe7]);
    }
}

fn parse_addr_len(args: &str) -> (u64, u64) {
    let (addr, len) = args.split_once(',').unwrap();
    (
        u64::from_str_radix(addr, 16).unwrap(),
        u64::from_str_radix(len, 16).unwrap(),
    )
}

fn parse_breakpoint(args: &str) -> u64 {
    let mut fields = args.split(',');
    assert_eq!(fields.next(), Some("1"));
    let addr = u64::from_str_radix(fields.next().unwrap(), 16).unwrap();
    assert_eq!(fields.next(), Some("2"));
    addr
}

impl Connection for SimTarget {
    type Error = &'static str;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.pending.is_empty() {
            return Err("read with nothing pending");
        }
        let mut n = buf.len().min(self.pending.len());
        if self.max_read > 0 {
            n = n.min(self.max_read);
        }
        for byte in buf.iter_mut().take(n) {
            *byte = self.pending.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        match data {
            b"+" => Ok(()),
            b"-" => {
                self.nacks += 1;
                let frame = self.last_reply.clone();
                self.pending.extend(frame);
                Ok(())
            }
            [b'$', rest @ ..] => {
                let hash = rest.iter().position(|&b| b == b'#').ok_or("no #")?;
                let body = &rest[..hash];
                let csum = &rest[hash + 1..];
                assert_eq!(csum, hex::encode([packet::checksum(body)]).as_bytes());

                if self.reject_commands > 0 {
                    self.reject_commands -= 1;
                    self.pending.push_back(b'-');
                    return Ok(());
                }

                let command = String::from_utf8(body.to_vec()).map_err(|_| "not utf-8")?;
                let reply = self.handle(&command);
                self.commands.push(command);
                self.reply(&reply);
                Ok(())
            }
            _ => Err("unexpected write"),
        }
    }
}
