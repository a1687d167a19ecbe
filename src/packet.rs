//! RSP packet encoding and decoding.
//!
//! Outbound packets are framed as `$<body>#<checksum>`, where the checksum is
//! the sum of the body bytes modulo 256, as two lowercase hex digits.
//! Binary write (`x`) commands have `$`, `#` and `}` escaped before framing.
//!
//! Inbound packets are parsed a byte at a time by [`PacketParser`], so a
//! packet may arrive split across any number of reads.  Inbound bodies may
//! be run-length encoded (see [`rle_decode()`]) and may be error replies (see
//! [`error_reply()`]).

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec::Vec;

use crate::{Error, GdbError, Result};

/// Start of packet
pub const PACKET_START: u8 = b'$';
/// End of packet body, followed by the two checksum digits
pub const PACKET_END: u8 = b'#';
/// Escape byte for binary data
pub const ESCAPE: u8 = 0x7d;
/// Run-length marker
pub const RLE_MARKER: u8 = b'*';
/// Offset subtracted from the byte following [`RLE_MARKER`] to get the repeat
/// count
pub const RLE_OFFSET: u8 = 29;
/// Positive acknowledgement
pub const ACK: u8 = b'+';
/// Negative acknowledgement - resend
pub const NACK: u8 = b'-';

/// First byte of the binary memory write command, whose data must be escaped
const BINARY_WRITE: u8 = b'x';

/// Calculates the RSP checksum for the given data.
///
/// The checksum is the sum of all bytes modulo 256.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &x| acc.wrapping_add(x))
}

/// Prefixes every `$`, `#` and `}` in `data` with the escape byte.
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        if matches!(byte, PACKET_START | PACKET_END | ESCAPE) {
            out.push(ESCAPE);
        }
        out.push(byte);
    }
    out
}

/// Encodes an outgoing command with RSP framing.
///
/// Format: `$<body>#<checksum>`
///
/// Binary write commands are escaped first, and the checksum covers the
/// escaped body as sent.
pub fn encode(body: &[u8]) -> Vec<u8> {
    let escaped;
    let body = if body.first() == Some(&BINARY_WRITE) {
        escaped = escape(body);
        &escaped[..]
    } else {
        body
    };

    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(PACKET_START);
    out.extend_from_slice(body);
    out.push(PACKET_END);
    out.extend_from_slice(hex::encode([checksum(body)]).as_bytes());
    out
}

/// Expands `*` run-length markers in a received packet body.
///
/// `X*N` means `X` followed by `N - 29` further copies of `X`.  A marker at
/// the start of the body, or without a count byte after it, is an error.
pub fn rle_decode(payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len());
    let mut iter = payload.iter().copied();

    while let Some(byte) = iter.next() {
        if byte != RLE_MARKER {
            out.push(byte);
            continue;
        }

        let Some(&last) = out.last() else {
            return Err(Error::InvalidRle);
        };
        let repeat = iter
            .next()
            .and_then(|count| count.checked_sub(RLE_OFFSET))
            .ok_or(Error::InvalidRle)?;

        out.extend(core::iter::repeat_n(last, repeat as usize));
    }

    Ok(out)
}

/// Checks whether a received packet body is an `Exx` error reply.
///
/// Only `E` followed by exactly two decimal digits counts.  Anything else,
/// including a lone `E` or a hex code, is treated as ordinary data.
pub fn error_reply(payload: &[u8]) -> Option<GdbError> {
    match *payload {
        [b'E', high, low] if high.is_ascii_digit() && low.is_ascii_digit() => Some(GdbError {
            code: (high - b'0') * 10 + (low - b'0'),
        }),
        _ => None,
    }
}

/// Receive state, preserved between reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum RxState {
    /// Discarding everything up to a `$`
    #[default]
    AwaitStart,
    /// Collecting body bytes up to the `#`
    Body,
    /// Next byte is the checksum's high digit
    ChecksumHigh,
    /// Next byte is the checksum's low digit
    ChecksumLow,
}

/// Result of feeding a single byte to a [`PacketParser`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Packet is incomplete, or no packet has started
    NeedMore,
    /// A complete packet with a valid checksum - retrieve it with
    /// [`PacketParser::take_body()`]
    Packet,
    /// A complete packet whose checksum did not match, or was not hex.  It
    /// has been discarded.
    BadChecksum,
}

/// Incremental parser for inbound packets.
#[derive(Debug, Default)]
pub struct PacketParser {
    state: RxState,
    body: Vec<u8>,
    checksum: [u8; 2],
}

impl PacketParser {
    /// Create a new parser, waiting for the start of a packet
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next received byte to the parser
    pub fn push(&mut self, byte: u8) -> RxEvent {
        match self.state {
            RxState::AwaitStart => {
                if byte == PACKET_START {
                    self.body.clear();
                    self.state = RxState::Body;
                }
            }
            RxState::Body => {
                if byte == PACKET_END {
                    self.state = RxState::ChecksumHigh;
                } else {
                    self.body.push(byte);
                }
            }
            RxState::ChecksumHigh => {
                self.checksum[0] = byte;
                self.state = RxState::ChecksumLow;
            }
            RxState::ChecksumLow => {
                self.checksum[1] = byte;
                self.state = RxState::AwaitStart;

                let mut remote = [0u8; 1];
                let valid = hex::decode_to_slice(self.checksum, &mut remote).is_ok()
                    && remote[0] == checksum(&self.body);
                return if valid {
                    RxEvent::Packet
                } else {
                    RxEvent::BadChecksum
                };
            }
        }

        RxEvent::NeedMore
    }

    /// Body of the packet most recently completed
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Take the body of the packet most recently completed, leaving the
    /// parser's buffer empty
    pub fn take_body(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.body)
    }

    /// Discard any partial packet
    pub fn reset(&mut self) {
        self.state = RxState::AwaitStart;
        self.body.clear();
    }
}
