//! Packet transport - acknowledgement, resend and reassembly.
//!
//! Every command is a single [`Session::exchange()`]: send the packet, wait
//! for `+` (resending on `-`), then receive and acknowledge the reply.
//!
//! There is no limit on resends and no timeout.  A link which keeps
//! corrupting packets blocks forever.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::string::String;
use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::Connection;
use crate::packet::{self, ACK, NACK, RLE_MARKER, RxEvent};
use crate::session::Session;
use crate::{Error, Result};

impl<C: Connection> Session<C> {
    /// Send a command and return the server's reply.
    ///
    /// Binary write commands are escaped, error replies are returned as
    /// [`Error::Remote`] and run-length encoded replies are expanded.
    pub fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        self.send_packet(command)?;
        let response = self.recv_packet()?;

        if let Some(err) = packet::error_reply(&response) {
            debug!("Command {} failed: {err}", String::from_utf8_lossy(command));
            return Err(err.into());
        }

        if response.contains(&RLE_MARKER) {
            packet::rle_decode(&response)
        } else {
            Ok(response)
        }
    }

    /// Send a packet and wait for it to be acknowledged, resending each time
    /// the server requests it.
    pub fn send_packet(&mut self, body: &[u8]) -> Result<()> {
        let frame = packet::encode(body);

        loop {
            trace!("Send {}", String::from_utf8_lossy(&frame));
            self.write(&frame)?;

            match self.read_ack()? {
                ACK => return Ok(()),
                NACK => warn!("Packet rejected, resending"),
                byte => return Err(Error::UnexpectedAck(byte)),
            }
        }
    }

    /// Receive the next packet with a valid checksum, and acknowledge it.
    ///
    /// Bytes outside packets are discarded.  Packets with bad checksums are
    /// negatively acknowledged and dropped, so the server resends them.
    /// Bytes after the returned packet stay buffered for the next call.  A
    /// read error discards any partially received packet.
    pub fn recv_packet(&mut self) -> Result<Vec<u8>> {
        loop {
            if self.rx_buf_index >= self.rx_buf_len {
                if let Err(e) = self.fill_rx_buf() {
                    self.parser.reset();
                    return Err(e);
                }
                continue;
            }

            let byte = self.rx_buf[self.rx_buf_index];
            self.rx_buf_index += 1;

            match self.parser.push(byte) {
                RxEvent::NeedMore => (),
                RxEvent::Packet => {
                    let body = self.parser.take_body();
                    trace!("Recv {}", String::from_utf8_lossy(&body));
                    self.write(&[ACK])?;
                    return Ok(body);
                }
                RxEvent::BadChecksum => {
                    warn!(
                        "Checksum mismatch on {}, requesting resend",
                        String::from_utf8_lossy(self.parser.body())
                    );
                    self.write(&[NACK])?;
                }
            }
        }
    }
}

// Internal functions
impl<C: Connection> Session<C> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.conn.write_all(data).map_err(|e| {
            warn!("Write failed: {e:?}");
            Error::Io
        })
    }

    fn read_ack(&mut self) -> Result<u8> {
        let mut ack = [0u8; 1];
        loop {
            let n = self.conn.read(&mut ack).map_err(|e| {
                warn!("Read failed: {e:?}");
                Error::Io
            })?;
            if n > 0 {
                return Ok(ack[0]);
            }
        }
    }

    fn fill_rx_buf(&mut self) -> Result<()> {
        let n = self.conn.read(&mut self.rx_buf).map_err(|e| {
            warn!("Read failed: {e:?}");
            Error::Io
        })?;
        self.rx_buf_len = n;
        self.rx_buf_index = 0;
        Ok(())
    }
}
