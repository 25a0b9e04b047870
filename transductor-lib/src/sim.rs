//! Minimal transductor emulator: answers read-holding-registers
//! requests out of an in-memory register bank. Backs the
//! `transductor-sim` binary and serves as the loopback peer in the
//! transport tests.

use std::collections::HashMap;

use log::debug;

use crate::protocol::crc16;

#[derive(Debug, Clone, Default)]
pub struct RegisterBank {
    registers: HashMap<u16, u16>,
}

impl RegisterBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_integer(&mut self, address: u16, value: i16) {
        self.registers.insert(address, value as u16);
    }

    /// Store a float across two consecutive registers, low half first,
    /// matching the word order the transductors put on the wire.
    pub fn set_float(&mut self, address: u16, value: f32) {
        let bits = value.to_bits();
        self.registers.insert(address, (bits & 0xFFFF) as u16);
        self.registers.insert(address.wrapping_add(1), (bits >> 16) as u16);
    }

    /// Answer one request frame. `None` when the frame is not a well
    /// formed read-holding-registers request; a real device stays
    /// silent on garbage, and so does the emulator.
    pub fn handle_request(&self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame.len() != 8 || crc16(frame) != 0 {
            return None;
        }
        if frame[0] != 0x01 || frame[1] != 0x03 {
            return None;
        }

        let address = u16::from_be_bytes([frame[2], frame[3]]);
        let quantity = u16::from_be_bytes([frame[4], frame[5]]);
        if quantity == 0 || quantity > 2 {
            return None;
        }

        let mut reply = vec![0x01, 0x03, (quantity * 2) as u8];
        for i in 0..quantity {
            let word = self
                .registers
                .get(&address.wrapping_add(i))
                .copied()
                .unwrap_or(0);
            reply.extend_from_slice(&word.to_be_bytes());
        }

        let cs = crc16(&reply);
        reply.extend_from_slice(&cs.to_le_bytes());

        debug!("reply {:02X?}", reply);
        Some(reply)
    }
}
