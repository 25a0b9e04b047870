use anyhow::Result;
use crc::{Crc, CRC_16_MODBUS};
use log::debug;

use super::{CodecKind, ProtocolError, SerialCodec};
use crate::device::{RawRegister, RegisterKind};

/// Unit id the transductors answer on.
const UNIT_ID: u8 = 0x01;
/// Read-holding-registers, the only function code the devices speak.
const FUNCTION_READ: u8 = 0x03;

pub(crate) fn crc16(data: &[u8]) -> u16 {
    let crc = Crc::<u16>::new(&CRC_16_MODBUS);
    crc.checksum(data)
}

fn encode_read_request(address: u16, quantity: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8);
    frame.push(UNIT_ID);
    frame.push(FUNCTION_READ);
    frame.extend_from_slice(&address.to_be_bytes());
    frame.extend_from_slice(&quantity.to_be_bytes());

    let cs = crc16(&frame);
    frame.extend_from_slice(&cs.to_le_bytes());

    frame
}

/// Data bytes of a response frame, with the unit id, function code,
/// byte count and trailing CRC stripped. The advertised byte count must
/// match what the caller's register kind expects.
fn response_data(frame: &[u8], expected: usize) -> Result<&[u8], ProtocolError> {
    if frame.len() < 5 {
        return Err(ProtocolError::BadFrame);
    }

    let byte_count = frame[2] as usize;
    if byte_count != expected || frame.len() < 5 + byte_count {
        return Err(ProtocolError::BadFrame);
    }

    Ok(&frame[3..3 + byte_count])
}

/// Modbus RTU codec restricted to function 0x03. Requests are 8 bytes:
/// unit id, function code, start address and register quantity
/// big-endian, CRC16 of the preceding six bytes appended low byte first.
pub struct ModbusRtu;

impl ModbusRtu {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ModbusRtu {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialCodec for ModbusRtu {
    fn build_requests(&self, registers: &[RawRegister]) -> Result<Vec<Vec<u8>>> {
        let mut requests = Vec::with_capacity(registers.len());

        for reg in registers {
            let kind =
                RegisterKind::from_tag(reg.kind).ok_or(ProtocolError::RegisterAddress {
                    address: reg.address,
                    tag: reg.kind,
                })?;

            let frame = encode_read_request(reg.address, kind.quantity());
            debug!("request {:02X?}", frame);
            requests.push(frame);
        }

        Ok(requests)
    }

    fn check_crc(&self, frame: &[u8]) -> bool {
        crc16(frame) == 0
    }

    fn decode_integer(&self, frame: &[u8]) -> Result<i16> {
        let data = response_data(frame, 2)?;
        Ok(i16::from_be_bytes([data[0], data[1]]))
    }

    fn decode_float(&self, frame: &[u8]) -> Result<f32> {
        let data = response_data(frame, 4)?;
        // Each register is big-endian on the wire; the second register
        // carries the high half of the IEEE-754 value.
        let bits = u32::from_be_bytes([data[2], data[3], data[0], data[1]]);
        Ok(f32::from_bits(bits))
    }

    fn kind(&self) -> CodecKind {
        CodecKind::ModbusRtu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{TAG_FLOAT, TAG_INTEGER};

    #[test]
    fn encode_integer_read() {
        let reference: [u8; 8] = [0x01, 0x03, 0x00, 0x10, 0x00, 0x01, 0x85, 0xCF];

        let codec = ModbusRtu::new();
        let requests = codec
            .build_requests(&[RawRegister {
                address: 0x0010,
                kind: TAG_INTEGER,
            }])
            .unwrap();

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], reference);
    }

    #[test]
    fn encode_float_read() {
        let reference: [u8; 8] = [0x01, 0x03, 0x00, 0x20, 0x00, 0x02, 0xC5, 0xC1];

        let codec = ModbusRtu::new();
        let requests = codec
            .build_requests(&[RawRegister {
                address: 0x0020,
                kind: TAG_FLOAT,
            }])
            .unwrap();

        assert_eq!(requests[0], reference);
    }

    #[test]
    fn build_preserves_order_and_frames_are_self_checking() {
        let registers = [
            RawRegister { address: 4, kind: TAG_INTEGER },
            RawRegister { address: 68, kind: TAG_FLOAT },
            RawRegister { address: 66, kind: TAG_FLOAT },
            RawRegister { address: 8, kind: TAG_INTEGER },
        ];

        let codec = ModbusRtu::new();
        let requests = codec.build_requests(&registers).unwrap();

        assert_eq!(requests.len(), registers.len());
        for (reg, frame) in registers.iter().zip(&requests) {
            assert_eq!(frame.len(), 8);
            assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), reg.address);
            assert!(codec.check_crc(frame));
        }
    }

    #[test]
    fn bad_kind_tag_aborts_the_whole_batch() {
        let registers = [
            RawRegister { address: 4, kind: TAG_INTEGER },
            RawRegister { address: 5, kind: 7 },
        ];

        let err = ModbusRtu::new().build_requests(&registers).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::RegisterAddress { address: 5, tag: 7 })
        ));
    }

    #[test]
    fn crc_of_message_with_appended_crc_is_zero() {
        for msg in [
            &[0x01u8, 0x03, 0x00, 0x10, 0x00, 0x01][..],
            &[0x01, 0x03, 0x02, 0x00, 0x2A],
            &[0xDE, 0xAD, 0xBE, 0xEF],
            &[0x00],
        ] {
            let mut framed = msg.to_vec();
            framed.extend_from_slice(&crc16(msg).to_le_bytes());
            assert_eq!(crc16(&framed), 0, "failed for {:02X?}", msg);
        }
    }

    #[test]
    fn check_crc_rejects_corruption() {
        let codec = ModbusRtu::new();
        let mut frame = vec![0x01, 0x03, 0x02, 0x00, 0x2A, 0x39, 0x9B];
        assert!(codec.check_crc(&frame));

        frame[4] ^= 0x01;
        assert!(!codec.check_crc(&frame));
        assert!(!codec.check_crc(&[]));
    }

    #[test]
    fn decode_integer_reading() {
        let codec = ModbusRtu::new();

        let frame = [0x01, 0x03, 0x02, 0x00, 0x2A, 0x39, 0x9B];
        assert_eq!(codec.decode_integer(&frame).unwrap(), 42);

        let frame = [0x01, 0x03, 0x02, 0xFF, 0xFE, 0x78, 0x34];
        assert_eq!(codec.decode_integer(&frame).unwrap(), -2);
    }

    #[test]
    fn decode_float_reading() {
        // 3.5 is 0x40600000; low register first on the wire.
        let frame = [0x01, 0x03, 0x04, 0x00, 0x00, 0x40, 0x60, 0xCB, 0xDB];
        let value = ModbusRtu::new().decode_float(&frame).unwrap();
        assert_eq!(value, 3.5);
    }

    #[test]
    fn decode_rejects_short_or_mismatched_frames() {
        let codec = ModbusRtu::new();

        // float-sized byte count handed to the integer decoder
        let frame = [0x01, 0x03, 0x04, 0x00, 0x00, 0x40, 0x60, 0xCB, 0xDB];
        assert!(codec.decode_integer(&frame).is_err());

        // frame truncated below the advertised byte count
        assert!(codec.decode_float(&[0x01, 0x03, 0x04, 0x00, 0x00]).is_err());
        assert!(codec.decode_integer(&[0x01, 0x03]).is_err());
    }
}
