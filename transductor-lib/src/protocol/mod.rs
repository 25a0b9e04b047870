mod modbus;

use std::{fmt::Display, str::FromStr};

use anyhow::Result;
use thiserror::Error;

use crate::device::RawRegister;

pub use modbus::ModbusRtu;
pub(crate) use modbus::crc16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    ModbusRtu,
}

impl Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecKind::ModbusRtu => "modbus-rtu".fmt(f),
        }
    }
}

#[derive(Error, Debug)]
pub enum CodecKindError {
    #[error("unknown codec '{0}'")]
    BadCodec(String),
}

impl FromStr for CodecKind {
    type Err = CodecKindError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "modbus-rtu" | "rtu" => Ok(CodecKind::ModbusRtu),
            _ => Err(CodecKindError::BadCodec(input.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("wrong kind tag {tag} for register {address}")]
    RegisterAddress { address: u16, tag: u16 },
    #[error("malformed response frame")]
    BadFrame,
    #[error("response CRC mismatch")]
    BadCrc,
}

/// Serial-protocol codec: pure encode/decode, no I/O. One variant today
/// (Modbus RTU restricted to read-holding-registers); the seam exists so
/// further codecs can be added without touching the transport.
pub trait SerialCodec: Send {
    /// Build one request frame per register descriptor, in register-map
    /// order. A descriptor with an unknown kind tag aborts the whole
    /// list with [`ProtocolError::RegisterAddress`].
    fn build_requests(&self, registers: &[RawRegister]) -> Result<Vec<Vec<u8>>>;

    /// True iff the frame's trailing checksum matches its contents.
    /// Decoding does not check the CRC itself; callers run this first.
    fn check_crc(&self, frame: &[u8]) -> bool;

    /// Decode a response to an integer-register request.
    fn decode_integer(&self, frame: &[u8]) -> Result<i16>;

    /// Decode a response to a float-register request.
    fn decode_float(&self, frame: &[u8]) -> Result<f32>;

    fn kind(&self) -> CodecKind;
}

pub fn make_codec(kind: CodecKind) -> Box<dyn SerialCodec> {
    match kind {
        CodecKind::ModbusRtu => Box::new(ModbusRtu::new()),
    }
}
