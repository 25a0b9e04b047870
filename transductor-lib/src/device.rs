use std::fmt::Display;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Kind tag for an integer register in externally persisted register maps.
pub const TAG_INTEGER: u16 = 0;
/// Kind tag for a float register in externally persisted register maps.
pub const TAG_FLOAT: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Integer,
    Float,
}

impl RegisterKind {
    /// Number of consecutive 16-bit registers a reading of this kind
    /// occupies on the device.
    pub fn quantity(self) -> u16 {
        match self {
            RegisterKind::Integer => 1,
            RegisterKind::Float => 2,
        }
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            TAG_INTEGER => Some(RegisterKind::Integer),
            TAG_FLOAT => Some(RegisterKind::Float),
            _ => None,
        }
    }

    pub fn tag(self) -> u16 {
        match self {
            RegisterKind::Integer => TAG_INTEGER,
            RegisterKind::Float => TAG_FLOAT,
        }
    }
}

impl Display for RegisterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterKind::Integer => "int".fmt(f),
            RegisterKind::Float => "float".fmt(f),
        }
    }
}

/// Register descriptor exactly as the owning application persists it:
/// starting address plus a raw kind tag. The codec validates the tag
/// while building request frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRegister {
    pub address: u16,
    pub kind: u16,
}

/// Validated register descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub address: u16,
    pub kind: RegisterKind,
}

impl Register {
    pub fn raw(&self) -> RawRegister {
        RawRegister {
            address: self.address,
            kind: self.kind.tag(),
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.kind)
    }
}

#[derive(Error, Debug)]
pub enum RegisterSpecError {
    #[error("invalid register spec '{0}', expected ADDRESS:int|float")]
    BadSpec(String),
}

impl FromStr for Register {
    type Err = RegisterSpecError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"^(?:0[xX]([0-9a-fA-F]+)|([0-9]+)):(int|float)$").unwrap();
        }

        let cap = RE
            .captures(input)
            .ok_or_else(|| RegisterSpecError::BadSpec(input.to_string()))?;

        let address = match (cap.get(1), cap.get(2)) {
            (Some(hex), _) => u16::from_str_radix(hex.as_str(), 16),
            (None, Some(dec)) => dec.as_str().parse(),
            _ => unreachable!(),
        }
        .map_err(|_| RegisterSpecError::BadSpec(input.to_string()))?;

        let kind = match &cap[3] {
            "int" => RegisterKind::Integer,
            "float" => RegisterKind::Float,
            _ => unreachable!(),
        };

        Ok(Register { address, kind })
    }
}

/// Handle to one remote measurement device. Owned and persisted by the
/// caller; the polling core reads the address and register map and
/// signals retry exhaustion through
/// [`TransportError::BrokenTransductor`](crate::transport::TransportError) —
/// flipping and persisting `broken` stays with the caller.
#[derive(Debug, Clone)]
pub struct Transductor {
    pub ip_address: String,
    pub registers: Vec<RawRegister>,
    pub broken: bool,
}

impl Transductor {
    pub fn new(ip_address: impl Into<String>, registers: Vec<RawRegister>) -> Self {
        Self {
            ip_address: ip_address.into(),
            registers,
            broken: false,
        }
    }
}
