use std::net::UdpSocket;
use std::str::FromStr;

use anyhow::Result;
use clap::Parser;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use thiserror::Error;

use transductor_lib::sim::RegisterBank;

#[derive(Error, Debug)]
pub enum AssignError {
    #[error("invalid register assignment '{0}', expected ADDRESS=VALUE")]
    BadAssign(String),
}

fn parse_with_radix<T>(input: &str) -> Result<T, T::FromStrRadixErr>
where
    T: num::Num,
    <T as num::Num>::FromStrRadixErr: std::error::Error + Send + Sync,
{
    if input.starts_with("0x") {
        T::from_str_radix(input.trim_start_matches("0x"), 16)
    } else if input.starts_with("0b") {
        T::from_str_radix(input.trim_start_matches("0b"), 2)
    } else {
        T::from_str_radix(input, 10)
    }
}

fn split_assign(input: &str) -> Result<(u16, &str), AssignError> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^([^=\s]+)=([^=\s]+)$").unwrap();
    }

    let cap = RE
        .captures(input)
        .ok_or_else(|| AssignError::BadAssign(input.to_string()))?;

    let address = parse_with_radix::<u16>(cap.get(1).unwrap().as_str())
        .map_err(|_| AssignError::BadAssign(input.to_string()))?;

    Ok((address, cap.get(2).unwrap().as_str()))
}

#[derive(Debug, Clone, Copy)]
pub struct IntAssign {
    pub address: u16,
    pub value: i16,
}

impl FromStr for IntAssign {
    type Err = AssignError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (address, value) = split_assign(input)?;
        Ok(IntAssign {
            address,
            value: value
                .parse()
                .map_err(|_| AssignError::BadAssign(input.to_string()))?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FloatAssign {
    pub address: u16,
    pub value: f32,
}

impl FromStr for FloatAssign {
    type Err = AssignError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (address, value) = split_assign(input)?;
        Ok(FloatAssign {
            address,
            value: value
                .parse()
                .map_err(|_| AssignError::BadAssign(input.to_string()))?,
        })
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "UDP transductor emulator", long_about = None)]
struct Cli {
    /// enable debug output
    #[clap(long, short)]
    debug: bool,

    /// Address to listen on
    #[clap(long, short, default_value = "0.0.0.0:1001")]
    listen: String,

    /// Integer register, ADDRESS=VALUE
    #[clap(long = "int", value_name = "ADDRESS=VALUE")]
    integers: Vec<IntAssign>,

    /// Float register, ADDRESS=VALUE
    #[clap(long = "float", value_name = "ADDRESS=VALUE")]
    floats: Vec<FloatAssign>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_target(false)
    .init();

    let mut bank = RegisterBank::new();
    for assign in &cli.integers {
        bank.set_integer(assign.address, assign.value);
    }
    for assign in &cli.floats {
        bank.set_float(assign.address, assign.value);
    }

    let socket = UdpSocket::bind(&cli.listen)?;
    info!("listening on {}", socket.local_addr()?);

    let mut buffer = [0u8; 256];
    loop {
        let (received, peer) = match socket.recv_from(&mut buffer) {
            Ok(x) => x,
            Err(e) => {
                warn!("recv failed: {}", e);
                continue;
            }
        };

        debug!("recv {:02X?} from {}", &buffer[..received], peer);
        match bank.handle_request(&buffer[..received]) {
            Some(reply) => {
                socket.send_to(&reply, peer)?;
            }
            None => debug!("ignoring malformed request from {}", peer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments_with_radix_prefixes() {
        let assign: IntAssign = "0x10=-42".parse().unwrap();
        assert_eq!(assign.address, 0x10);
        assert_eq!(assign.value, -42);

        let assign: FloatAssign = "68=3.5".parse().unwrap();
        assert_eq!(assign.address, 68);
        assert_eq!(assign.value, 3.5);
    }

    #[test]
    fn rejects_malformed_assignments() {
        assert!("16".parse::<IntAssign>().is_err());
        assert!("16=4=5".parse::<IntAssign>().is_err());
        assert!("a=1".parse::<FloatAssign>().is_err());
    }
}
