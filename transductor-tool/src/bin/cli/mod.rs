pub use clap::StructOpt;
use clap::{Parser, Subcommand};

use transductor_lib::device::Register;
use transductor_lib::protocol::CodecKind;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// enable debug output
    #[clap(long, short)]
    pub debug: bool,

    /// Use json-formatted output
    #[clap(long, short)]
    pub json: bool,

    /// Transductor IP address
    #[clap(long, short, default_value = "127.0.0.1")]
    pub ip: String,

    /// Transductor UDP port
    #[clap(long, short, default_value_t = 1001)]
    pub port: u16,

    /// Receive timeout, seconds
    #[clap(long, short, default_value_t = 10.0)]
    pub timeout: f64,

    /// Receive attempts before a transductor is declared broken
    #[clap(long, short, default_value_t = 3)]
    pub attempts: u32,

    /// Serial codec
    #[clap(long, short, default_value = "modbus-rtu")]
    pub codec: CodecKind,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the transductor once and print the readings
    Read {
        /// Registers to read, ADDRESS:int|float
        #[clap(required = true)]
        registers: Vec<Register>,
    },

    /// Poll repeatedly until interrupted or the transductor breaks
    Watch {
        /// Registers to read, ADDRESS:int|float
        #[clap(required = true)]
        registers: Vec<Register>,

        /// Seconds between polls
        #[clap(long, default_value_t = 1.0)]
        interval: f64,
    },
}
