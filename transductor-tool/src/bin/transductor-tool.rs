pub mod cli;

use std::fmt::Display;
use std::io;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{generate, shells::Bash};
use log::error;

use transductor_lib::device::{Register, RegisterKind, Transductor};
use transductor_lib::protocol::{make_codec, ProtocolError, SerialCodec};
use transductor_lib::transport::{Transport, UdpTransport};

use cli::{Cli, Commands, StructOpt};

#[derive(Clone, Copy)]
enum OutputFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone, Copy)]
enum Reading {
    Integer(i16),
    Float(f32),
}

impl Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Integer(v) => v.fmt(f),
            Reading::Float(v) => v.fmt(f),
        }
    }
}

impl From<Reading> for json::JsonValue {
    fn from(reading: Reading) -> Self {
        match reading {
            Reading::Integer(v) => v.into(),
            Reading::Float(v) => v.into(),
        }
    }
}

fn slice_to_line<T>(data: &[T]) -> String
where
    T: Display,
{
    data.iter()
        .map(|v| v.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

fn decode_responses(
    codec: &dyn SerialCodec,
    registers: &[Register],
    responses: &[Vec<u8>],
) -> Result<Vec<Reading>> {
    registers
        .iter()
        .zip(responses)
        .map(|(reg, frame)| -> Result<Reading> {
            if !codec.check_crc(frame) {
                return Err(ProtocolError::BadCrc)
                    .with_context(|| format!("Bad reply for register {}", reg.address));
            }
            Ok(match reg.kind {
                RegisterKind::Integer => Reading::Integer(
                    codec
                        .decode_integer(frame)
                        .with_context(|| format!("Failed to decode register {}", reg.address))?,
                ),
                RegisterKind::Float => Reading::Float(
                    codec
                        .decode_float(frame)
                        .with_context(|| format!("Failed to decode register {}", reg.address))?,
                ),
            })
        })
        .collect()
}

fn cmd_read(
    transport: &mut dyn Transport,
    codec: &dyn SerialCodec,
    transductor: &Transductor,
    registers: &[Register],
    fmt: OutputFormat,
) -> Result<String> {
    let responses = transport
        .communicate(transductor, codec)
        .with_context(|| format!("Failed to poll transductor {}", transductor.ip_address))?;

    let readings = decode_responses(codec, registers, &responses)?;

    Ok(match fmt {
        OutputFormat::Plain => slice_to_line(readings.as_slice()),
        OutputFormat::Json => json::stringify(readings),
    })
}

fn cmd_watch(
    transport: &mut dyn Transport,
    codec: &dyn SerialCodec,
    transductor: &Transductor,
    registers: &[Register],
    interval: Duration,
    fmt: OutputFormat,
) -> Result<String> {
    loop {
        let line = cmd_read(transport, codec, transductor, registers, fmt)?;
        println!("{}", line);
        thread::sleep(interval);
    }
}

fn do_main() -> Result<String> {
    if std::env::var("GENERATE_COMPLETION").is_ok() {
        generate(
            Bash,
            &mut cli::Cli::command(),
            "transductor-tool",
            &mut io::stdout(),
        );

        return Ok(String::default());
    }

    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_target(false)
    .init();

    let fmt = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };

    let codec = make_codec(cli.codec);
    let mut transport =
        UdpTransport::with_config(Duration::from_secs_f64(cli.timeout), cli.port, cli.attempts);

    match cli.command {
        Commands::Read { registers } => {
            let transductor =
                Transductor::new(cli.ip, registers.iter().map(Register::raw).collect());
            cmd_read(
                &mut transport,
                codec.as_ref(),
                &transductor,
                &registers,
                fmt,
            )
        }
        Commands::Watch { registers, interval } => {
            let transductor =
                Transductor::new(cli.ip, registers.iter().map(Register::raw).collect());
            cmd_watch(
                &mut transport,
                codec.as_ref(),
                &transductor,
                &registers,
                Duration::from_secs_f64(interval),
                fmt,
            )
        }
    }
}

fn main() {
    match do_main() {
        Ok(s) => println!("{}", s),
        Err(e) => error!("{:#}", e),
    }
}
