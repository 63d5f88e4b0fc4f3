use std::net::SocketAddr;

use clap::{Args, Subcommand};
use manetheren_bridge::DEFAULT_REQUEST_ADDR;
use manetheren_frame::MAX_MESSAGE_TYPE;
use manetheren_transport::DEFAULT_BAUD_RATE;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod types;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bridge on a serial device.
    Serve(ServeArgs),
    /// Send one frame to a running bridge's request listener.
    Send(SendArgs),
    /// List the message types.
    Types(TypesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Types(args) => types::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serial device (e.g. COM3, /dev/ttyUSB0) or tcp://host:port.
    /// Defaults to the platform's usual device.
    pub device: Option<String>,
    /// Baud rate of the serial link.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message type (0-7 serve, 8-15 request).
    #[arg(
        long = "type",
        short = 't',
        value_name = "TYPE",
        value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_MESSAGE_TYPE))
    )]
    pub message_type: u8,
    /// Payload text. Empty when omitted.
    #[arg(long, short = 'd')]
    pub data: Option<String>,
    /// Request listener address.
    #[arg(long, default_value_t = DEFAULT_REQUEST_ADDR)]
    pub addr: SocketAddr,
}

#[derive(Args, Debug, Default)]
pub struct TypesArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
