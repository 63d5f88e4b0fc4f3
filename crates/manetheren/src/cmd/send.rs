use std::net::Shutdown;

use manetheren_frame::{FrameWriter, MessageType, HEADER_SIZE};
use manetheren_transport::tcp::connect;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, io_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_sent, OutputFormat, SentOutput};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let message_type =
        MessageType::from_wire(args.message_type).map_err(|err| frame_error("bad --type", err))?;
    let payload = args.data.unwrap_or_default();

    let stream = connect(args.addr).map_err(|err| transport_error("connect failed", err))?;
    let mut writer = FrameWriter::new(stream);
    writer
        .send(message_type, payload.as_bytes())
        .map_err(|err| frame_error("send failed", err))?;
    writer
        .into_inner()
        .shutdown(Shutdown::Both)
        .map_err(|err| io_error("close failed", err))?;

    let out = SentOutput::new(
        args.addr,
        message_type,
        payload.len(),
        HEADER_SIZE + payload.len(),
    );
    print_sent(&out, format);
    Ok(SUCCESS)
}
