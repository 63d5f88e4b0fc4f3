use manetheren_bridge::{Bridge, BridgeConfig, BridgeError, HttpBackend, TcpPublisher};
use manetheren_transport::default_serial_device;
use tracing::{error, info};

use crate::cmd::ServeArgs;
use crate::exit::{CliError, CliResult, FAILURE, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let config = BridgeConfig {
        serial_device: args
            .device
            .unwrap_or_else(|| default_serial_device().to_string()),
        baud_rate: args.baud,
        ..BridgeConfig::default()
    };

    let backend = HttpBackend::new(config.service_root.clone())
        .map_err(|err| fatal("failed to build backend client", err))?;
    let publisher = TcpPublisher::new(config.publish_addr);

    let bridge = Bridge::start(&config, backend, publisher)
        .map_err(|err| fatal("failed to start bridge", err))?;
    info!(
        device = bridge.device(),
        request_addr = %bridge.request_addr(),
        publish_addr = %config.publish_addr,
        service_root = %config.service_root,
        "serving"
    );

    bridge
        .wait()
        .map_err(|err| fatal("bridge stopped", err))?;
    Ok(SUCCESS)
}

fn fatal(context: &str, err: BridgeError) -> CliError {
    error!(error = %err, "{context}");
    CliError::new(FAILURE, format!("{context}: {err}"))
}
