mod actuator;
mod config;
mod control;
mod link;
mod transport;

use actuator::{Actuators, SimulatedPwm};
use anyhow::Context;
use config::LinkConfig;
use link::LinkService;
use transport::UdpTransport;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = LinkConfig::from_env().context("Invalid link configuration")?;

    info!("Minibot starting: {}", config.robot_id);
    info!("  Command port: {}", config.command_port);
    info!(
        "  Discovery: {}:{}",
        config.broadcast_address, config.discovery_port
    );

    // Transport must be up before the link can start
    let transport = UdpTransport::bind(config.command_port, config.advertised_address).await?;
    info!("Listening for commands on {}", transport.bound_addr()?);

    let actuators = Actuators::new(SimulatedPwm::new(), config.pwm);
    info!(
        "Actuators on {} ({} Hz, {} bit)",
        actuators.driver_name(),
        config.pwm.frequency_hz,
        config.pwm.resolution_bits
    );

    let service = LinkService::new(config, transport, actuators);
    service.run(control::tank_drive).await?;

    info!("Minibot stopped");
    Ok(())
}
