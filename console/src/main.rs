mod operator;
mod registry;

use anyhow::Context;
use minibot_shared::{link, DiscoveryAnnouncement};
use operator::{OperatorCommand, Target, HELP};
use registry::{Observation, RobotRegistry};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let discovery = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, link::DISCOVERY_PORT))
        .await
        .with_context(|| format!("Failed to bind discovery port {}", link::DISCOVERY_PORT))?;
    let commands = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("Failed to bind command socket")?;
    commands
        .set_broadcast(true)
        .context("Failed to enable broadcast on command socket")?;
    info!("Console listening for robots on :{}", link::DISCOVERY_PORT);
    println!("{}", HELP);

    let mut registry = RobotRegistry::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut cleanup = interval(Duration::from_secs(1));
    let stale_after = Duration::from_millis(link::ROBOT_STALE_MS);
    let mut buf = vec![0u8; 1024];

    loop {
        tokio::select! {
            result = discovery.recv_from(&mut buf) => {
                match result {
                    Ok((n, from)) => handle_discovery(&buf[..n], from, &mut registry),
                    Err(e) => warn!("Discovery receive error: {}", e),
                }
            }

            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        handle_line(&line, &registry, &commands).await;
                    }
                    Ok(None) => {
                        info!("stdin closed, exiting");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }

            _ = cleanup.tick() => {
                for id in registry.remove_stale(Instant::now(), stale_after) {
                    warn!("Robot {} went silent, removed", id);
                }
            }
        }
    }

    Ok(())
}

fn handle_discovery(data: &[u8], from: SocketAddr, registry: &mut RobotRegistry) {
    let Some(announcement) = DiscoveryAnnouncement::parse(data) else {
        debug!("Ignoring {} non-discovery bytes from {}", data.len(), from);
        return;
    };

    match registry.observe(&announcement, Instant::now()) {
        Observation::New => info!(
            "Discovered robot {} at {}",
            announcement.identity, announcement.address
        ),
        Observation::Moved => info!(
            "Robot {} moved to {}",
            announcement.identity, announcement.address
        ),
        Observation::Refreshed => {
            debug!("Discovery ping from {}", announcement.identity);
        }
    }
}

async fn handle_line(line: &str, registry: &RobotRegistry, socket: &UdpSocket) {
    let command = match OperatorCommand::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };

    match &command {
        OperatorCommand::Help => println!("{}", HELP),
        OperatorCommand::List => {
            if registry.count() == 0 {
                println!("no robots discovered yet");
            }
            let now = Instant::now();
            for robot in registry.robots() {
                println!(
                    "{:<16} {:<15} up {:>6.0}s, last seen {:>5.1}s ago ({} pings)",
                    robot.identity,
                    robot.address,
                    now.saturating_duration_since(robot.first_seen).as_secs_f32(),
                    now.saturating_duration_since(robot.last_seen).as_secs_f32(),
                    robot.announcements
                );
            }
        }
        _ => {}
    }

    let datagrams = command.datagrams(&registry.identities());
    if datagrams.is_empty() && matches!(command, OperatorCommand::Teleop | OperatorCommand::Standby) {
        warn!("No robots discovered, nothing to switch");
    }

    for (target, payload) in datagrams {
        let Some(targets) = registry.destinations(&target, link::COMMAND_PORT) else {
            if let Target::Robot(id) = &target {
                println!("unknown robot: {}", id);
            }
            continue;
        };

        for addr in targets {
            match socket.send_to(&payload, addr).await {
                Ok(_) => debug!("Sent {} bytes to {}", payload.len(), addr),
                Err(e) => error!("Failed to send to {}: {}", addr, e),
            }
        }
    }
}
