//! UDP transport for the command link

use crate::transport::traits::DatagramTransport;
use anyhow::{anyhow, Context, Result};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Any routable address works; no packet is sent to it
const ROUTE_PROBE: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// UDP socket bound to the command port, with broadcast enabled
pub struct UdpTransport {
    socket: UdpSocket,
    local_ip: IpAddr,
}

impl UdpTransport {
    /// Bind the command port on all interfaces
    ///
    /// `advertised` overrides the address reported by `local_ip`; when unset
    /// it is taken from the default route.
    pub async fn bind(port: u16, advertised: Option<IpAddr>) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .with_context(|| format!("Failed to bind UDP command port {}", port))?;
        socket
            .set_broadcast(true)
            .context("Failed to enable UDP broadcast")?;
        // try_send_to only succeeds once the reactor has seen write readiness
        socket
            .writable()
            .await
            .context("UDP socket never became writable")?;

        let local_ip = match advertised {
            Some(ip) => ip,
            None => detect_local_ip().unwrap_or_else(|e| {
                warn!("Could not detect local address, advertising 0.0.0.0: {}", e);
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            }),
        };

        Ok(Self { socket, local_ip })
    }

    /// Address the socket is actually bound to
    pub fn bound_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramTransport for UdpTransport {
    fn poll_datagram(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match self.socket.try_recv_from(buf) {
            Ok((n, from)) => Ok(Some((n, from))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(anyhow!("UDP receive error: {}", e)),
        }
    }

    fn send_datagram(&mut self, data: &[u8], target: SocketAddr) -> Result<()> {
        match self.socket.try_send_to(data, target) {
            Ok(n) if n == data.len() => Ok(()),
            Ok(n) => Err(anyhow!("Short UDP send to {}: {}/{} bytes", target, n, data.len())),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                Err(anyhow!("UDP send buffer full, dropped datagram to {}", target))
            }
            Err(e) => Err(anyhow!("UDP send to {} failed: {}", target, e)),
        }
    }

    fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    fn name(&self) -> &'static str {
        "UDP"
    }
}

/// Find the address of the interface carrying the default route
fn detect_local_ip() -> io::Result<IpAddr> {
    let probe = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    probe.connect(ROUTE_PROBE)?;
    let ip = probe.local_addr()?.ip();
    debug!("Detected local address {}", ip);
    Ok(ip)
}
