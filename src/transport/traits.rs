//! Datagram transport abstraction for pluggable network backends

use anyhow::Result;
use std::net::{IpAddr, SocketAddr};

/// An unreliable datagram socket polled once per control tick
///
/// Neither call may block: the control loop must keep its cadence even when
/// the network stalls.
pub trait DatagramTransport {
    /// Take one pending datagram into `buf`, if any
    ///
    /// Returns `Ok(None)` when nothing is waiting. Datagrams longer than
    /// `buf` are truncated.
    fn poll_datagram(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>>;

    /// Send one datagram to `target`
    fn send_datagram(&mut self, data: &[u8], target: SocketAddr) -> Result<()>;

    /// Address other hosts reach this transport on
    fn local_ip(&self) -> IpAddr;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
