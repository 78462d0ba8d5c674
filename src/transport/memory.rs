//! In-memory transport for link tests

use crate::transport::traits::DatagramTransport;
use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Operator endpoint inbound datagrams appear to come from
pub const OPERATOR_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 2)), 50000);

/// Queue-backed transport that records everything sent
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<(Vec<u8>, SocketAddr)>,
    fail_next_poll: bool,
    fail_sends: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram for the next poll
    pub fn push(&mut self, data: impl AsRef<[u8]>) {
        self.inbound.push_back(data.as_ref().to_vec());
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn sent(&self) -> &[(Vec<u8>, SocketAddr)] {
        &self.sent
    }

    /// Make the next poll report a receive error
    pub fn fail_next_poll(&mut self) {
        self.fail_next_poll = true;
    }

    pub fn set_fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }
}

impl DatagramTransport for MemoryTransport {
    fn poll_datagram(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        if std::mem::take(&mut self.fail_next_poll) {
            return Err(anyhow!("simulated receive error"));
        }
        let Some(data) = self.inbound.pop_front() else {
            return Ok(None);
        };
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(Some((n, OPERATOR_ADDR)))
    }

    fn send_datagram(&mut self, data: &[u8], target: SocketAddr) -> Result<()> {
        if self.fail_sends {
            return Err(anyhow!("simulated send error"));
        }
        self.sent.push((data.to_vec(), target));
        Ok(())
    }

    fn local_ip(&self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 4, 7))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
