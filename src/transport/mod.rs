pub mod traits;
pub mod udp;

#[cfg(test)]
pub mod memory;

pub use traits::DatagramTransport;
pub use udp::UdpTransport;
