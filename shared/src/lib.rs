//! Minibot Shared Protocol Types
//!
//! This crate provides the command link protocol shared by the robot
//! firmware and the operator console: the datagram codec, the session
//! state machine and the drive value mapping.

pub mod codec;
pub mod drive;
pub mod state_machine;

pub use codec::{ControlFrame, DiscoveryAnnouncement, LinkCommand};
pub use drive::{Channel, DriveError};
pub use state_machine::{LinkState, RejectReason, SessionStateMachine, TransitionResult};

/// Link parameters shared by both ends of the command link
pub mod link {
    /// UDP port the robot receives commands on
    pub const COMMAND_PORT: u16 = 2367;

    /// UDP port discovery announcements are broadcast to
    pub const DISCOVERY_PORT: u16 = 12345;

    /// Interval between discovery announcements
    pub const ANNOUNCE_INTERVAL_MS: u64 = 2000;

    /// Silence after the last command that forces actuators to neutral
    pub const COMMAND_TIMEOUT_MS: u64 = 5000;

    /// Largest datagram the robot reads per tick
    pub const RECV_BUFFER_LEN: usize = 255;

    /// Game phase that enables control frames
    pub const TELEOP_PHASE: &str = "teleop";

    /// Game phase a robot boots into
    pub const STANDBY_PHASE: &str = "standby";

    /// Console considers a robot gone after this long without an announcement
    pub const ROBOT_STALE_MS: u64 = 10_000;
}
