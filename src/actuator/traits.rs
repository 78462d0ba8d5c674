//! Actuator driver abstraction for pluggable PWM backends

use minibot_shared::{Channel, DriveError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    #[error(transparent)]
    OutOfRange(#[from] DriveError),

    #[error("Channel {0} has not been configured")]
    NotConfigured(Channel),

    #[error("Invalid PWM frequency for {channel}: {frequency_hz} Hz")]
    InvalidFrequency { channel: Channel, frequency_hz: u32 },

    #[error("Invalid PWM resolution for {channel}: {resolution_bits} bits")]
    InvalidResolution { channel: Channel, resolution_bits: u8 },

    #[error("Duty {duty} exceeds {max} on {channel}")]
    DutyOverflow { channel: Channel, duty: u32, max: u32 },
}

/// A PWM peripheral driving the robot's four outputs
pub trait ActuatorDriver {
    /// Set up a channel before its first write
    fn configure(
        &mut self,
        channel: Channel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), ActuatorError>;

    /// Write a raw duty value to a channel
    fn write(&mut self, channel: Channel, duty: u32) -> Result<(), ActuatorError>;

    /// Human-readable name for this driver
    fn name(&self) -> &'static str;
}
