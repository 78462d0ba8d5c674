//! Simulated PWM peripheral
//!
//! Tracks configuration and the last duty written per channel. Used on hosts
//! without PWM hardware and as the recording driver in tests.

use super::traits::{ActuatorDriver, ActuatorError};
use minibot_shared::drive;
use minibot_shared::Channel;
use tracing::debug;

/// Maximum PWM resolution the peripheral supports
const MAX_RESOLUTION_BITS: u8 = 20;

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    frequency_hz: u32,
    resolution_bits: u8,
    configured: bool,
    duty: Option<u32>,
    writes: u64,
}

/// Simulated PWM driver
#[derive(Debug, Default)]
pub struct SimulatedPwm {
    channels: [ChannelState; 4],
}

impl SimulatedPwm {
    /// Create a driver with every channel unconfigured
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl SimulatedPwm {
    /// Last duty successfully written to `channel`
    pub fn duty(&self, channel: Channel) -> Option<u32> {
        self.channels[channel.index()].duty
    }

    /// Number of successful writes to `channel`
    pub fn write_count(&self, channel: Channel) -> u64 {
        self.channels[channel.index()].writes
    }

    pub fn frequency(&self, channel: Channel) -> u32 {
        self.channels[channel.index()].frequency_hz
    }

    pub fn is_configured(&self, channel: Channel) -> bool {
        self.channels[channel.index()].configured
    }
}

impl ActuatorDriver for SimulatedPwm {
    fn configure(
        &mut self,
        channel: Channel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), ActuatorError> {
        if frequency_hz == 0 {
            return Err(ActuatorError::InvalidFrequency {
                channel,
                frequency_hz,
            });
        }
        if resolution_bits == 0 || resolution_bits > MAX_RESOLUTION_BITS {
            return Err(ActuatorError::InvalidResolution {
                channel,
                resolution_bits,
            });
        }

        let state = &mut self.channels[channel.index()];
        state.frequency_hz = frequency_hz;
        state.resolution_bits = resolution_bits;
        state.configured = true;
        debug!(%channel, frequency_hz, resolution_bits, "PWM channel configured");
        Ok(())
    }

    fn write(&mut self, channel: Channel, duty: u32) -> Result<(), ActuatorError> {
        let state = &mut self.channels[channel.index()];
        if !state.configured {
            return Err(ActuatorError::NotConfigured(channel));
        }

        let max = drive::full_scale(state.resolution_bits);
        if duty > max {
            return Err(ActuatorError::DutyOverflow { channel, duty, max });
        }

        state.duty = Some(duty);
        state.writes += 1;
        debug!(%channel, duty, "PWM write");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated-pwm"
    }
}
