//! Robot link configuration
//!
//! Defaults match the stock firmware; every field can be overridden from the
//! environment so the same binary runs on the robot and on a bench host.

use minibot_shared::codec::IDENTITY_LEN;
use minibot_shared::link;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

pub const ENV_ROBOT_ID: &str = "MINIBOT_ID";
pub const ENV_COMMAND_PORT: &str = "MINIBOT_COMMAND_PORT";
pub const ENV_DISCOVERY_PORT: &str = "MINIBOT_DISCOVERY_PORT";
pub const ENV_BROADCAST: &str = "MINIBOT_BROADCAST";
pub const ENV_ADDRESS: &str = "MINIBOT_ADDRESS";
pub const ENV_TICK_MS: &str = "MINIBOT_TICK_MS";

/// Longest usable identity; the frame's identity field keeps at least one
/// zero byte so a control frame can never read as `<identity>:`
pub const MAX_IDENTITY_LEN: usize = IDENTITY_LEN - 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Robot identity must be 1..={MAX_IDENTITY_LEN} bytes, got {0}")]
    IdentityLength(usize),

    #[error("Robot identity must not contain ':'")]
    IdentitySeparator,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// PWM output settings shared by all four channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmSettings {
    pub frequency_hz: u32,
    pub resolution_bits: u8,
}

impl Default for PwmSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 100,
            resolution_bits: 16,
        }
    }
}

/// Configuration for the link service
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Robot identity used to address commands
    pub robot_id: String,
    /// UDP port commands arrive on
    pub command_port: u16,
    /// UDP port announcements are sent to
    pub discovery_port: u16,
    /// Broadcast address for announcements
    pub broadcast_address: IpAddr,
    /// Address to advertise; detected from the routing table when unset
    pub advertised_address: Option<IpAddr>,
    /// Control loop period
    pub tick_interval: Duration,
    /// PWM output settings
    pub pwm: PwmSettings,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            robot_id: "minibot".into(),
            command_port: link::COMMAND_PORT,
            discovery_port: link::DISCOVERY_PORT,
            broadcast_address: IpAddr::V4(Ipv4Addr::BROADCAST),
            advertised_address: None,
            tick_interval: Duration::from_millis(10),
            pwm: PwmSettings::default(),
        }
    }
}

impl LinkConfig {
    /// Defaults overridden by `MINIBOT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(id) = lookup(ENV_ROBOT_ID) {
            config.robot_id = id;
        }
        if let Some(port) = lookup(ENV_COMMAND_PORT) {
            config.command_port = parse_value(ENV_COMMAND_PORT, port)?;
        }
        if let Some(port) = lookup(ENV_DISCOVERY_PORT) {
            config.discovery_port = parse_value(ENV_DISCOVERY_PORT, port)?;
        }
        if let Some(addr) = lookup(ENV_BROADCAST) {
            config.broadcast_address = parse_value(ENV_BROADCAST, addr)?;
        }
        if let Some(addr) = lookup(ENV_ADDRESS) {
            config.advertised_address = Some(parse_value(ENV_ADDRESS, addr)?);
        }
        if let Some(ms) = lookup(ENV_TICK_MS) {
            let ms: u64 = parse_value(ENV_TICK_MS, ms)?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_TICK_MS,
                    value: ms.to_string(),
                });
            }
            config.tick_interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the identity fits the control frame and phase formats
    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.robot_id.len();
        if len == 0 || len > MAX_IDENTITY_LEN {
            return Err(ConfigError::IdentityLength(len));
        }
        if self.robot_id.contains(':') {
            return Err(ConfigError::IdentitySeparator);
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
