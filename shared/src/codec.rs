//! Datagram codec for the operator/robot command link
//!
//! Every inbound datagram is classified, never rejected:
//! ```text
//! "ESTOP"                                  emergency stop
//! "ESTOP_OFF"                              emergency stop release
//! "<robot id>:<phase>"                     game phase update
//! [ 16 id ][ 6 axes ][ 2 buttons ] (>= 24) control frame
//! ```
//!
//! Anything that matches none of these shapes is `LinkCommand::Unrecognized`
//! and is dropped by the caller. A corrupt packet must never stall the
//! control loop, so nothing in here returns an error.
//!
//! The robot announces itself with `"DISCOVER:<robot id>:<ip>"`.

use bytes::{BufMut, Bytes, BytesMut};
use std::net::IpAddr;

/// Emergency stop token
pub const ESTOP_TOKEN: &[u8] = b"ESTOP";

/// Emergency stop release token
pub const ESTOP_RELEASE_TOKEN: &[u8] = b"ESTOP_OFF";

/// Separator between robot identity and phase name
pub const PHASE_SEPARATOR: u8 = b':';

/// Prefix of a discovery announcement
pub const DISCOVERY_PREFIX: &str = "DISCOVER:";

/// Identity field width in a control frame
pub const IDENTITY_LEN: usize = 16;

/// Analog axis bytes in a control frame (only the first four are used)
pub const AXES_LEN: usize = 6;

/// Button bitmask bytes in a control frame (only the first one is used)
pub const BUTTONS_LEN: usize = 2;

/// Total control frame size
pub const CONTROL_FRAME_LEN: usize = IDENTITY_LEN + AXES_LEN + BUTTONS_LEN;

/// Stick position reported when a joystick is at rest
pub const AXIS_CENTER: u8 = 127;

/// Filler for the two axis bytes the robot ignores
const UNUSED_AXIS: u8 = 125;

pub const BUTTON_CROSS: u8 = 0x01;
pub const BUTTON_CIRCLE: u8 = 0x02;
pub const BUTTON_SQUARE: u8 = 0x04;
pub const BUTTON_TRIANGLE: u8 = 0x08;

/// Joystick and button snapshot carried by a control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    pub left_x: u8,
    pub left_y: u8,
    pub right_x: u8,
    pub right_y: u8,
    pub cross: bool,
    pub circle: bool,
    pub square: bool,
    pub triangle: bool,
}

impl Default for ControlFrame {
    fn default() -> Self {
        Self::neutral()
    }
}

impl ControlFrame {
    /// Both sticks centred, no buttons pressed
    pub const fn neutral() -> Self {
        Self {
            left_x: AXIS_CENTER,
            left_y: AXIS_CENTER,
            right_x: AXIS_CENTER,
            right_y: AXIS_CENTER,
            cross: false,
            circle: false,
            square: false,
            triangle: false,
        }
    }

    /// Build a frame from the four used axes and the first button byte
    pub fn from_parts(axes: [u8; 4], buttons: u8) -> Self {
        Self {
            left_x: axes[0],
            left_y: axes[1],
            right_x: axes[2],
            right_y: axes[3],
            cross: buttons & BUTTON_CROSS != 0,
            circle: buttons & BUTTON_CIRCLE != 0,
            square: buttons & BUTTON_SQUARE != 0,
            triangle: buttons & BUTTON_TRIANGLE != 0,
        }
    }

    /// Button flags packed back into the wire bitmask
    pub fn buttons(&self) -> u8 {
        let mut mask = 0;
        if self.cross {
            mask |= BUTTON_CROSS;
        }
        if self.circle {
            mask |= BUTTON_CIRCLE;
        }
        if self.square {
            mask |= BUTTON_SQUARE;
        }
        if self.triangle {
            mask |= BUTTON_TRIANGLE;
        }
        mask
    }
}

/// A classified inbound datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Stop all actuators and block motion until released
    EmergencyStop,
    /// Lift a previous emergency stop
    EmergencyStopRelease,
    /// Switch the game phase of this robot
    PhaseUpdate { phase: String },
    /// Joystick state addressed to `target`
    Control { frame: ControlFrame, target: String },
    /// Anything else; dropped without side effects
    Unrecognized,
}

impl LinkCommand {
    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            LinkCommand::EmergencyStop => "estop",
            LinkCommand::EmergencyStopRelease => "estop-release",
            LinkCommand::PhaseUpdate { .. } => "phase",
            LinkCommand::Control { .. } => "control",
            LinkCommand::Unrecognized => "unrecognized",
        }
    }
}

/// Classify a raw datagram received by the robot named `identity`
///
/// First match wins: emergency tokens, then a phase update addressed to
/// `identity`, then a binary control frame, otherwise `Unrecognized`.
pub fn classify(buf: &[u8], identity: &str) -> LinkCommand {
    if buf == ESTOP_TOKEN {
        return LinkCommand::EmergencyStop;
    }

    if buf == ESTOP_RELEASE_TOKEN {
        return LinkCommand::EmergencyStopRelease;
    }

    if let Some(phase) = parse_phase_update(buf, identity) {
        return LinkCommand::PhaseUpdate { phase };
    }

    if let Some((frame, target)) = parse_control_frame(buf) {
        return LinkCommand::Control { frame, target };
    }

    LinkCommand::Unrecognized
}

/// `"<identity>:<phase>"`; the phase is everything after the first separator
fn parse_phase_update(buf: &[u8], identity: &str) -> Option<String> {
    let id = identity.as_bytes();
    if !buf.starts_with(id) || buf.get(id.len()) != Some(&PHASE_SEPARATOR) {
        return None;
    }

    let sep = buf.iter().position(|&b| b == PHASE_SEPARATOR)?;
    Some(String::from_utf8_lossy(&buf[sep + 1..]).into_owned())
}

/// Fixed binary layout; bytes past the first 24 are ignored
fn parse_control_frame(buf: &[u8]) -> Option<(ControlFrame, String)> {
    let record = buf.get(..CONTROL_FRAME_LEN)?;
    let (id_field, rest) = record.split_at(IDENTITY_LEN);
    let (axes, buttons) = rest.split_at(AXES_LEN);

    // The identity field is not terminated when all 16 bytes are used
    let id_end = id_field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(IDENTITY_LEN);
    let target = String::from_utf8_lossy(&id_field[..id_end]).into_owned();

    let frame = ControlFrame::from_parts([axes[0], axes[1], axes[2], axes[3]], buttons[0]);
    Some((frame, target))
}

/// Encode a control frame addressed to `identity`
///
/// The identity is truncated to 16 bytes and zero padded.
pub fn encode_control_frame(identity: &str, frame: &ControlFrame) -> Bytes {
    let mut buf = BytesMut::with_capacity(CONTROL_FRAME_LEN);

    let id = identity.as_bytes();
    let id = &id[..id.len().min(IDENTITY_LEN)];
    buf.put_slice(id);
    buf.put_bytes(0, IDENTITY_LEN - id.len());

    buf.put_u8(frame.left_x);
    buf.put_u8(frame.left_y);
    buf.put_u8(frame.right_x);
    buf.put_u8(frame.right_y);
    buf.put_bytes(UNUSED_AXIS, AXES_LEN - 4);

    buf.put_u8(frame.buttons());
    buf.put_bytes(0, BUTTONS_LEN - 1);

    buf.freeze()
}

/// Encode `"<identity>:<phase>"`
pub fn encode_phase_update(identity: &str, phase: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(identity.len() + 1 + phase.len());
    buf.put_slice(identity.as_bytes());
    buf.put_u8(PHASE_SEPARATOR);
    buf.put_slice(phase.as_bytes());
    buf.freeze()
}

/// Encode the emergency stop token, or its release
pub fn encode_emergency_stop(engage: bool) -> Bytes {
    if engage {
        Bytes::from_static(ESTOP_TOKEN)
    } else {
        Bytes::from_static(ESTOP_RELEASE_TOKEN)
    }
}

/// Periodic broadcast advertising a robot's identity and address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryAnnouncement {
    pub identity: String,
    pub address: IpAddr,
}

impl DiscoveryAnnouncement {
    pub fn new(identity: impl Into<String>, address: IpAddr) -> Self {
        Self {
            identity: identity.into(),
            address,
        }
    }

    /// `"DISCOVER:<identity>:<address>"` as UTF-8
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!(
            "{}{}:{}",
            DISCOVERY_PREFIX, self.identity, self.address
        ))
    }

    /// Parse an announcement heard on the discovery port
    ///
    /// Returns `None` for anything that is not a well-formed announcement.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(buf).ok()?;
        let body = text.strip_prefix(DISCOVERY_PREFIX)?;
        let (identity, address) = body.split_once(':')?;
        if identity.is_empty() {
            return None;
        }
        let address = address.trim().parse().ok()?;
        Some(Self::new(identity, address))
    }
}
