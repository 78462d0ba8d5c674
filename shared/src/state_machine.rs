//! Robot Session State Machine
//!
//! Owns the session state of one robot and decides how each classified
//! command mutates it. The machine is passive: it never touches hardware,
//! it tells the caller what happened through `TransitionResult`.

use crate::codec::{ControlFrame, LinkCommand};
use crate::link;

/// Coarse link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Booting; every command is ignored
    Standby,
    /// Startup complete; commands are applied
    Active,
}

/// Why a command left the session untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Activation has not happened yet
    NotActive,
    /// Motion is blocked by an emergency stop
    EmergencyStopped,
    /// Control frames only apply during teleop
    NotTeleop,
    /// Control frame addressed to another robot
    IdentityMismatch,
    /// Datagram did not match any known shape
    Unrecognized,
}

/// Result of applying one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Emergency stop engaged; all actuators must go to neutral now
    EmergencyStop,
    /// Emergency stop lifted; actuators stay neutral until the next frame
    EmergencyStopReleased,
    /// Game phase changed
    PhaseChanged { from: String, to: String },
    /// A new control frame is the authoritative joystick state
    FrameAccepted(ControlFrame),
    /// Nothing changed
    Rejected(RejectReason),
}

/// The session state machine for one robot
#[derive(Debug)]
pub struct SessionStateMachine {
    identity: String,
    state: LinkState,
    emergency_stopped: bool,
    game_phase: String,
    last_command_at: Option<u64>,
    last_announce_at: Option<u64>,
    latest_frame: ControlFrame,
}

impl SessionStateMachine {
    /// Create a machine in `Standby` for the robot named `identity`
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            state: LinkState::Standby,
            emergency_stopped: false,
            game_phase: link::STANDBY_PHASE.to_string(),
            last_command_at: None,
            last_announce_at: None,
            latest_frame: ControlFrame::neutral(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// True once activation completed; never reset
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Active
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stopped
    }

    pub fn game_phase(&self) -> &str {
        &self.game_phase
    }

    pub fn is_teleop(&self) -> bool {
        self.game_phase == link::TELEOP_PHASE
    }

    pub fn latest_frame(&self) -> &ControlFrame {
        &self.latest_frame
    }

    pub fn last_command_at(&self) -> Option<u64> {
        self.last_command_at
    }

    pub fn last_announce_at(&self) -> Option<u64> {
        self.last_announce_at
    }

    /// One-time `Standby -> Active` transition
    ///
    /// Returns `false` if the machine was already active.
    pub fn activate(&mut self) -> bool {
        if self.state == LinkState::Active {
            return false;
        }
        self.state = LinkState::Active;
        true
    }

    /// Apply a classified command received at `now_ms`
    pub fn process(&mut self, command: LinkCommand, now_ms: u64) -> TransitionResult {
        if self.state != LinkState::Active {
            return TransitionResult::Rejected(RejectReason::NotActive);
        }

        match command {
            LinkCommand::EmergencyStop => {
                self.emergency_stopped = true;
                self.last_command_at = Some(now_ms);
                TransitionResult::EmergencyStop
            }
            LinkCommand::EmergencyStopRelease => {
                self.emergency_stopped = false;
                self.last_command_at = Some(now_ms);
                TransitionResult::EmergencyStopReleased
            }
            LinkCommand::PhaseUpdate { phase } => {
                let from = std::mem::replace(&mut self.game_phase, phase);
                self.last_command_at = Some(now_ms);
                TransitionResult::PhaseChanged {
                    from,
                    to: self.game_phase.clone(),
                }
            }
            LinkCommand::Control { frame, target } => {
                if let Some(reason) = self.control_guard(&target) {
                    return TransitionResult::Rejected(reason);
                }
                self.latest_frame = frame;
                self.last_command_at = Some(now_ms);
                TransitionResult::FrameAccepted(frame)
            }
            LinkCommand::Unrecognized => TransitionResult::Rejected(RejectReason::Unrecognized),
        }
    }

    /// First guard a control frame for `target` fails, if any
    fn control_guard(&self, target: &str) -> Option<RejectReason> {
        if self.emergency_stopped {
            Some(RejectReason::EmergencyStopped)
        } else if !self.is_teleop() {
            Some(RejectReason::NotTeleop)
        } else if target != self.identity {
            Some(RejectReason::IdentityMismatch)
        } else {
            None
        }
    }

    /// Check whether the operator has gone silent for too long
    pub fn is_command_timed_out(&self, now_ms: u64) -> bool {
        if self.state != LinkState::Active {
            return false;
        }
        match self.last_command_at {
            // Never received a command yet
            None => false,
            Some(at) => now_ms.saturating_sub(at) > link::COMMAND_TIMEOUT_MS,
        }
    }

    /// Check whether a discovery announcement is due
    pub fn is_announce_due(&self, now_ms: u64) -> bool {
        match self.last_announce_at {
            None => true,
            Some(at) => now_ms.saturating_sub(at) > link::ANNOUNCE_INTERVAL_MS,
        }
    }

    /// Record that an announcement went out at `now_ms`
    pub fn mark_announced(&mut self, now_ms: u64) {
        self.last_announce_at = Some(now_ms);
    }
}
