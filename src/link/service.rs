//! Link Service
//!
//! Drives the command link one tick at a time: periodic discovery
//! announcements, the command timeout fail-safe, and one inbound datagram
//! per tick fed through the codec into the session state machine.

use crate::actuator::{ActuatorDriver, Actuators};
use crate::config::LinkConfig;
use crate::transport::DatagramTransport;
use anyhow::{Context, Result};
use minibot_shared::{
    codec::{self, ControlFrame, DiscoveryAnnouncement},
    link, RejectReason, SessionStateMachine, TransitionResult,
};
use std::net::SocketAddr;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A discovery announcement was sent
    pub announced: bool,
    /// The command timeout forced actuators to neutral
    pub fail_safe: bool,
    /// Outcome of the datagram received this tick, if any
    pub transition: Option<TransitionResult>,
}

impl TickReport {
    /// A control frame was accepted and is now the latest joystick state
    pub fn frame_updated(&self) -> bool {
        matches!(self.transition, Some(TransitionResult::FrameAccepted(_)))
    }
}

/// Owns the transport, the actuators and the session state of one robot
pub struct LinkService<T: DatagramTransport, D: ActuatorDriver> {
    config: LinkConfig,
    transport: T,
    actuators: Actuators<D>,
    session: SessionStateMachine,
    discovery_target: SocketAddr,
    recv_buf: [u8; link::RECV_BUFFER_LEN],
    fail_safe_engaged: bool,
}

impl<T: DatagramTransport, D: ActuatorDriver> LinkService<T, D> {
    /// Create a service in standby; call `start` before ticking
    pub fn new(config: LinkConfig, transport: T, actuators: Actuators<D>) -> Self {
        let session = SessionStateMachine::new(config.robot_id.clone());
        let discovery_target = SocketAddr::new(config.broadcast_address, config.discovery_port);

        Self {
            config,
            transport,
            actuators,
            session,
            discovery_target,
            recv_buf: [0u8; link::RECV_BUFFER_LEN],
            fail_safe_engaged: false,
        }
    }

    /// Bring the link up: configure outputs, announce, activate, go neutral
    pub fn start(&mut self, now_ms: u64) -> Result<()> {
        self.actuators
            .configure_all()
            .context("Failed to configure actuator outputs")?;

        self.announce(now_ms);

        if self.session.activate() {
            info!(
                "[LINK] {} active on {} via {}",
                self.session.identity(),
                self.transport.local_ip(),
                self.transport.name()
            );
        } else {
            warn!("[LINK] start called on an already active link");
        }

        self.actuators
            .stop_all()
            .context("Failed to neutralize actuators at startup")?;
        Ok(())
    }

    /// Run one control loop iteration at `now_ms`
    ///
    /// Never blocks and never fails; transport and actuator errors are
    /// logged and the tick carries on.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        if self.session.is_announce_due(now_ms) {
            report.announced = self.announce(now_ms);
        }

        if self.session.is_command_timed_out(now_ms) {
            if !self.fail_safe_engaged {
                warn!("[LINK] Connection timeout - stopping motors");
                self.fail_safe_engaged = true;
            }
            self.neutralize();
            report.fail_safe = true;
        } else if self.fail_safe_engaged {
            info!("[LINK] Operator link restored");
            self.fail_safe_engaged = false;
        }

        let n = match self.transport.poll_datagram(&mut self.recv_buf) {
            Ok(Some((n, from))) => {
                trace!("[LINK] {} bytes from {}", n, from);
                n
            }
            Ok(None) => return report,
            Err(e) => {
                debug!("[LINK] Receive failed, treating as idle: {}", e);
                return report;
            }
        };

        let command = codec::classify(&self.recv_buf[..n], self.session.identity());
        let kind = command.kind();
        let result = self.session.process(command, now_ms);
        self.apply(&result, kind);
        report.transition = Some(result);
        report
    }

    /// Tick on a fixed interval until Ctrl-C
    ///
    /// `on_frame` runs after every tick that accepted a control frame and
    /// decides how joystick state becomes motor output.
    pub async fn run<F>(mut self, mut on_frame: F) -> Result<()>
    where
        F: FnMut(&ControlFrame, &mut Actuators<D>),
    {
        let clock = Instant::now();
        self.start(0)?;

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now_ms = clock.elapsed().as_millis() as u64;
                    let report = self.tick(now_ms);
                    if report.frame_updated() {
                        let frame = *self.session.latest_frame();
                        on_frame(&frame, &mut self.actuators);
                    }
                }
                _ = &mut shutdown => {
                    info!(
                        "[LINK] Shutdown requested in phase {}, stopping motors",
                        self.session.game_phase()
                    );
                    self.actuators.stop_all()?;
                    return Ok(());
                }
            }
        }
    }

    /// Broadcast the discovery announcement; returns whether it was sent
    fn announce(&mut self, now_ms: u64) -> bool {
        let announcement =
            DiscoveryAnnouncement::new(self.session.identity(), self.transport.local_ip());
        let payload = announcement.encode();

        // Counted even on failure so a dead network is retried at the normal cadence
        self.session.mark_announced(now_ms);

        match self.transport.send_datagram(&payload, self.discovery_target) {
            Ok(()) => {
                debug!("[LINK] Sent discovery ping to {}", self.discovery_target);
                true
            }
            Err(e) => {
                warn!("[LINK] Failed to send discovery ping: {}", e);
                false
            }
        }
    }

    fn apply(&mut self, result: &TransitionResult, kind: &'static str) {
        match result {
            TransitionResult::EmergencyStop => {
                error!("[LINK] EMERGENCY STOP ACTIVATED");
                self.neutralize();
            }
            TransitionResult::EmergencyStopReleased => {
                info!("[LINK] Emergency stop released");
            }
            TransitionResult::PhaseChanged { from, to } => {
                info!("[LINK] Game phase: {} -> {}", from, to);
            }
            TransitionResult::FrameAccepted(frame) => {
                trace!("[LINK] Control frame accepted: {:?}", frame);
            }
            TransitionResult::Rejected(RejectReason::Unrecognized) => {
                trace!("[LINK] Dropped unrecognized datagram");
            }
            TransitionResult::Rejected(reason) => {
                debug!("[LINK] Ignored {} command: {:?}", kind, reason);
            }
        }
    }

    fn neutralize(&mut self) {
        if let Err(e) = self.actuators.stop_all() {
            error!("[LINK] Failed to stop motors: {}", e);
        }
    }
}

#[cfg(test)]
impl<T: DatagramTransport, D: ActuatorDriver> LinkService<T, D> {
    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn actuators_mut(&mut self) -> &mut Actuators<D> {
        &mut self.actuators
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn actuators(&self) -> &Actuators<D> {
        &self.actuators
    }
}
