//! Joystick to actuator mapping used by the robot binary
//!
//! Tank drive: each stick's Y axis drives the motor on its side. Cross and
//! circle spin the auxiliary motor forward and back, triangle and square
//! swing the servo to either end of its travel.

use crate::actuator::{ActuatorDriver, Actuators};
use minibot_shared::codec::{ControlFrame, AXIS_CENTER};
use minibot_shared::drive::{SERVO_MAX_ANGLE, SERVO_MIN_ANGLE, SERVO_NEUTRAL_ANGLE};
use tracing::warn;

/// Stick travel around the centre treated as zero
const DEADBAND: f32 = 0.05;

/// Convert a raw axis byte to [-1.0, 1.0], stick up positive
pub fn axis_to_drive(raw: u8) -> f32 {
    let value = ((AXIS_CENTER as f32 - raw as f32) / AXIS_CENTER as f32).clamp(-1.0, 1.0);
    if value.abs() < DEADBAND {
        0.0
    } else {
        value
    }
}

/// Apply one accepted frame to the outputs
pub fn tank_drive<D: ActuatorDriver>(frame: &ControlFrame, actuators: &mut Actuators<D>) {
    let aux = match (frame.cross, frame.circle) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    };
    let servo = match (frame.triangle, frame.square) {
        (true, false) => SERVO_MAX_ANGLE,
        (false, true) => SERVO_MIN_ANGLE,
        _ => SERVO_NEUTRAL_ANGLE,
    };

    let results = [
        actuators.drive_left(axis_to_drive(frame.left_y)),
        actuators.drive_right(axis_to_drive(frame.right_y)),
        actuators.drive_aux(aux),
        actuators.set_servo(servo),
    ];
    for result in results {
        if let Err(e) = result {
            warn!("Drive command rejected: {}", e);
        }
    }
}
