//! Drive value mapping
//!
//! Converts normalized motor commands and servo angles into PWM duty values.
//! Out-of-range inputs are rejected before anything reaches the hardware, so
//! a channel keeps its previous output when a mapping fails.

use thiserror::Error;

/// Duty value that holds a drive motor still
pub const DRIVE_NEUTRAL_DUTY: u32 = 90;

/// Duty swing between neutral and full speed in either direction
pub const DRIVE_DUTY_SPAN: f32 = 30.0;

/// Servo travel limits in degrees
pub const SERVO_MIN_ANGLE: i32 = -50;
pub const SERVO_MAX_ANGLE: i32 = 50;

/// Servo angle treated as neutral
pub const SERVO_NEUTRAL_ANGLE: i32 = 0;

/// Servo pulse width at 0 degrees
const SERVO_CENTER_PULSE_MS: f64 = 1.5;

/// Pulse width change per degree
const SERVO_MS_PER_DEGREE: f64 = 0.01;

/// PWM period the pulse width is measured against
const SERVO_PERIOD_MS: f64 = 10.0;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DriveError {
    #[error("Drive value out of range: {0} (expected -1.0..=1.0)")]
    DriveOutOfRange(f32),

    #[error("Servo angle out of range: {0} (expected {SERVO_MIN_ANGLE}..={SERVO_MAX_ANGLE})")]
    AngleOutOfRange(i32),
}

/// Actuator outputs on the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    LeftMotor,
    RightMotor,
    AuxMotor,
    Servo,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::LeftMotor,
        Channel::RightMotor,
        Channel::AuxMotor,
        Channel::Servo,
    ];

    /// Continuous drive motors
    pub const MOTORS: [Channel; 3] = [Channel::LeftMotor, Channel::RightMotor, Channel::AuxMotor];

    /// Stable index for per-channel tables
    pub fn index(self) -> usize {
        match self {
            Channel::LeftMotor => 0,
            Channel::RightMotor => 1,
            Channel::AuxMotor => 2,
            Channel::Servo => 3,
        }
    }

    pub fn is_motor(self) -> bool {
        !matches!(self, Channel::Servo)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::LeftMotor => write!(f, "left-motor"),
            Channel::RightMotor => write!(f, "right-motor"),
            Channel::AuxMotor => write!(f, "aux-motor"),
            Channel::Servo => write!(f, "servo"),
        }
    }
}

/// Map a normalized drive value in [-1.0, 1.0] to a motor duty
pub fn drive_duty(value: f32) -> Result<u32, DriveError> {
    // NaN fails the range check too
    if !(-1.0..=1.0).contains(&value) {
        return Err(DriveError::DriveOutOfRange(value));
    }
    Ok((value * DRIVE_DUTY_SPAN + DRIVE_NEUTRAL_DUTY as f32).round() as u32)
}

/// Map a servo angle in [-50, 50] degrees to a duty at `full_scale` resolution
pub fn servo_duty(angle: i32, full_scale: u32) -> Result<u32, DriveError> {
    if !(SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&angle) {
        return Err(DriveError::AngleOutOfRange(angle));
    }
    let pulse_ms = SERVO_MS_PER_DEGREE * angle as f64 + SERVO_CENTER_PULSE_MS;
    Ok(((pulse_ms / SERVO_PERIOD_MS) * full_scale as f64) as u32)
}

/// Largest duty value at a given PWM resolution
pub fn full_scale(resolution_bits: u8) -> u32 {
    ((1u64 << resolution_bits.min(32)) - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_SCALE_16: u32 = 65535;

    #[test]
    fn test_drive_duty_reference_points() {
        assert_eq!(drive_duty(0.0), Ok(90));
        assert_eq!(drive_duty(1.0), Ok(120));
        assert_eq!(drive_duty(-1.0), Ok(60));
        assert_eq!(drive_duty(0.5), Ok(105));
    }

    #[test]
    fn test_drive_duty_monotonic() {
        let mut prev = drive_duty(-1.0).unwrap();
        for step in -99..=100 {
            let duty = drive_duty(step as f32 / 100.0).unwrap();
            assert!(duty >= prev, "duty decreased at step {}", step);
            prev = duty;
        }
    }

    #[test]
    fn test_drive_duty_rejects_out_of_range() {
        assert_eq!(drive_duty(1.01), Err(DriveError::DriveOutOfRange(1.01)));
        assert!(drive_duty(-1.5).is_err());
        assert!(drive_duty(f32::NAN).is_err());
        assert!(drive_duty(f32::INFINITY).is_err());
    }

    #[test]
    fn test_servo_duty_reference_points() {
        assert_eq!(servo_duty(0, FULL_SCALE_16), Ok(9830));
        assert_eq!(servo_duty(50, FULL_SCALE_16), Ok(13107));
        assert_eq!(servo_duty(-50, FULL_SCALE_16), Ok(6553));
    }

    #[test]
    fn test_servo_duty_monotonic() {
        let mut prev = servo_duty(SERVO_MIN_ANGLE, FULL_SCALE_16).unwrap();
        for angle in SERVO_MIN_ANGLE + 1..=SERVO_MAX_ANGLE {
            let duty = servo_duty(angle, FULL_SCALE_16).unwrap();
            assert!(duty > prev, "duty not increasing at {} degrees", angle);
            prev = duty;
        }
    }

    #[test]
    fn test_servo_duty_rejects_out_of_range() {
        assert_eq!(servo_duty(51, FULL_SCALE_16), Err(DriveError::AngleOutOfRange(51)));
        assert!(servo_duty(-51, FULL_SCALE_16).is_err());
    }

    #[test]
    fn test_full_scale() {
        assert_eq!(full_scale(16), FULL_SCALE_16);
        assert_eq!(full_scale(8), 255);
    }
}
