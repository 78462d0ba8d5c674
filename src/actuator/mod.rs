//! Actuator outputs
//!
//! `Actuators` owns the PWM driver and applies the drive mapping before every
//! write, so a rejected value never reaches the hardware.

mod pwm;
mod traits;

pub use pwm::SimulatedPwm;
pub use traits::{ActuatorDriver, ActuatorError};

use crate::config::PwmSettings;
use minibot_shared::drive::{self, SERVO_NEUTRAL_ANGLE};
use minibot_shared::Channel;
use tracing::warn;

/// The robot's three drive motors and one servo
pub struct Actuators<D: ActuatorDriver> {
    driver: D,
    pwm: PwmSettings,
}

impl<D: ActuatorDriver> Actuators<D> {
    pub fn new(driver: D, pwm: PwmSettings) -> Self {
        Self { driver, pwm }
    }

    /// Configure all four channels with the shared PWM settings
    pub fn configure_all(&mut self) -> Result<(), ActuatorError> {
        for channel in Channel::ALL {
            self.driver
                .configure(channel, self.pwm.frequency_hz, self.pwm.resolution_bits)?;
        }
        Ok(())
    }

    /// Drive a motor channel with a normalized value in [-1.0, 1.0]
    pub fn drive(&mut self, channel: Channel, value: f32) -> Result<(), ActuatorError> {
        debug_assert!(channel.is_motor(), "{} is not a drive motor", channel);
        let duty = drive::drive_duty(value)?;
        self.driver.write(channel, duty)
    }

    pub fn drive_left(&mut self, value: f32) -> Result<(), ActuatorError> {
        self.drive(Channel::LeftMotor, value)
    }

    pub fn drive_right(&mut self, value: f32) -> Result<(), ActuatorError> {
        self.drive(Channel::RightMotor, value)
    }

    pub fn drive_aux(&mut self, value: f32) -> Result<(), ActuatorError> {
        self.drive(Channel::AuxMotor, value)
    }

    /// Move the servo to an angle in [-50, 50] degrees
    pub fn set_servo(&mut self, angle: i32) -> Result<(), ActuatorError> {
        let duty = drive::servo_duty(angle, drive::full_scale(self.pwm.resolution_bits))?;
        self.driver.write(Channel::Servo, duty)
    }

    /// Put every channel into neutral
    ///
    /// Attempts all four channels even if one fails and returns the first
    /// error.
    pub fn stop_all(&mut self) -> Result<(), ActuatorError> {
        let mut results = Vec::with_capacity(Channel::ALL.len());
        for channel in Channel::MOTORS {
            results.push(self.drive(channel, 0.0));
        }
        results.push(self.set_servo(SERVO_NEUTRAL_ANGLE));

        let mut first_err = None;
        for result in results {
            if let Err(e) = result {
                warn!("Failed to neutralize actuator: {}", e);
                first_err.get_or_insert(e);
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }
}

#[cfg(test)]
impl<D: ActuatorDriver> Actuators<D> {
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Actuators<SimulatedPwm> {
        let mut actuators = Actuators::new(SimulatedPwm::new(), PwmSettings::default());
        actuators.configure_all().unwrap();
        actuators
    }

    #[test]
    fn test_configure_all() {
        let actuators = configured();
        for channel in Channel::ALL {
            assert!(actuators.driver().is_configured(channel));
            assert_eq!(actuators.driver().frequency(channel), 100);
        }
    }

    #[test]
    fn test_drive_writes_mapped_duty() {
        let mut actuators = configured();
        actuators.drive_left(1.0).unwrap();
        actuators.drive_right(-1.0).unwrap();
        actuators.drive_aux(0.0).unwrap();

        assert_eq!(actuators.driver().duty(Channel::LeftMotor), Some(120));
        assert_eq!(actuators.driver().duty(Channel::RightMotor), Some(60));
        assert_eq!(actuators.driver().duty(Channel::AuxMotor), Some(90));
    }

    #[test]
    fn test_out_of_range_keeps_prior_output() {
        let mut actuators = configured();
        actuators.drive_left(0.5).unwrap();
        actuators.set_servo(20).unwrap();
        let servo_before = actuators.driver().duty(Channel::Servo);

        assert!(matches!(
            actuators.drive_left(1.5),
            Err(ActuatorError::OutOfRange(_))
        ));
        assert!(actuators.set_servo(-90).is_err());

        assert_eq!(actuators.driver().duty(Channel::LeftMotor), Some(105));
        assert_eq!(actuators.driver().duty(Channel::Servo), servo_before);
        assert_eq!(actuators.driver().write_count(Channel::LeftMotor), 1);
    }

    #[test]
    fn test_stop_all_neutralizes_every_channel() {
        let mut actuators = configured();
        actuators.drive_left(1.0).unwrap();
        actuators.drive_right(-0.4).unwrap();
        actuators.drive_aux(0.9).unwrap();
        actuators.set_servo(50).unwrap();

        actuators.stop_all().unwrap();

        for channel in Channel::MOTORS {
            assert_eq!(actuators.driver().duty(channel), Some(90));
        }
        assert_eq!(actuators.driver().duty(Channel::Servo), Some(9830));
    }

    #[test]
    fn test_stop_all_reports_unconfigured_driver() {
        let mut actuators = Actuators::new(SimulatedPwm::new(), PwmSettings::default());
        assert_eq!(
            actuators.stop_all(),
            Err(ActuatorError::NotConfigured(Channel::LeftMotor))
        );
    }
}
