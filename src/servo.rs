use crate::consts::{
    Degrees, DEFAULT_MAX_PULSE_US, DEFAULT_MIN_PULSE_US, DEFAULT_PERIOD_US, MAX_ANGLE,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ServoError {
    #[error("Angle {0} is outside 0-180")]
    AngleOutOfRange(Degrees),

    #[error("Servo used before attach")]
    NotAttached,

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("Unsupported PWM channel {0}")]
    InvalidChannel(u8),

    #[cfg(feature = "rpi")]
    #[error("{0}")]
    Pwm(#[from] rppal::pwm::Error),
}

/// Pulse widths mapped over the 0-180 degree range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Calibration {
    /// Pulse for 0 degrees.
    pub min_pulse_us: u32,
    /// Pulse for 180 degrees.
    pub max_pulse_us: u32,
    /// PWM period; 20ms for hobby servos.
    pub period_us: u32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            min_pulse_us: DEFAULT_MIN_PULSE_US,
            max_pulse_us: DEFAULT_MAX_PULSE_US,
            period_us: DEFAULT_PERIOD_US,
        }
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<(), ServoError> {
        if self.min_pulse_us >= self.max_pulse_us {
            return Err(ServoError::InvalidCalibration(format!(
                "min pulse {}us must be below max pulse {}us",
                self.min_pulse_us, self.max_pulse_us
            )));
        }
        if self.max_pulse_us > self.period_us {
            return Err(ServoError::InvalidCalibration(format!(
                "max pulse {}us does not fit in period {}us",
                self.max_pulse_us, self.period_us
            )));
        }
        Ok(())
    }

    /// Linear map of angle to pulse width. Never above `max_pulse_us`.
    pub fn pulse_us(&self, angle: Degrees) -> Result<u32, ServoError> {
        if angle > MAX_ANGLE {
            return Err(ServoError::AngleOutOfRange(angle));
        }
        self.validate()?;
        let range = (self.max_pulse_us - self.min_pulse_us) as u64;
        let offset = range * angle as u64 / MAX_ANGLE as u64;
        Ok(self.min_pulse_us + offset as u32)
    }
}

/// A rotary actuator that can be told to go to an angle.
///
/// There is no position feedback: after `write_angle` returns, the servo is
/// assumed to get there eventually.
pub trait Servo {
    /// Apply calibration once, before the first `write_angle`.
    fn attach(&mut self, calibration: Calibration) -> Result<(), ServoError>;

    fn write_angle(&mut self, angle: Degrees) -> Result<(), ServoError>;

    /// Last commanded angle.
    fn angle(&self) -> Option<Degrees>;
}

impl<S: Servo + ?Sized> Servo for Box<S> {
    fn attach(&mut self, calibration: Calibration) -> Result<(), ServoError> {
        (**self).attach(calibration)
    }

    fn write_angle(&mut self, angle: Degrees) -> Result<(), ServoError> {
        (**self).write_angle(angle)
    }

    fn angle(&self) -> Option<Degrees> {
        (**self).angle()
    }
}

/// Servo that only remembers what it was told. Dry runs and tests.
#[derive(Debug, Default)]
pub struct SimulatedServo {
    calibration: Option<Calibration>,
    angle: Option<Degrees>,
    pulse_us: Option<u32>,
    writes: usize,
}

impl SimulatedServo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulse_us(&self) -> Option<u32> {
        self.pulse_us
    }

    /// Number of successful `write_angle` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Servo for SimulatedServo {
    fn attach(&mut self, calibration: Calibration) -> Result<(), ServoError> {
        calibration.validate()?;
        info!("Simulated servo attached with {:?}", calibration);
        self.calibration = Some(calibration);
        Ok(())
    }

    fn write_angle(&mut self, angle: Degrees) -> Result<(), ServoError> {
        let calibration = self.calibration.ok_or(ServoError::NotAttached)?;
        let pulse = calibration.pulse_us(angle)?;
        debug!("Simulated servo -> {} deg ({}us)", angle, pulse);
        self.angle = Some(angle);
        self.pulse_us = Some(pulse);
        self.writes += 1;
        Ok(())
    }

    fn angle(&self) -> Option<Degrees> {
        self.angle
    }
}

#[cfg(feature = "rpi")]
pub use rpi::PwmServo;

#[cfg(feature = "rpi")]
mod rpi {
    use super::{Calibration, Servo, ServoError};
    use crate::consts::Degrees;
    use rppal::pwm::{Channel, Polarity, Pwm};
    use std::time::Duration;
    use tracing::{debug, info, warn};

    /// Servo on a Raspberry Pi hardware PWM channel.
    pub struct PwmServo {
        channel: Channel,
        pwm: Option<Pwm>,
        calibration: Calibration,
        angle: Option<Degrees>,
    }

    impl PwmServo {
        pub fn new(channel: u8) -> Result<Self, ServoError> {
            let channel = match channel {
                0 => Channel::Pwm0,
                1 => Channel::Pwm1,
                other => return Err(ServoError::InvalidChannel(other)),
            };
            Ok(Self {
                channel,
                pwm: None,
                calibration: Calibration::default(),
                angle: None,
            })
        }
    }

    impl Servo for PwmServo {
        fn attach(&mut self, calibration: Calibration) -> Result<(), ServoError> {
            calibration.validate()?;
            // Output stays disabled until the first angle is written.
            let pwm = Pwm::with_period(
                self.channel,
                Duration::from_micros(calibration.period_us as u64),
                Duration::from_micros(calibration.min_pulse_us as u64),
                Polarity::Normal,
                false,
            )?;
            info!("PWM servo attached on {:?} with {:?}", self.channel, calibration);
            self.pwm = Some(pwm);
            self.calibration = calibration;
            Ok(())
        }

        fn write_angle(&mut self, angle: Degrees) -> Result<(), ServoError> {
            let pwm = self.pwm.as_ref().ok_or(ServoError::NotAttached)?;
            let pulse = self.calibration.pulse_us(angle)?;
            pwm.set_pulse_width(Duration::from_micros(pulse as u64))?;
            pwm.enable()?;
            debug!("PWM servo -> {} deg ({}us)", angle, pulse);
            self.angle = Some(angle);
            Ok(())
        }

        fn angle(&self) -> Option<Degrees> {
            self.angle
        }
    }

    impl Drop for PwmServo {
        fn drop(&mut self) {
            if let Some(pwm) = &self.pwm {
                if let Err(err) = pwm.disable() {
                    warn!("PWM failed to disable on drop: {}", err);
                }
            }
        }
    }
}
