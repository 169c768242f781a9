use crate::consts::{Degrees, DEFAULT_CLOSED_ANGLE, DEFAULT_OPEN_ANGLE, MAX_ANGLE, MAX_LINE_LENGTH};
use crate::reply::Dialect;
use crate::servo::Calibration;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GateConfig {
    pub open_angle: Degrees,
    pub closed_angle: Degrees,
    /// Time the barrier needs to travel. 0 - report final state at once.
    pub move_time_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            open_angle: DEFAULT_OPEN_ANGLE,
            closed_angle: DEFAULT_CLOSED_ANGLE,
            move_time_ms: 0,
        }
    }
}

impl GateConfig {
    pub fn move_time(&self) -> Duration {
        Duration::from_millis(self.move_time_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServoConfig {
    /// Hardware PWM channel (0 or 1) on the Pi.
    pub pwm_channel: u8,
    pub calibration: Calibration,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            pwm_channel: 0,
            calibration: Calibration::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub gate: GateConfig,
    pub servo: ServoConfig,
    pub dialect: Dialect,
    pub max_line_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            servo: ServoConfig::default(),
            dialect: Dialect::default(),
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(filename: P) -> anyhow::Result<Self> {
        let handle = File::open(filename)?;
        let data: Config = serde_yaml::from_reader(handle)?;
        data.validate()?;

        Ok(data)
    }

    pub fn from_yaml(data: &str) -> anyhow::Result<Self> {
        let data: Config = serde_yaml::from_str(data)?;
        data.validate()?;

        Ok(data)
    }

    /// Read the file if it exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(filename: P) -> anyhow::Result<Self> {
        let filename = filename.as_ref();
        if !filename.exists() {
            warn!(
                "Configuration file {} not found, using defaults",
                filename.display()
            );
            return Ok(Self::default());
        }
        Self::from_file(filename)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, angle) in [
            ("open_angle", self.gate.open_angle),
            ("closed_angle", self.gate.closed_angle),
        ] {
            if angle > MAX_ANGLE {
                anyhow::bail!("gate.{} = {} is outside 0-{}", name, angle, MAX_ANGLE);
            }
        }
        if self.max_line_length == 0 {
            anyhow::bail!("max_line_length must be positive");
        }
        self.servo.calibration.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.gate.open_angle, 90);
        assert_eq!(config.gate.closed_angle, 0);
        assert_eq!(config.gate.move_time(), Duration::ZERO);
        assert_eq!(config.dialect, Dialect::Short);
        assert_eq!(config.servo.calibration, Calibration::default());
        assert_eq!(config.max_line_length, MAX_LINE_LENGTH);
    }

    #[test]
    fn full_document() {
        let config = Config::from_yaml(
            r#"
gate:
  open_angle: 100
  closed_angle: 10
  move_time_ms: 1000
servo:
  pwm_channel: 1
  calibration:
    min_pulse_us: 544
    max_pulse_us: 2400
dialect: verbose
max_line_length: 32
"#,
        )
        .unwrap();
        assert_eq!(config.gate.open_angle, 100);
        assert_eq!(config.gate.closed_angle, 10);
        assert_eq!(config.gate.move_time(), Duration::from_secs(1));
        assert_eq!(config.servo.pwm_channel, 1);
        assert_eq!(config.servo.calibration.min_pulse_us, 544);
        assert_eq!(config.servo.calibration.period_us, 20_000);
        assert_eq!(config.dialect, Dialect::Verbose);
        assert_eq!(config.max_line_length, 32);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_angles() {
        assert!(Config::from_yaml("gate:\n  speed: 3\n").is_err());
        assert!(Config::from_yaml("gate:\n  open_angle: 200\n").is_err());
        assert!(Config::from_yaml("max_line_length: 0\n").is_err());
    }

    #[test]
    fn example_file_is_valid() {
        let config =
            Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.yaml")).unwrap();
        assert_eq!(config.gate.move_time(), Duration::from_secs(1));
        assert_eq!(config.dialect, Dialect::Verbose);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("/nonexistent/servo-gate.yaml").unwrap();
        assert_eq!(config.gate.open_angle, 90);
    }
}
