//! Robot configuration.
//!
//! Everything here is read once at startup and never changes afterwards. All
//! fields are optional in the JSON form; missing ones take the values the robot
//! was originally wired and tuned with.

use core::fmt;

use embassy_time::Duration;
use serde::Deserialize;

use crate::utils::{
    controllers::motor::{CanId, DriveIds, MotorFamily, MAX_CAN_ID},
    math::arcade::{ArcadeMapping, DEFAULT_DEADBAND, DEFAULT_MAX_OUTPUT},
};

/// Time the autonomous routine drives before stopping.
pub const DEFAULT_AUTO_DRIVE_TIME_MS: u64 = 2_000;
/// Forward demand used by the autonomous routine.
pub const DEFAULT_AUTO_FORWARD_SPEED: f32 = 0.5;

/// Errors from loading or validating a configuration.
#[derive(Debug)]
pub enum ConfigError {
    NoMotorFamily,
    MultipleMotorFamilies,
    DuplicateId(CanId),
    InvalidId(CanId),
    InvalidDeadband(f32),
    InvalidMaxOutput(f32),
    InvalidForwardSpeed(f32),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigError::NoMotorFamily => f.write_str("no motor family selected"),
            ConfigError::MultipleMotorFamilies => {
                f.write_str("more than one motor family selected")
            }
            ConfigError::DuplicateId(id) => write!(f, "controller ID {} used twice", id),
            ConfigError::InvalidId(id) => {
                write!(f, "controller ID {} out of range (0..={})", id, MAX_CAN_ID)
            }
            ConfigError::InvalidDeadband(v) => write!(f, "deadband {} not in [0, 1)", v),
            ConfigError::InvalidMaxOutput(v) => write!(f, "max output {} not in (0, 1]", v),
            ConfigError::InvalidForwardSpeed(v) => {
                write!(f, "autonomous forward speed {} not in [-1, 1]", v)
            }
            ConfigError::Parse(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Raw motor family flags. Exactly one must be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MotorSelection {
    pub spark_max_neo: bool,
    pub talon_fx_falcon: bool,
}

impl Default for MotorSelection {
    fn default() -> Self {
        Self {
            spark_max_neo: true,
            talon_fx_falcon: false,
        }
    }
}

impl MotorSelection {
    pub fn resolve(&self) -> Result<MotorFamily, ConfigError> {
        match (self.spark_max_neo, self.talon_fx_falcon) {
            (true, false) => Ok(MotorFamily::SparkMaxNeo),
            (false, true) => Ok(MotorFamily::TalonFxFalcon),
            (false, false) => Err(ConfigError::NoMotorFamily),
            (true, true) => Err(ConfigError::MultipleMotorFamilies),
        }
    }
}

/// Drive behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveTuning {
    /// Flip the right side so positive demand drives both sides forward.
    pub right_side_inverted: bool,
    pub deadband: f32,
    pub square_inputs: bool,
    pub max_output: f32,
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self {
            right_side_inverted: true,
            deadband: DEFAULT_DEADBAND,
            square_inputs: true,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

impl DriveTuning {
    pub fn mapping(&self) -> ArcadeMapping {
        ArcadeMapping::new(self.deadband, self.square_inputs, self.max_output)
    }
}

/// Timed straight-line autonomous routine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutonomousConfig {
    pub drive_time_ms: u64,
    pub forward_speed: f32,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            drive_time_ms: DEFAULT_AUTO_DRIVE_TIME_MS,
            forward_speed: DEFAULT_AUTO_FORWARD_SPEED,
        }
    }
}

impl AutonomousConfig {
    pub fn drive_time(&self) -> Duration {
        Duration::from_millis(self.drive_time_ms)
    }
}

/// Configuration as loaded, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub motors: MotorSelection,
    /// Overrides the selected family's factory ID table.
    pub ids: Option<DriveIds>,
    pub drive: DriveTuning,
    pub autonomous: AutonomousConfig,
}

/// A configuration that passed validation.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub family: MotorFamily,
    pub ids: DriveIds,
    pub drive: DriveTuning,
    pub autonomous: AutonomousConfig,
}

impl RobotConfig {
    /// Parse a JSON document. The result still has to go through [`validate`](Self::validate).
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn validate(&self) -> Result<ResolvedConfig, ConfigError> {
        let family = self.motors.resolve()?;
        let ids = self.ids.clone().unwrap_or_else(|| family.default_ids());
        check_ids(&ids)?;

        let d = self.drive.deadband;
        if !(0.0..1.0).contains(&d) {
            return Err(ConfigError::InvalidDeadband(d));
        }
        let m = self.drive.max_output;
        if !(m > 0.0 && m <= 1.0) {
            return Err(ConfigError::InvalidMaxOutput(m));
        }
        let s = self.autonomous.forward_speed;
        if !(-1.0..=1.0).contains(&s) {
            return Err(ConfigError::InvalidForwardSpeed(s));
        }

        Ok(ResolvedConfig {
            family,
            ids,
            drive: self.drive,
            autonomous: self.autonomous,
        })
    }
}

fn check_ids(ids: &DriveIds) -> Result<(), ConfigError> {
    for (i, id) in ids.iter().enumerate() {
        if id.0 > MAX_CAN_ID {
            return Err(ConfigError::InvalidId(id));
        }
        if ids.iter().skip(i + 1).any(|other| other == id) {
            return Err(ConfigError::DuplicateId(id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selects_neo() {
        let cfg = RobotConfig::default().validate().unwrap();
        assert_eq!(cfg.family, MotorFamily::SparkMaxNeo);
        assert_eq!(cfg.ids, MotorFamily::SparkMaxNeo.default_ids());
        assert!(cfg.drive.right_side_inverted);
        assert_eq!(cfg.autonomous.drive_time(), Duration::from_millis(2000));
    }

    #[test]
    fn test_exactly_one_family() {
        let none = MotorSelection {
            spark_max_neo: false,
            talon_fx_falcon: false,
        };
        assert!(matches!(none.resolve(), Err(ConfigError::NoMotorFamily)));

        let both = MotorSelection {
            spark_max_neo: true,
            talon_fx_falcon: true,
        };
        assert!(matches!(
            both.resolve(),
            Err(ConfigError::MultipleMotorFamilies)
        ));

        let falcon = MotorSelection {
            spark_max_neo: false,
            talon_fx_falcon: true,
        };
        assert_eq!(falcon.resolve().unwrap(), MotorFamily::TalonFxFalcon);
    }

    #[test]
    fn test_family_id_tables_are_disjoint() {
        let neo = MotorFamily::SparkMaxNeo.default_ids();
        let falcon = MotorFamily::TalonFxFalcon.default_ids();
        assert!(check_ids(&neo).is_ok());
        assert!(check_ids(&falcon).is_ok());
        for id in neo.iter() {
            assert!(falcon.iter().all(|other| other != id));
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut ids = MotorFamily::SparkMaxNeo.default_ids();
        ids.right.followers[1] = CanId(5);
        let cfg = RobotConfig {
            ids: Some(ids),
            ..RobotConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DuplicateId(CanId(5)))
        ));
    }

    #[test]
    fn test_out_of_range_tuning_rejected() {
        let mut cfg = RobotConfig::default();
        cfg.drive.deadband = 1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidDeadband(_))));

        let mut cfg = RobotConfig::default();
        cfg.drive.max_output = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidMaxOutput(_))));

        let mut cfg = RobotConfig::default();
        cfg.autonomous.forward_speed = f32::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidForwardSpeed(_))
        ));
    }
}
