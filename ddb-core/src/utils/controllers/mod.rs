//! Module Exports
//!
//! This file exports the drive-side controllers of the robot.
//!
//! - `motor`: motor-controller handles, the bus abstraction and motor groups.
//! - `drive`: the differential drive built from two motor groups.
//!
//! `DriveController` ties them together with the robot configuration and
//! exposes the two drive primitives the robot program calls every tick.

pub mod drive;
pub mod motor;

use core::fmt;

use embassy_time::Duration;

use crate::utils::{
    config::{AutonomousConfig, ConfigError, RobotConfig},
    math::arcade::DriveOutput,
};

pub use drive::{DifferentialDrive, DriveError, Side};
pub use motor::{CanId, HardwareError, MotorBus, MotorController, MotorFamily, MotorGroup};

/// A single drive request for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// Arcade drive with forward speed and rotation rate.
    Arcade { forward: f32, rotate: f32 },
    /// Full stop on both sides.
    Stop,
}

impl AutonomousConfig {
    /// The command the autonomous routine issues `elapsed` after its start.
    ///
    /// Drives straight while `elapsed < drive_time`, stops from then on.
    pub fn command_at(
        &self,
        elapsed: Duration,
    ) -> DriveCommand {
        if elapsed < self.drive_time() {
            DriveCommand::Arcade {
                forward: self.forward_speed,
                rotate: 0.0,
            }
        } else {
            DriveCommand::Stop
        }
    }
}

/// Errors that abort controller initialization.
#[derive(Debug)]
pub enum InitError {
    Config(ConfigError),
    Hardware(HardwareError),
}

impl fmt::Display for InitError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            InitError::Config(e) => write!(f, "configuration error: {}", e),
            InitError::Hardware(e) => write!(f, "hardware error: {}", e),
        }
    }
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        InitError::Config(e)
    }
}

impl From<HardwareError> for InitError {
    fn from(e: HardwareError) -> Self {
        InitError::Hardware(e)
    }
}

/// Owns the drivetrain and turns lifecycle ticks into drive commands.
pub struct DriveController<M> {
    drive: DifferentialDrive<M>,
    family: MotorFamily,
    autonomous: AutonomousConfig,
}

impl<M> DriveController<M>
where
    M: MotorController,
{
    /// Open and configure all six drive motors and build the drive.
    ///
    /// Fails without touching the bus if the configuration does not select
    /// exactly one motor family.
    pub fn init<B>(
        config: &RobotConfig,
        bus: &mut B,
    ) -> Result<Self, InitError>
    where
        B: MotorBus<Motor = M>,
    {
        let cfg = config.validate()?;
        tracing::info!(family = %cfg.family, "initializing drive");

        let left = motor::MotorGroup::open(bus, cfg.family, &cfg.ids.left)?;
        tracing::debug!(leader = %cfg.ids.left.leader, "left side configured");
        let right = motor::MotorGroup::open(bus, cfg.family, &cfg.ids.right)?;
        tracing::debug!(leader = %cfg.ids.right.leader, "right side configured");

        let drive = DifferentialDrive::new(left, right, &cfg.drive)?;
        tracing::info!(
            right_inverted = cfg.drive.right_side_inverted,
            "drive ready"
        );

        Ok(Self {
            drive,
            family: cfg.family,
            autonomous: cfg.autonomous,
        })
    }

    /// Execute a `DriveCommand` against the drive.
    pub fn execute(
        &mut self,
        command: DriveCommand,
    ) -> Result<DriveOutput, DriveError> {
        match command {
            DriveCommand::Arcade { forward, rotate } => self.drive.arcade_drive(forward, rotate),
            DriveCommand::Stop => self.drive.stop(),
        }
    }

    /// Autonomous periodic step, `elapsed` since autonomous started.
    pub fn on_autonomous_tick(
        &mut self,
        elapsed: Duration,
    ) -> Result<DriveOutput, DriveError> {
        let command = self.autonomous.command_at(elapsed);
        self.execute(command)
    }

    /// Teleop periodic step: operator axes straight through to the drive.
    pub fn on_teleop_tick(
        &mut self,
        forward: f32,
        rotate: f32,
    ) -> Result<DriveOutput, DriveError> {
        self.execute(DriveCommand::Arcade { forward, rotate })
    }

    pub fn on_disabled(&mut self) -> Result<DriveOutput, DriveError> {
        self.execute(DriveCommand::Stop)
    }

    pub fn drive(&self) -> &DifferentialDrive<M> {
        &self.drive
    }

    pub fn family(&self) -> MotorFamily {
        self.family
    }

    pub fn autonomous(&self) -> &AutonomousConfig {
        &self.autonomous
    }
}
