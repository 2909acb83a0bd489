//! Differential drive built from a left and a right [`MotorGroup`].

use core::fmt;

use crate::utils::{
    config::DriveTuning,
    controllers::motor::{HardwareError, MotorController, MotorGroup},
    math::arcade::{ArcadeMapping, DriveOutput},
};

/// Drivetrain side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Errors from commanding the drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveError {
    /// One side stopped answering; the drive is down until restart.
    SideFaulted { side: Side, source: HardwareError },
}

impl fmt::Display for DriveError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            DriveError::SideFaulted { side, source } => {
                write!(f, "{} side faulted: {}", side, source)
            }
        }
    }
}

/// Two motor groups driven with the arcade convention.
///
/// The right side's sign convention is fixed at construction; there is no way
/// to flip it afterwards. A hardware fault on either side stops the other one
/// and disables the drive for good.
pub struct DifferentialDrive<M> {
    left: MotorGroup<M>,
    right: MotorGroup<M>,
    mapping: ArcadeMapping,
    fault: Option<DriveError>,
}

impl<M: MotorController> DifferentialDrive<M> {
    pub fn new(
        left: MotorGroup<M>,
        mut right: MotorGroup<M>,
        tuning: &DriveTuning,
    ) -> Result<Self, HardwareError> {
        if tuning.right_side_inverted {
            right.invert()?;
        }
        Ok(Self {
            left,
            right,
            mapping: tuning.mapping(),
            fault: None,
        })
    }

    /// Drive with `forward` speed and `rotate` turn rate, both in `[-1, 1]`.
    ///
    /// Returns the side demands that were sent.
    pub fn arcade_drive(
        &mut self,
        forward: f32,
        rotate: f32,
    ) -> Result<DriveOutput, DriveError> {
        let out = self.mapping.compute(forward, rotate);
        self.tank(out)
    }

    /// Stop both sides.
    pub fn stop(&mut self) -> Result<DriveOutput, DriveError> {
        self.check()?;
        if let Err(e) = self.left.stop() {
            return Err(self.trip(Side::Left, e));
        }
        if let Err(e) = self.right.stop() {
            return Err(self.trip(Side::Right, e));
        }
        Ok(DriveOutput::STOPPED)
    }

    fn tank(
        &mut self,
        out: DriveOutput,
    ) -> Result<DriveOutput, DriveError> {
        self.check()?;
        if let Err(e) = self.left.set(out.left) {
            return Err(self.trip(Side::Left, e));
        }
        if let Err(e) = self.right.set(out.right) {
            return Err(self.trip(Side::Right, e));
        }
        Ok(out)
    }

    pub fn left(&self) -> &MotorGroup<M> {
        &self.left
    }

    pub fn right(&self) -> &MotorGroup<M> {
        &self.right
    }

    pub fn mapping(&self) -> &ArcadeMapping {
        &self.mapping
    }

    pub fn fault(&self) -> Option<DriveError> {
        self.fault
    }

    fn check(&self) -> Result<(), DriveError> {
        match self.fault {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Latch the drive down after `side` failed and stop whatever still answers.
    fn trip(
        &mut self,
        side: Side,
        source: HardwareError,
    ) -> DriveError {
        let healthy = match side {
            Side::Left => &mut self.right,
            Side::Right => &mut self.left,
        };
        if let Err(e) = healthy.stop() {
            tracing::error!("failed to stop healthy side after fault: {}", e);
        }
        let err = DriveError::SideFaulted { side, source };
        tracing::error!(%side, "drive disabled: {}", err);
        self.fault = Some(err);
        err
    }
}
