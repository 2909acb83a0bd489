//! Motor-controller handles and per-side motor groups.
//!
//! Controllers are external CAN devices addressed by [`CanId`]. This module
//! describes what the drive needs from them ([`MotorController`]), how to get a
//! handle for one ([`MotorBus`]), and how three of them on one side of the
//! drivetrain are tied together into a leader/follower [`MotorGroup`].

use core::fmt;

use heapless::Vec;
use serde::Deserialize;

/// Maximum number of followers a single side may carry.
pub const MAX_FOLLOWERS: usize = 4;

/// Largest addressable device ID; 63 is reserved for broadcast.
pub const MAX_CAN_ID: u8 = 62;

/// Bus address of a single motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct CanId(pub u8);

impl fmt::Display for CanId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors reported by the hardware layer for a specific controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// The controller did not answer on the bus.
    Unavailable { id: CanId },
    /// The controller answered but refused the request.
    Rejected { id: CanId },
    /// A previous command to this side failed; no further commands are sent.
    Faulted { id: CanId },
}

impl HardwareError {
    /// ID of the controller the error originated from.
    pub fn id(&self) -> CanId {
        match *self {
            HardwareError::Unavailable { id }
            | HardwareError::Rejected { id }
            | HardwareError::Faulted { id } => id,
        }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            HardwareError::Unavailable { id } => write!(f, "motor controller {} not responding", id),
            HardwareError::Rejected { id } => write!(f, "motor controller {} rejected command", id),
            HardwareError::Faulted { id } => {
                write!(f, "side latched faulted after controller {} failed", id)
            }
        }
    }
}

/// The two supported drivetrain motor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorFamily {
    /// Spark MAX controllers driving NEO brushless motors.
    SparkMaxNeo,
    /// Talon FX controllers integrated in Falcon 500 motors.
    TalonFxFalcon,
}

impl MotorFamily {
    pub fn name(self) -> &'static str {
        match self {
            MotorFamily::SparkMaxNeo => "spark_max_neo",
            MotorFamily::TalonFxFalcon => "talon_fx_falcon",
        }
    }

    /// Factory ID table for this family as wired on the robot.
    pub fn default_ids(self) -> DriveIds {
        match self {
            MotorFamily::SparkMaxNeo => DriveIds {
                left: SideIds::new(4, [5, 6]),
                right: SideIds::new(7, [8, 9]),
            },
            MotorFamily::TalonFxFalcon => DriveIds {
                left: SideIds::new(20, [21, 22]),
                right: SideIds::new(23, [24, 25]),
            },
        }
    }
}

impl fmt::Display for MotorFamily {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Controller IDs for one drivetrain side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SideIds {
    pub leader: CanId,
    #[serde(default)]
    pub followers: Vec<CanId, MAX_FOLLOWERS>,
}

impl SideIds {
    /// Build a fixed table entry. More than `MAX_FOLLOWERS` followers does not
    /// compile; runtime tables go through the JSON configuration instead.
    pub(crate) fn new<const N: usize>(
        leader: u8,
        followers: [u8; N],
    ) -> Self {
        const { assert!(N <= MAX_FOLLOWERS) };
        Self {
            leader: CanId(leader),
            followers: followers.into_iter().map(CanId).collect(),
        }
    }

    /// Leader first, then followers in wiring order.
    pub fn iter(&self) -> impl Iterator<Item = CanId> + '_ {
        core::iter::once(self.leader).chain(self.followers.iter().copied())
    }
}

/// Controller IDs for both sides of the drivetrain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveIds {
    pub left: SideIds,
    pub right: SideIds,
}

impl DriveIds {
    pub fn iter(&self) -> impl Iterator<Item = CanId> + '_ {
        self.left.iter().chain(self.right.iter())
    }
}

/// A single motor controller handle.
///
/// Values passed to [`set_output`](MotorController::set_output) are duty
/// fractions in `[-1, 1]`. Followers mirror their leader's applied output in
/// firmware, inversion included.
pub trait MotorController {
    fn id(&self) -> CanId;

    fn set_output(
        &mut self,
        value: f32,
    ) -> Result<(), HardwareError>;

    fn set_inverted(
        &mut self,
        inverted: bool,
    ) -> Result<(), HardwareError>;

    /// Mirror `leader`'s output from now on.
    fn follow(
        &mut self,
        leader: &Self,
    ) -> Result<(), HardwareError>;

    fn restore_factory_defaults(&mut self) -> Result<(), HardwareError>;

    /// Read the controller's status without commanding it. Errors if it no
    /// longer answers or reports a sticky fault.
    fn check_health(&self) -> Result<(), HardwareError>;

    fn stop_motor(&mut self) -> Result<(), HardwareError> {
        self.set_output(0.0)
    }
}

/// Source of motor controller handles, one per bus ID.
pub trait MotorBus {
    type Motor: MotorController;

    fn open(
        &mut self,
        family: MotorFamily,
        id: CanId,
    ) -> Result<Self::Motor, HardwareError>;
}

/// One leader and its followers, all on the same drivetrain side.
///
/// Only the leader is ever commanded; followers are polled for health on every
/// command. Once any command or poll fails the group is latched faulted and
/// refuses to talk to the hardware again.
pub struct MotorGroup<M> {
    leader: M,
    followers: Vec<M, MAX_FOLLOWERS>,
    inverted: bool,
    output: f32,
    fault: Option<HardwareError>,
}

impl<M: MotorController> MotorGroup<M> {
    /// Open every controller in `ids`, restore factory defaults and attach the
    /// followers to the leader.
    pub fn open<B>(
        bus: &mut B,
        family: MotorFamily,
        ids: &SideIds,
    ) -> Result<Self, HardwareError>
    where
        B: MotorBus<Motor = M>,
    {
        let mut leader = bus.open(family, ids.leader)?;
        leader.restore_factory_defaults()?;

        // same capacity as SideIds::followers, so collecting cannot overflow
        let followers = ids
            .followers
            .iter()
            .map(|&id| -> Result<M, HardwareError> {
                let mut follower = bus.open(family, id)?;
                follower.restore_factory_defaults()?;
                follower.follow(&leader)?;
                tracing::debug!(%id, leader = %ids.leader, "follower attached");
                Ok(follower)
            })
            .collect::<Result<Vec<M, MAX_FOLLOWERS>, HardwareError>>()?;

        Ok(Self {
            leader,
            followers,
            inverted: false,
            output: 0.0,
            fault: None,
        })
    }

    /// Flip the sign convention of the whole side.
    pub(crate) fn invert(&mut self) -> Result<(), HardwareError> {
        let result = self.leader.set_inverted(true);
        self.latch(result)?;
        self.inverted = true;
        Ok(())
    }

    /// Command the side to `value` in `[-1, 1]`.
    pub fn set(
        &mut self,
        value: f32,
    ) -> Result<(), HardwareError> {
        self.check()?;
        self.poll_followers()?;
        let result = self.leader.set_output(value);
        self.latch(result)?;
        self.output = value;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), HardwareError> {
        self.check()?;
        self.poll_followers()?;
        let result = self.leader.stop_motor();
        self.latch(result)?;
        self.output = 0.0;
        Ok(())
    }

    pub fn leader(&self) -> &M {
        &self.leader
    }

    pub fn followers(&self) -> &[M] {
        &self.followers
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Last demand successfully sent to the leader.
    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn fault(&self) -> Option<HardwareError> {
        self.fault
    }

    fn check(&self) -> Result<(), HardwareError> {
        match self.fault {
            Some(e) => Err(HardwareError::Faulted { id: e.id() }),
            None => Ok(()),
        }
    }

    /// Latch on the first follower that fails its health read. The leader is
    /// still told to stop so the remaining motors on the side go quiet.
    fn poll_followers(&mut self) -> Result<(), HardwareError> {
        let result = self.followers.iter().try_for_each(M::check_health);
        if result.is_err() {
            if let Err(e) = self.leader.stop_motor() {
                tracing::warn!(id = %e.id(), "leader did not stop after follower loss: {}", e);
            }
        }
        self.latch(result)
    }

    fn latch(
        &mut self,
        result: Result<(), HardwareError>,
    ) -> Result<(), HardwareError> {
        if let Err(e) = result {
            tracing::error!(id = %e.id(), "motor command failed, latching side: {}", e);
            self.fault = Some(e);
            self.output = 0.0;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_keep_every_follower() {
        for family in [MotorFamily::SparkMaxNeo, MotorFamily::TalonFxFalcon] {
            let ids = family.default_ids();
            assert_eq!(ids.left.followers.len(), 2);
            assert_eq!(ids.right.followers.len(), 2);
            assert_eq!(ids.iter().count(), 6);
        }
        let neo = MotorFamily::SparkMaxNeo.default_ids();
        assert_eq!(neo.right.followers.as_slice(), &[CanId(8), CanId(9)]);
    }
}
