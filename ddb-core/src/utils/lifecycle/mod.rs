//! Robot lifecycle: the interface an external scheduler drives.
//!
//! The scheduler owns timing and mode selection. Every tick it reports the
//! current [`Mode`] to a [`ModeDispatcher`], which calls the matching `*_init`
//! hook once on mode entry and the periodic hook on every tick.
//!
//! [`MatchRobot`] is the robot program itself: the drive controller, the
//! autonomous timer and the operator's joystick.

pub mod timer;

use core::fmt;

use embassy_time::Instant;

use crate::utils::{
    controllers::{DriveController, DriveError, MotorController},
    math::arcade::DriveOutput,
};

pub use timer::AutonomousTimer;

/// Robot operating mode, as selected by the field or driver station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl fmt::Display for Mode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Mode::Disabled => "disabled",
            Mode::Autonomous => "autonomous",
            Mode::Teleop => "teleop",
            Mode::Test => "test",
        };
        f.write_str(s)
    }
}

/// Hooks a scheduler calls on a robot program.
///
/// Hooks must not block; they run once per tick on the scheduler's thread.
pub trait RobotProgram {
    type Error;

    fn on_disabled_init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_disabled_periodic(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_autonomous_init(
        &mut self,
        now: Instant,
    ) -> Result<(), Self::Error>;

    fn on_autonomous_periodic(
        &mut self,
        now: Instant,
    ) -> Result<(), Self::Error>;

    fn on_teleop_init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_teleop_periodic(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_test_init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_test_periodic(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Turns a stream of per-tick mode samples into lifecycle calls.
#[derive(Debug, Default)]
pub struct ModeDispatcher {
    current: Option<Mode>,
}

impl ModeDispatcher {
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Mode of the last tick, if any.
    pub fn mode(&self) -> Option<Mode> {
        self.current
    }

    /// Run one scheduler tick in `mode` at `now`.
    ///
    /// On the first tick of a mode the init hook runs before the periodic one.
    /// If the init hook fails the mode is not considered entered, so the next
    /// tick retries it.
    pub fn tick<P>(
        &mut self,
        mode: Mode,
        now: Instant,
        program: &mut P,
    ) -> Result<(), P::Error>
    where
        P: RobotProgram,
    {
        if self.current != Some(mode) {
            tracing::info!(from = ?self.current, to = %mode, "mode change");
            match mode {
                Mode::Disabled => program.on_disabled_init()?,
                Mode::Autonomous => program.on_autonomous_init(now)?,
                Mode::Teleop => program.on_teleop_init()?,
                Mode::Test => program.on_test_init()?,
            }
            self.current = Some(mode);
        }

        match mode {
            Mode::Disabled => program.on_disabled_periodic(),
            Mode::Autonomous => program.on_autonomous_periodic(now),
            Mode::Teleop => program.on_teleop_periodic(),
            Mode::Test => program.on_test_periodic(),
        }
    }
}

/// Two-axis operator input, each axis in `[-1, 1]`.
pub trait OperatorInput {
    fn axis_y(&self) -> f32;
    fn axis_x(&self) -> f32;
}

/// The robot program: timed straight drive in autonomous, arcade in teleop.
pub struct MatchRobot<M, J> {
    controller: DriveController<M>,
    timer: AutonomousTimer,
    stick: J,
    last_output: DriveOutput,
}

impl<M, J> MatchRobot<M, J>
where
    M: MotorController,
    J: OperatorInput,
{
    pub fn new(
        controller: DriveController<M>,
        stick: J,
    ) -> Self {
        Self {
            controller,
            timer: AutonomousTimer::new(),
            stick,
            last_output: DriveOutput::STOPPED,
        }
    }

    pub fn controller(&self) -> &DriveController<M> {
        &self.controller
    }

    pub fn timer(&self) -> &AutonomousTimer {
        &self.timer
    }

    pub fn stick(&self) -> &J {
        &self.stick
    }

    pub fn stick_mut(&mut self) -> &mut J {
        &mut self.stick
    }

    /// Side demands sent on the most recent drive tick.
    pub fn last_output(&self) -> DriveOutput {
        self.last_output
    }

    fn record(
        &mut self,
        result: Result<DriveOutput, DriveError>,
    ) -> Result<(), DriveError> {
        self.last_output = result?;
        Ok(())
    }
}

impl<M, J> RobotProgram for MatchRobot<M, J>
where
    M: MotorController,
    J: OperatorInput,
{
    type Error = DriveError;

    fn on_disabled_init(&mut self) -> Result<(), DriveError> {
        let result = self.controller.on_disabled();
        self.record(result)
    }

    fn on_autonomous_init(
        &mut self,
        now: Instant,
    ) -> Result<(), DriveError> {
        self.timer.reset(now);
        Ok(())
    }

    fn on_autonomous_periodic(
        &mut self,
        now: Instant,
    ) -> Result<(), DriveError> {
        let elapsed = self.timer.elapsed(now);
        let result = self.controller.on_autonomous_tick(elapsed);
        self.record(result)
    }

    fn on_teleop_periodic(&mut self) -> Result<(), DriveError> {
        let (y, x) = (self.stick.axis_y(), self.stick.axis_x());
        let result = self.controller.on_teleop_tick(y, x);
        self.record(result)
    }
}
