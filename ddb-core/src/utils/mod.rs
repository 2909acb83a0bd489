//! Utility re-exports for the differential-drive bot.
//!
//! - `config`: robot configuration model and validation
//! - `controllers`: motor groups, the differential drive and the drive controller
//! - `lifecycle`: scheduler-facing hooks, mode dispatch and the match program
//! - `math`: arcade-drive mapping

pub mod config;
pub mod controllers;
pub mod lifecycle;
pub mod math;

pub use config::RobotConfig;
pub use controllers::DriveController;
pub use embassy_time::{Duration, Instant};
pub use lifecycle::{MatchRobot, Mode, ModeDispatcher, OperatorInput, RobotProgram};
pub use math::arcade::{ArcadeMapping, DriveOutput};
