mod sim;

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use ddb_core::utils::{
    config::MotorSelection,
    controllers::{CanId, DriveController, MotorController},
    Duration, Instant, MatchRobot, Mode, ModeDispatcher, RobotConfig,
};
use sim::{HeldStick, SimBus};
use tracing::{error, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Family {
    Neo,
    Falcon,
    /// Select both families (init must refuse this)
    Both,
    /// Select neither family (init must refuse this)
    Neither,
}

impl Family {
    fn selection(self) -> MotorSelection {
        let (spark_max_neo, talon_fx_falcon) = match self {
            Family::Neo => (true, false),
            Family::Falcon => (false, true),
            Family::Both => (true, true),
            Family::Neither => (false, false),
        };
        MotorSelection {
            spark_max_neo,
            talon_fx_falcon,
        }
    }
}

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// JSON robot configuration; built-in defaults when omitted
    #[clap(long)]
    config: Option<PathBuf>,
    /// override the motor family selection from the configuration
    #[clap(long, value_enum)]
    family: Option<Family>,
    /// scheduler period in milliseconds
    #[clap(long, default_value_t = 20)]
    period_ms: u64,
    #[clap(long, default_value_t = 1.0)]
    disabled_secs: f64,
    #[clap(long, default_value_t = 15.0)]
    auto_secs: f64,
    #[clap(long, default_value_t = 5.0)]
    teleop_secs: f64,
    /// joystick Y axis held during teleop
    #[clap(long, default_value_t = 0.6, allow_hyphen_values = true)]
    forward: f32,
    /// joystick X axis held during teleop
    #[clap(long, default_value_t = 0.25, allow_hyphen_values = true)]
    rotate: f32,
    /// controller IDs that never answer on the bus
    #[clap(long, value_delimiter = ',')]
    offline: Vec<u8>,
    /// controller ID to drop off the bus mid-match
    #[clap(long, requires = "disconnect_at")]
    disconnect: Option<u8>,
    /// tick at which `--disconnect` takes effect
    #[clap(long)]
    disconnect_at: Option<u64>,
    /// sleep between ticks instead of running on a virtual clock
    #[clap(long)]
    realtime: bool,
    /// log side outputs every N ticks
    #[clap(long, default_value_t = 25)]
    log_every: u64,
}

fn load_config(opts: &Opts) -> Result<RobotConfig, String> {
    let mut config = match &opts.config {
        Some(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            RobotConfig::from_json_slice(&bytes).map_err(|e| e.to_string())?
        }
        None => RobotConfig::default(),
    };
    if let Some(family) = opts.family {
        config.motors = family.selection();
    }
    Ok(config)
}

/// Scheduled mode for each tick of the match.
fn schedule(
    opts: &Opts,
    period: Duration,
) -> Vec<(Mode, u64)> {
    let ticks = |secs: f64| ((secs * 1_000_000.0) / period.as_micros() as f64).ceil() as u64;
    vec![
        (Mode::Disabled, ticks(opts.disabled_secs).max(1)),
        (Mode::Autonomous, ticks(opts.auto_secs)),
        (Mode::Teleop, ticks(opts.teleop_secs)),
        (Mode::Disabled, 1),
    ]
}

/// Block until `deadline` on the embassy clock and return the time reached.
fn wait_until(deadline: Instant) -> Instant {
    embassy_time::block_for(deadline.saturating_duration_since(Instant::now()));
    Instant::now()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let opts: Opts = Opts::parse();
    let config = match load_config(&opts) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(1);
        }
    };

    let mut bus = SimBus::new(opts.offline.iter().copied());
    let controller = match DriveController::init(&config, &mut bus) {
        Ok(c) => c,
        Err(e) => {
            error!("robot init failed: {}", e);
            return ExitCode::from(1);
        }
    };
    let ids = [
        controller.drive().left().leader().id(),
        controller.drive().right().leader().id(),
    ];
    let follower_ids: Vec<CanId> = controller
        .drive()
        .left()
        .followers()
        .iter()
        .chain(controller.drive().right().followers())
        .map(|m| m.id())
        .collect();

    let mut robot = MatchRobot::new(controller, HeldStick::new(opts.forward, opts.rotate));
    let mut dispatcher = ModeDispatcher::new();
    let period = Duration::from_millis(opts.period_ms.max(1));

    let origin = Instant::now();
    let mut tick: u64 = 0;
    for (mode, count) in schedule(&opts, period) {
        for _ in 0..count {
            if opts.disconnect_at == Some(tick) {
                if let Some(id) = opts.disconnect {
                    bus.disconnect(CanId(id));
                }
            }

            let now = if opts.realtime {
                wait_until(origin + period * tick as u32)
            } else {
                Instant::from_ticks(0) + period * tick as u32
            };

            if let Err(e) = dispatcher.tick(mode, now, &mut robot) {
                error!(tick, %mode, "match aborted: {}", e);
                return ExitCode::from(2);
            }

            if tick % opts.log_every.max(1) == 0 {
                let out = robot.last_output();
                info!(
                    tick,
                    %mode,
                    left = out.left,
                    right = out.right,
                    left_applied = bus.applied(ids[0]),
                    right_applied = bus.applied(ids[1]),
                    "drive"
                );
                for id in follower_ids.iter() {
                    tracing::debug!(%id, applied = bus.applied(*id), "follower");
                }
            }
            tick += 1;
        }
    }

    info!(ticks = tick, "match complete");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_until_reaches_deadline() {
        let deadline = Instant::now() + Duration::from_millis(5);
        assert!(wait_until(deadline) >= deadline);

        // a deadline already behind us returns at once
        let past = Instant::now();
        assert!(wait_until(past) >= past);
    }
}
