//! Match-period timer.

use embassy_time::{Duration, Instant};

/// Time since the start of the current autonomous period.
///
/// The timer never runs on its own; callers pass `now` in, which keeps it
/// usable with both a real clock and a simulated one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutonomousTimer {
    started: Option<Instant>,
}

impl AutonomousTimer {
    pub const fn new() -> Self {
        Self { started: None }
    }

    /// Restart the period at `now`.
    pub fn reset(
        &mut self,
        now: Instant,
    ) {
        self.started = Some(now);
    }

    /// Elapsed time at `now`. Never goes backwards within a period.
    ///
    /// A timer that was never reset reports `Duration::MAX`, which reads as
    /// "period over".
    pub fn elapsed(
        &self,
        now: Instant,
    ) -> Duration {
        match self.started {
            Some(start) => now.saturating_duration_since(start),
            None => Duration::MAX,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstarted_timer_reads_expired() {
        let t = AutonomousTimer::new();
        assert!(!t.is_running());
        assert_eq!(t.elapsed(Instant::from_millis(5)), Duration::MAX);
    }

    #[test]
    fn test_elapsed_since_reset() {
        let mut t = AutonomousTimer::new();
        t.reset(Instant::from_millis(1_000));
        assert_eq!(t.elapsed(Instant::from_millis(1_250)), Duration::from_millis(250));

        t.reset(Instant::from_millis(5_000));
        assert_eq!(t.elapsed(Instant::from_millis(5_000)), Duration::from_ticks(0));
    }

    #[test]
    fn test_clock_before_start_saturates() {
        let mut t = AutonomousTimer::new();
        t.reset(Instant::from_millis(100));
        assert_eq!(t.elapsed(Instant::from_millis(50)), Duration::from_ticks(0));
    }
}
