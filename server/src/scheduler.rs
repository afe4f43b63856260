//! Fixed-rate tick pacing.
//!
//! Deadlines sit on a fixed grid (`start + n * tick_duration`) rather than
//! being measured from the end of the previous tick, so a slow tick is made
//! up by running the following ones back-to-back. If the loop falls more
//! than `max_catch_up_ticks` behind, the grid is re-anchored to now and the
//! missed ticks are dropped.

use log::warn;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_CATCH_UP_TICKS: u32 = 5;

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    pub min_tick_us: u64,
    pub max_tick_us: u64,
    /// Rolling average, weighted 15/16 towards history.
    pub avg_tick_us: u64,
    /// Ticks that took longer than their budget.
    pub late_ticks: u64,
    pub total_ticks: u64,
    /// Times the deadline grid was re-anchored after an overload.
    pub overloads: u64,
}

impl Default for TickStats {
    fn default() -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: 0,
            late_ticks: 0,
            total_ticks: 0,
            overloads: 0,
        }
    }
}

impl TickStats {
    fn record(&mut self, duration: Duration, budget: Duration) {
        let duration_us = duration.as_micros() as u64;
        self.min_tick_us = self.min_tick_us.min(duration_us);
        self.max_tick_us = self.max_tick_us.max(duration_us);
        self.avg_tick_us = if self.total_ticks == 0 {
            duration_us
        } else {
            (self.avg_tick_us * 15 + duration_us) / 16
        };
        self.total_ticks += 1;
        if duration > budget {
            self.late_ticks += 1;
        }
    }
}

pub struct TickScheduler {
    tick_duration: Duration,
    next_tick_at: Instant,
    warp: bool,
    max_catch_up_ticks: u32,
    stats: TickStats,
}

impl TickScheduler {
    pub fn new(tick_duration: Duration, warp: bool) -> Self {
        Self::starting_at(Instant::now(), tick_duration, warp)
    }

    /// Scheduler whose first tick is due at `start`.
    pub fn starting_at(start: Instant, tick_duration: Duration, warp: bool) -> Self {
        Self {
            tick_duration,
            next_tick_at: start,
            warp,
            max_catch_up_ticks: DEFAULT_MAX_CATCH_UP_TICKS,
            stats: TickStats::default(),
        }
    }

    pub fn with_max_catch_up(mut self, ticks: u32) -> Self {
        self.max_catch_up_ticks = ticks;
        self
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn is_warp(&self) -> bool {
        self.warp
    }

    /// When the next tick should start. In warp mode ticks are always due.
    pub fn next_deadline(&self, now: Instant) -> Instant {
        if self.warp {
            now
        } else {
            self.next_tick_at
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.warp || now >= self.next_tick_at
    }

    /// Records a finished tick that took `duration` and moves the deadline
    /// one step along the grid.
    pub fn complete_tick(&mut self, now: Instant, duration: Duration) {
        self.stats.record(duration, self.tick_duration);
        if self.warp {
            self.next_tick_at = now;
            return;
        }

        self.next_tick_at += self.tick_duration;
        let behind = now.saturating_duration_since(self.next_tick_at);
        let window = self.tick_duration * self.max_catch_up_ticks;
        if behind > window {
            let dropped = behind.as_nanos() / self.tick_duration.as_nanos().max(1);
            warn!(
                "Tick loop is {:?} behind, dropping {} ticks",
                behind, dropped
            );
            self.next_tick_at = now;
            self.stats.overloads += 1;
        }
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TickStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(50);

    #[test]
    fn test_deadlines_follow_fixed_grid() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::starting_at(start, TICK, false);
        assert!(scheduler.is_due(start));

        scheduler.complete_tick(start + Duration::from_millis(5), Duration::from_millis(5));
        assert_eq!(scheduler.next_deadline(start), start + TICK);
        assert!(!scheduler.is_due(start + Duration::from_millis(20)));

        scheduler.complete_tick(start + TICK + Duration::from_millis(30), Duration::from_millis(30));
        assert_eq!(scheduler.next_deadline(start), start + TICK * 2);
    }

    #[test]
    fn test_slow_tick_is_caught_up() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::starting_at(start, TICK, false);
        let finished = start + Duration::from_millis(120);
        scheduler.complete_tick(finished, Duration::from_millis(120));

        // Next deadline stays on the grid, already in the past.
        assert_eq!(scheduler.next_deadline(finished), start + TICK);
        assert!(scheduler.is_due(finished));
        assert_eq!(scheduler.stats().late_ticks, 1);
        assert_eq!(scheduler.stats().overloads, 0);
    }

    #[test]
    fn test_overload_reanchors_grid() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::starting_at(start, TICK, false).with_max_catch_up(2);
        let finished = start + Duration::from_secs(1);
        scheduler.complete_tick(finished, Duration::from_secs(1));

        assert_eq!(scheduler.next_deadline(finished), finished);
        assert_eq!(scheduler.stats().overloads, 1);
    }

    #[test]
    fn test_warp_is_always_due() {
        let start = Instant::now();
        let mut scheduler = TickScheduler::starting_at(start + Duration::from_secs(10), TICK, true);
        assert!(scheduler.is_due(start));
        assert_eq!(scheduler.next_deadline(start), start);
        scheduler.complete_tick(start, Duration::from_micros(10));
        assert!(scheduler.is_due(start));
    }

    #[test]
    fn test_stats_track_extremes() {
        let mut scheduler = TickScheduler::starting_at(Instant::now(), TICK, true);
        let now = Instant::now();
        scheduler.complete_tick(now, Duration::from_micros(300));
        scheduler.complete_tick(now, Duration::from_micros(100));
        scheduler.complete_tick(now, Duration::from_millis(60));

        let stats = scheduler.stats();
        assert_eq!(stats.min_tick_us, 100);
        assert_eq!(stats.max_tick_us, 60_000);
        assert_eq!(stats.total_ticks, 3);
        assert_eq!(stats.late_ticks, 1);

        scheduler.reset_stats();
        assert_eq!(scheduler.stats().total_ticks, 0);
    }
}
