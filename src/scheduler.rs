// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Timing bookkeeping and derived per-tick status.
//!
//! Nothing in here waits. Every timer compares a stored [`Instant`] against
//! the tick's `now`, so the control loop keeps re-checking border safety
//! while maneuvers run.
//!
//! - [`PollTimer`] paces range measurements and periodic reports
//! - [`DeadlockMonitor`] detects a push that makes no progress
//! - [`EnemyEstimate`] reduces a snapshot to presence and direction

use core::fmt;

use embassy_time::{Duration, Instant};

use crate::command::Side;
use crate::sensors::{Centimeters, SensorSnapshot};

/// Time elapsed from `since` to `now`, zero if the clock reads earlier.
pub fn elapsed(since: Instant, now: Instant) -> Duration {
    Duration::from_ticks(now.as_ticks().saturating_sub(since.as_ticks()))
}

/// Fires at most once per interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimer {
    interval: Duration,
    due_at: Instant,
}

impl PollTimer {
    /// A timer that first falls due at `first_due`.
    ///
    /// # Arguments
    ///
    /// * `interval` - Minimum time between two firings
    /// * `first_due` - Earliest instant of the first firing; pass the current
    ///   time for a timer that fires on its first poll
    pub fn new(interval: Duration, first_due: Instant) -> Self {
        Self {
            interval,
            due_at: first_due,
        }
    }

    /// Returns `true` and restarts the interval from `now` when due.
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = self.is_due(now);
        if due {
            self.due_at = now + self.interval;
        }
        due
    }

    /// Whether the next [`PollTimer::poll`] at `now` would fire.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due_at
    }

    /// Next instant the timer fires at.
    pub fn due_at(&self) -> Instant {
        self.due_at
    }
}

/// Tracks frontal distance progress during a push.
///
/// At most once per window the current distance is compared with the one
/// stored at the start of the window. A change smaller than the tolerance
/// means the robots are locked; otherwise the window restarts from the new
/// distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeadlockMonitor {
    /// Start of the current measurement window
    pub mark: Instant,
    /// Frontal distance at `mark`
    pub last_distance: Option<Centimeters>,
}

impl DeadlockMonitor {
    pub fn new(now: Instant, distance: Option<Centimeters>) -> Self {
        Self {
            mark: now,
            last_distance: distance,
        }
    }

    /// Restarts the window, as on entering a push.
    pub fn reset(&mut self, now: Instant, distance: Option<Centimeters>) {
        *self = Self::new(now, distance);
    }

    /// Returns `true` when a full window has passed with less than
    /// `tolerance` change in distance.
    pub fn observe(
        &mut self,
        now: Instant,
        distance: Option<Centimeters>,
        window: Duration,
        tolerance: Centimeters,
    ) -> bool {
        if elapsed(self.mark, now) < window {
            return false;
        }
        let stalled = match (self.last_distance, distance) {
            (Some(before), Some(current)) => before.abs_diff(current) < tolerance,
            _ => false,
        };
        if !stalled {
            self.reset(now, distance);
        }
        stalled
    }
}

/// Where the opponent is, relative to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Front,
    Left,
    Right,
}

impl Direction {
    /// Flank of a lateral direction.
    pub fn side(self) -> Option<Side> {
        match self {
            Direction::Front => None,
            Direction::Left => Some(Side::Left),
            Direction::Right => Some(Side::Right),
        }
    }
}

/// Opponent presence derived from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnemyEstimate {
    pub present: bool,
    /// `Front` when nothing is present
    pub direction: Direction,
    /// Reading that placed the opponent
    pub distance: Option<Centimeters>,
}

impl EnemyEstimate {
    pub const NONE: EnemyEstimate = EnemyEstimate {
        present: false,
        direction: Direction::Front,
        distance: None,
    };

    /// Places the opponent from readings at or within `radius`.
    ///
    /// A frontal reading wins. Otherwise the nearer flank wins; an exact tie
    /// goes to the left.
    pub fn from_snapshot(snapshot: &SensorSnapshot, radius: Centimeters) -> Self {
        let within = |reading: Option<Centimeters>| reading.filter(|&cm| cm <= radius);

        if let Some(cm) = within(snapshot.front) {
            return Self::seen(Direction::Front, cm);
        }
        match (within(snapshot.left), within(snapshot.right)) {
            (Some(left), Some(right)) if right < left => Self::seen(Direction::Right, right),
            (Some(left), _) => Self::seen(Direction::Left, left),
            (None, Some(right)) => Self::seen(Direction::Right, right),
            (None, None) => Self::NONE,
        }
    }

    fn seen(direction: Direction, distance: Centimeters) -> Self {
        Self {
            present: true,
            direction,
            distance: Some(distance),
        }
    }

    /// Flank the opponent is on, when it is seen from the side.
    pub fn flank(&self) -> Option<Side> {
        if self.present { self.direction.side() } else { None }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Front => "front",
            Direction::Left => "left",
            Direction::Right => "right",
        })
    }
}

impl fmt::Display for EnemyEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.present, self.distance) {
            (true, Some(cm)) => write!(f, "enemy {} at {} cm", self.direction, cm),
            _ => f.write_str("no enemy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn snapshot(front: Option<u16>, left: Option<u16>, right: Option<u16>) -> SensorSnapshot {
        SensorSnapshot {
            front,
            left,
            right,
            ..SensorSnapshot::default()
        }
    }

    #[test]
    fn poll_timer_fires_immediately_then_per_interval() {
        let mut timer = PollTimer::new(Duration::from_millis(30), at(100));
        assert!(timer.poll(at(100)));
        assert!(!timer.poll(at(129)));
        assert!(timer.poll(at(130)));
        assert_eq!(timer.due_at(), at(160));
        assert!(!timer.is_due(at(159)));
    }

    #[test]
    fn poll_timer_waits_for_first_due() {
        let mut timer = PollTimer::new(Duration::from_millis(60), at(15));
        assert!(!timer.poll(at(0)));
        assert!(!timer.poll(at(10)));
        assert!(timer.poll(at(15)));
        assert_eq!(timer.due_at(), at(75));
    }

    #[test]
    fn elapsed_saturates_on_backwards_clock() {
        assert_eq!(elapsed(at(50), at(20)), Duration::from_ticks(0));
        assert_eq!(elapsed(at(20), at(50)), Duration::from_millis(30));
    }

    #[test]
    fn deadlock_needs_full_window_of_no_progress() {
        let window = Duration::from_millis(1000);
        let mut monitor = DeadlockMonitor::new(at(0), Some(20));
        assert!(!monitor.observe(at(999), Some(20), window, 2));
        assert!(monitor.observe(at(1000), Some(21), window, 2));
    }

    #[test]
    fn progress_restarts_the_window() {
        let window = Duration::from_millis(1000);
        let mut monitor = DeadlockMonitor::new(at(0), Some(25));
        assert!(!monitor.observe(at(1000), Some(15), window, 2));
        assert_eq!(monitor.mark, at(1000));
        assert_eq!(monitor.last_distance, Some(15));
        assert!(!monitor.observe(at(1500), Some(15), window, 2));
        assert!(monitor.observe(at(2000), Some(15), window, 2));
    }

    #[test]
    fn missing_distance_is_not_a_deadlock() {
        let window = Duration::from_millis(100);
        let mut monitor = DeadlockMonitor::new(at(0), None);
        assert!(!monitor.observe(at(100), Some(10), window, 2));
    }

    #[test]
    fn front_reading_wins_over_flanks() {
        let estimate = EnemyEstimate::from_snapshot(&snapshot(Some(90), Some(20), Some(30)), 120);
        assert!(estimate.present);
        assert_eq!(estimate.direction, Direction::Front);
        assert_eq!(estimate.distance, Some(90));
        assert_eq!(estimate.flank(), None);
    }

    #[test]
    fn nearer_flank_wins() {
        let estimate = EnemyEstimate::from_snapshot(&snapshot(None, Some(80), Some(30)), 120);
        assert_eq!(estimate.direction, Direction::Right);
        assert_eq!(estimate.flank(), Some(Side::Right));

        let estimate = EnemyEstimate::from_snapshot(&snapshot(Some(200), Some(30), Some(80)), 120);
        assert_eq!(estimate.direction, Direction::Left);
        assert_eq!(estimate.distance, Some(30));
    }

    #[test]
    fn flank_tie_goes_left() {
        let estimate = EnemyEstimate::from_snapshot(&snapshot(None, Some(50), Some(50)), 120);
        assert_eq!(estimate.direction, Direction::Left);
    }

    #[test]
    fn readings_beyond_radius_are_not_present() {
        let estimate = EnemyEstimate::from_snapshot(&snapshot(Some(121), Some(200), None), 120);
        assert_eq!(estimate, EnemyEstimate::NONE);
    }
}
