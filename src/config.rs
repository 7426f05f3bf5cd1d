// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Board constants and match tuning for the sumo robot.
//!
//! Everything the controller needs to know about speeds, distances and
//! timings lives in [`Config`]. The firmware uses [`Config::DEFAULT`], which
//! is assembled from the constants in this module; [`Config::validate`] is
//! run once at boot and the configuration is never changed afterwards.
//!
//! # Units
//!
//! - **Speeds**: signed drive units, `-DRIVE_RANGE..=DRIVE_RANGE`
//! - **Distances**: centimeters
//! - **Timings**: [`embassy_time::Duration`]

use embassy_time::Duration;
use thiserror::Error;

use crate::command::{Rotation, Speed};
use crate::sensors::{BORDER_SENSORS, BorderSensorId, Centimeters};

/// Full-scale drive command accepted by the drive output
pub const DRIVE_RANGE: Speed = 1000;

/// PWM top value for 16-bit resolution (maximum duty cycle)
pub const PWM_TOP: u16 = 65535;

/// Control loop period
pub const LOOP_PERIOD: Duration = Duration::from_millis(5);

/// NEC command byte that starts the match (OK key on the Pico2Go remote)
pub const START_KEY: u8 = 0x1C;

/// Motors held still after the start signal, per competition rules
pub const START_DELAY_MS: u64 = 5000;

/// Raw line-sensor value at or above which a sensor sees the boundary
pub const BORDER_THRESHOLD: u16 = 600;

/// Border sensor wired to each TLC1543 input, indexed by ADC channel.
///
/// The stock Pico2Go line-follower row is replaced by a sumo sensor ring:
/// one reflectance sensor at each front corner, one on each flank and one
/// at the rear, wired to channels 0-4 in that order.
///
/// ```text
///   ch0 FL      FR ch1
///   ch2 L        R ch3
///          Rear ch4
/// ```
pub const BORDER_CHANNELS: [BorderSensorId; BORDER_SENSORS] = [
    BorderSensorId::FrontLeft,
    BorderSensorId::FrontRight,
    BorderSensorId::Left,
    BorderSensorId::Right,
    BorderSensorId::Rear,
];

/// Drive speeds for each behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Speeds {
    /// Clamp applied to every wheel command
    pub max: Speed,
    /// In-place rotation while searching
    pub search: Speed,
    /// Outer wheel of the closing (medium band) arc and the opening charge
    pub attack: Speed,
    /// Both wheels while pushing; always full power, so equal to `max`
    pub push: Speed,
    /// Outer wheel of the wide (far band) arc, inner wheel of the closing arc
    pub arc_outer: Speed,
    /// Inner wheel of the wide arc
    pub arc_inner: Speed,
    /// Border escape reversing and rotation
    pub escape: Speed,
    /// Deadlock recovery reversing and rotation
    pub recovery: Speed,
}

/// Distance thresholds in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Distances {
    /// Shortest plausible range reading
    pub min_valid: Centimeters,
    /// Longest plausible range reading
    pub max_valid: Centimeters,
    /// At or below this the robot pushes
    pub close: Centimeters,
    /// Upper bound of the closing-arc band
    pub medium: Centimeters,
    /// Detection radius while searching, upper bound of the wide-arc band
    pub far: Centimeters,
    /// Frontal reading beyond which an engaged target counts as lost
    pub lost: Centimeters,
    /// Change in frontal distance below which a push counts as stalled
    pub deadlock_tolerance: Centimeters,
}

/// A two-phase timed maneuver: a straight move followed by a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Maneuver {
    /// Straight phase (reverse or forward, per maneuver)
    pub straight: Duration,
    /// In-place rotation following the straight phase
    pub rotate: Duration,
}

impl Maneuver {
    /// Total time from the start of the straight phase to the end of the rotation.
    pub fn total(&self) -> Duration {
        self.straight + self.rotate
    }
}

/// Phase durations, polling intervals and windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timings {
    /// Motors held still after the start signal
    pub start_delay: Duration,
    /// Opening move: `straight` is the charge, run after the `rotate` spin
    pub opening: Maneuver,
    /// Rotation toward a flank target before attacking
    pub search_turn: Duration,
    /// How long Attack tolerates a lost target
    pub attack_grace: Duration,
    /// Push time without distance progress before recovering
    pub deadlock_window: Duration,
    /// Deadlock recovery: reverse for `straight`, then turn toward the last-seen flank
    pub recovery: Maneuver,
    /// Front zone escape: reverse, then turn away from the stronger sensor
    pub front_escape: Maneuver,
    /// Side zone escape: short reverse, then a ~90° turn away from the side
    pub side_escape: Maneuver,
    /// Back zone drives forward for `straight`
    pub back_escape: Maneuver,
    /// Front range sensor measurement interval
    pub front_poll: Duration,
    /// Side range sensors measurement interval
    pub side_poll: Duration,
    /// Status report interval while engaged
    pub status_interval: Duration,
}

/// Immutable controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Drive speeds per behavior
    pub speeds: Speeds,
    /// Range thresholds
    pub distances: Distances,
    /// Phase durations and intervals
    pub timings: Timings,
    /// Raw border value at or above which a sensor sees the boundary
    pub border_threshold: u16,
    /// Direction of the opening spin
    pub opening_rotation: Rotation,
}

/// Configuration invariant violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("distance thresholds must satisfy close < medium < far")]
    ThresholdOrder,
    #[error("lost threshold must not be below close threshold")]
    LostBelowClose,
    #[error("valid range window is empty")]
    EmptyValidWindow,
    #[error("duration `{0}` must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("speed `{0}` is outside 0..=max")]
    SpeedOutOfRange(&'static str),
    #[error("maximum speed must be within 1..=DRIVE_RANGE")]
    InvalidMaxSpeed,
    #[error("arc speeds must satisfy arc_inner <= arc_outer <= attack")]
    ArcOrder,
    #[error("push speed must equal the maximum speed")]
    PushBelowMax,
}

impl Config {
    /// Compiled-in match tuning.
    pub const DEFAULT: Config = Config {
        speeds: Speeds {
            max: DRIVE_RANGE,
            search: 450,
            attack: 900,
            push: DRIVE_RANGE,
            arc_outer: 800,
            arc_inner: 500,
            escape: 800,
            recovery: 700,
        },
        distances: Distances {
            min_valid: 2,
            max_valid: 300,
            close: 30,
            medium: 60,
            far: 120,
            lost: 150,
            deadlock_tolerance: 2,
        },
        timings: Timings {
            start_delay: Duration::from_millis(START_DELAY_MS),
            opening: Maneuver {
                straight: Duration::from_millis(350),
                rotate: Duration::from_millis(120),
            },
            search_turn: Duration::from_millis(150),
            attack_grace: Duration::from_millis(300),
            deadlock_window: Duration::from_millis(1500),
            recovery: Maneuver {
                straight: Duration::from_millis(250),
                rotate: Duration::from_millis(200),
            },
            front_escape: Maneuver {
                straight: Duration::from_millis(300),
                rotate: Duration::from_millis(250),
            },
            side_escape: Maneuver {
                straight: Duration::from_millis(150),
                rotate: Duration::from_millis(220),
            },
            back_escape: Maneuver {
                straight: Duration::from_millis(300),
                rotate: Duration::from_millis(200),
            },
            front_poll: Duration::from_millis(30),
            side_poll: Duration::from_millis(60),
            status_interval: Duration::from_millis(500),
        },
        border_threshold: BORDER_THRESHOLD,
        opening_rotation: Rotation::Clockwise,
    };

    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumo_robot::config::Config;
    ///
    /// assert!(Config::DEFAULT.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.distances;
        if !(d.close < d.medium && d.medium < d.far) {
            return Err(ConfigError::ThresholdOrder);
        }
        if d.lost < d.close {
            return Err(ConfigError::LostBelowClose);
        }
        if d.min_valid >= d.max_valid {
            return Err(ConfigError::EmptyValidWindow);
        }

        let t = &self.timings;
        let durations = [
            ("start_delay", t.start_delay),
            ("opening.straight", t.opening.straight),
            ("opening.rotate", t.opening.rotate),
            ("search_turn", t.search_turn),
            ("attack_grace", t.attack_grace),
            ("deadlock_window", t.deadlock_window),
            ("recovery.straight", t.recovery.straight),
            ("recovery.rotate", t.recovery.rotate),
            ("front_escape.straight", t.front_escape.straight),
            ("front_escape.rotate", t.front_escape.rotate),
            ("side_escape.straight", t.side_escape.straight),
            ("side_escape.rotate", t.side_escape.rotate),
            ("back_escape.straight", t.back_escape.straight),
            ("back_escape.rotate", t.back_escape.rotate),
            ("front_poll", t.front_poll),
            ("side_poll", t.side_poll),
            ("status_interval", t.status_interval),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.as_ticks() == 0) {
            return Err(ConfigError::ZeroDuration(name));
        }

        let s = &self.speeds;
        if s.max <= 0 || s.max > DRIVE_RANGE {
            return Err(ConfigError::InvalidMaxSpeed);
        }
        let speeds = [
            ("search", s.search),
            ("attack", s.attack),
            ("push", s.push),
            ("arc_outer", s.arc_outer),
            ("arc_inner", s.arc_inner),
            ("escape", s.escape),
            ("recovery", s.recovery),
        ];
        if let Some((name, _)) = speeds.iter().find(|(_, v)| !(0..=s.max).contains(v)) {
            return Err(ConfigError::SpeedOutOfRange(name));
        }
        if !(s.arc_inner <= s.arc_outer && s.arc_outer <= s.attack) {
            return Err(ConfigError::ArcOrder);
        }
        if s.push != s.max {
            return Err(ConfigError::PushBelowMax);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
