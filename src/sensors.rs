// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Sensor acquisition: border flags every tick, ranges as they arrive.
//!
//! # Sensor Layout
//!
//! ```text
//!        FL        FR         border sensors (reflectance)
//!          [ front ]          range sensor, measured every `front_poll`
//!   L [left]       [right] R  range sensors, measured together every `side_poll`
//!             Rear
//! ```
//!
//! Border sensors are cheap and read once per tick; each raw value is
//! compared against a single calibrated threshold. Range sensors cost tens
//! of milliseconds per reading, so they are measured outside the control
//! loop on the staggered [`SensorTimers`] schedule and the loop only picks
//! up finished measurements. A reading outside the plausible window is
//! dropped in favour of the last valid one.

use core::fmt;

use thiserror::Error;

use embassy_time::{Duration, Instant};

use crate::config::{Config, Distances, Timings};
use crate::scheduler::PollTimer;

/// Distance in centimeters.
pub type Centimeters = u16;

/// Number of border (line) sensors.
pub const BORDER_SENSORS: usize = 5;

/// Position of a border sensor on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BorderSensorId {
    FrontLeft,
    FrontRight,
    Left,
    Right,
    Rear,
}

impl BorderSensorId {
    /// All positions, in snapshot order. See
    /// [`BORDER_CHANNELS`](crate::config::BORDER_CHANNELS) for the wiring.
    pub const ALL: [BorderSensorId; BORDER_SENSORS] = [
        BorderSensorId::FrontLeft,
        BorderSensorId::FrontRight,
        BorderSensorId::Left,
        BorderSensorId::Right,
        BorderSensorId::Rear,
    ];

    /// Slot of this position in raw and flag arrays.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Position of a range sensor on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeSensorId {
    Front,
    Left,
    Right,
}

/// Failed range measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeError {
    /// The echo never started after the trigger pulse
    #[error("echo did not start")]
    NoEchoStart,
    /// The echo did not end within the measurement window (nothing in range)
    #[error("echo timed out")]
    Timeout,
}

/// Analog border sensor input.
pub trait BorderSensors {
    /// Raw reflectance value for one sensor.
    fn read(&mut self, sensor: BorderSensorId) -> u16;

    /// Raw values for all sensors in [`BorderSensorId::ALL`] order.
    ///
    /// Hardware that converts every channel in one transaction should
    /// override this.
    fn read_all(&mut self) -> [u16; BORDER_SENSORS] {
        BorderSensorId::ALL.map(|id| self.read(id))
    }
}

/// Outcome of one range measurement.
pub type RangeReading = Result<Centimeters, RangeError>;

/// Range sensor input.
///
/// Measurements run elsewhere (a separate task on the firmware); this side
/// only collects what has finished and never waits.
pub trait RangeSensors {
    /// Takes the newest measurement of `sensor` completed since the last
    /// call, or `None` when nothing new has arrived.
    fn latest(&mut self, sensor: RangeSensorId) -> Option<RangeReading>;
}

/// Thresholded border readings for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BorderFlags {
    raw: [u16; BORDER_SENSORS],
    flags: [bool; BORDER_SENSORS],
    /// Any flag set
    pub detected: bool,
}

impl BorderFlags {
    /// Flags every sensor whose raw value is at or above `threshold`.
    pub fn from_raw(raw: [u16; BORDER_SENSORS], threshold: u16) -> Self {
        let flags = raw.map(|value| value >= threshold);
        Self {
            raw,
            flags,
            detected: flags.iter().any(|&f| f),
        }
    }

    /// Whether `sensor` sees the boundary.
    pub fn is_set(&self, sensor: BorderSensorId) -> bool {
        self.flags[sensor.index()]
    }

    /// Unthresholded value of `sensor`, used to pick the stronger side.
    pub fn raw(&self, sensor: BorderSensorId) -> u16 {
        self.raw[sensor.index()]
    }

    /// Whether any sensor sees the boundary.
    pub fn any(&self) -> bool {
        self.detected
    }
}

/// Everything the state machine sees for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    /// Thresholded border sensors, read this tick
    pub border: BorderFlags,
    /// `None` until the sensor has produced a valid reading
    pub front: Option<Centimeters>,
    pub left: Option<Centimeters>,
    pub right: Option<Centimeters>,
}

impl SensorSnapshot {
    /// Stored distance for one range sensor.
    pub fn range(&self, sensor: RangeSensorId) -> Option<Centimeters> {
        match sensor {
            RangeSensorId::Front => self.front,
            RangeSensorId::Left => self.left,
            RangeSensorId::Right => self.right,
        }
    }
}

/// Plausible physical window for range readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLimits {
    /// Nearest plausible reading
    pub min: Centimeters,
    /// Farthest plausible reading
    pub max: Centimeters,
}

impl RangeLimits {
    /// Window `min_valid..=max_valid` from the configured distances.
    pub fn from_distances(distances: &Distances) -> Self {
        Self {
            min: distances.min_valid,
            max: distances.max_valid,
        }
    }

    /// Whether `cm` lies inside the window, both ends included.
    pub fn contains(&self, cm: Centimeters) -> bool {
        (self.min..=self.max).contains(&cm)
    }

    /// Stored value after a measurement: the measurement when plausible,
    /// otherwise the previous value unchanged.
    pub fn admit(&self, previous: Option<Centimeters>, measured: Centimeters) -> Option<Centimeters> {
        if self.contains(measured) {
            Some(measured)
        } else {
            previous
        }
    }
}

/// Range sensors measured together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeGroup {
    /// The front sensor alone
    Front,
    /// Left and right, one after the other
    Sides,
}

impl RangeGroup {
    /// Sensors to measure for this group, in order.
    pub fn sensors(self) -> &'static [RangeSensorId] {
        match self {
            RangeGroup::Front => &[RangeSensorId::Front],
            RangeGroup::Sides => &[RangeSensorId::Left, RangeSensorId::Right],
        }
    }
}

/// Independent "last read" timers for the staggered range measurements.
///
/// The side timer runs half a front interval behind the front timer, so
/// with `side_poll` a multiple of `front_poll` the groups never fall due
/// together. [`SensorTimers::due`] hands out at most one group per call
/// regardless.
#[derive(Debug, Clone, Copy)]
pub struct SensorTimers {
    /// Front sensor cadence, `front_poll`
    pub front: PollTimer,
    /// Side pair cadence, `side_poll`
    pub sides: PollTimer,
}

impl SensorTimers {
    /// Schedule starting at `now` with the front sensor due immediately.
    pub fn new(timings: &Timings, now: Instant) -> Self {
        let offset = Duration::from_ticks(timings.front_poll.as_ticks() / 2);
        Self {
            front: PollTimer::new(timings.front_poll, now),
            sides: PollTimer::new(timings.side_poll, now + offset),
        }
    }

    /// Group to measure now, if any. The front sensor wins a tie; the sides
    /// stay due and go on the next call.
    pub fn due(&mut self, now: Instant) -> Option<RangeGroup> {
        if self.front.poll(now) {
            Some(RangeGroup::Front)
        } else if self.sides.poll(now) {
            Some(RangeGroup::Sides)
        } else {
            None
        }
    }
}

/// Produces one [`SensorSnapshot`] per control tick.
pub struct SensorAcquisition<B, R> {
    border: B,
    range: R,
    threshold: u16,
    limits: RangeLimits,
    front: Option<Centimeters>,
    left: Option<Centimeters>,
    right: Option<Centimeters>,
}

impl<B: BorderSensors, R: RangeSensors> SensorAcquisition<B, R> {
    /// Creates the acquisition stage with no range reading stored yet.
    ///
    /// # Arguments
    ///
    /// * `border` - Border sensor input, read every tick
    /// * `range` - Source of finished range measurements
    /// * `config` - Supplies the border threshold and the plausible range window
    pub fn new(border: B, range: R, config: &Config) -> Self {
        Self {
            border,
            range,
            threshold: config.border_threshold,
            limits: RangeLimits::from_distances(&config.distances),
            front: None,
            left: None,
            right: None,
        }
    }

    /// Reads the border sensors and collects any finished range measurement.
    ///
    /// Never waits on a range sensor.
    pub fn sample(&mut self) -> SensorSnapshot {
        let border = BorderFlags::from_raw(self.border.read_all(), self.threshold);

        for sensor in [RangeSensorId::Front, RangeSensorId::Left, RangeSensorId::Right] {
            if let Some(reading) = self.range.latest(sensor) {
                self.refresh(sensor, reading);
            }
        }

        SensorSnapshot {
            border,
            front: self.front,
            left: self.left,
            right: self.right,
        }
    }

    /// Last valid reading for one sensor.
    pub fn distance(&self, sensor: RangeSensorId) -> Option<Centimeters> {
        match sensor {
            RangeSensorId::Front => self.front,
            RangeSensorId::Left => self.left,
            RangeSensorId::Right => self.right,
        }
    }

    fn refresh(&mut self, sensor: RangeSensorId, reading: RangeReading) {
        let previous = self.distance(sensor);
        let stored = match reading {
            Ok(cm) => {
                if !self.limits.contains(cm) {
                    debug!("{} range {} cm outside plausible window, kept {:?}", sensor, cm, previous);
                }
                self.limits.admit(previous, cm)
            }
            Err(e) => {
                debug!("{} range: {}", sensor, e);
                previous
            }
        };
        match sensor {
            RangeSensorId::Front => self.front = stored,
            RangeSensorId::Left => self.left = stored,
            RangeSensorId::Right => self.right = stored,
        }
    }
}

impl fmt::Display for BorderSensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BorderSensorId::FrontLeft => "front-left",
            BorderSensorId::FrontRight => "front-right",
            BorderSensorId::Left => "left",
            BorderSensorId::Right => "right",
            BorderSensorId::Rear => "rear",
        })
    }
}

impl fmt::Display for RangeSensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RangeSensorId::Front => "front",
            RangeSensorId::Left => "left",
            RangeSensorId::Right => "right",
        })
    }
}
