// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Border escape: a closed-loop, two-phase maneuver away from the boundary.
//!
//! The triggering sensors are classified into one zone, checked in order:
//!
//! | Zone  | Sensors                  | Straight phase | Rotation                   |
//! |-------|--------------------------|----------------|----------------------------|
//! | Front | front-left / front-right | reverse        | away from the stronger one |
//! | Side  | left / right             | short reverse  | ~90° away from the side    |
//! | Back  | rear                     | forward        | toward last-seen opponent  |
//!
//! When the maneuver's time is up the border flags are checked again. Clear
//! means done; still triggered restarts the maneuver (same durations) for
//! whichever zone is now triggered, as many times as it takes.

use core::fmt;

use embassy_time::Instant;

use crate::command::{DriveCommand, Rotation, Side};
use crate::config::{Config, Maneuver};
use crate::scheduler::elapsed;
use crate::sensors::{BorderFlags, BorderSensorId};

/// Region of the chassis that saw the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Zone {
    /// Either front corner sensor
    Front,
    /// A flank sensor, with both front sensors clear
    Side,
    /// Rear sensor only
    Back,
}

impl Zone {
    /// Highest-precedence zone with a triggered sensor.
    pub fn classify(border: &BorderFlags) -> Option<Zone> {
        use BorderSensorId::*;
        if border.is_set(FrontLeft) || border.is_set(FrontRight) {
            Some(Zone::Front)
        } else if border.is_set(Left) || border.is_set(Right) {
            Some(Zone::Side)
        } else if border.is_set(Rear) {
            Some(Zone::Back)
        } else {
            None
        }
    }
}

/// What the escape wants this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStep {
    /// Maneuver in progress
    Drive(DriveCommand),
    /// Maneuver finished on a border; restarted with this command
    Retry(DriveCommand),
    /// Maneuver finished and the border is clear
    Clear,
}

/// One running escape maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Escape {
    zone: Zone,
    rotation: Rotation,
    started: Instant,
}

impl Escape {
    /// Plans a maneuver for the triggered sensors.
    ///
    /// `last_side` is the flank the opponent was last seen on; the back zone
    /// turns toward it. With no sensor triggered the back-zone plan is used.
    pub fn plan(border: &BorderFlags, last_side: Side, now: Instant) -> Self {
        let zone = Zone::classify(border).unwrap_or(Zone::Back);
        let rotation = match zone {
            Zone::Front => Rotation::away_from(stronger(
                border,
                BorderSensorId::FrontLeft,
                BorderSensorId::FrontRight,
            )),
            Zone::Side => Rotation::away_from(stronger(
                border,
                BorderSensorId::Left,
                BorderSensorId::Right,
            )),
            Zone::Back => Rotation::toward(last_side),
        };
        Self {
            zone,
            rotation,
            started: now,
        }
    }

    /// Zone this escape was started (or last restarted) for.
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Turn direction of the rotate phase.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Tick at which the current attempt began.
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Durations for this zone.
    pub fn maneuver(&self, config: &Config) -> Maneuver {
        match self.zone {
            Zone::Front => config.timings.front_escape,
            Zone::Side => config.timings.side_escape,
            Zone::Back => config.timings.back_escape,
        }
    }

    /// Advances the maneuver.
    pub fn step(&mut self, border: &BorderFlags, last_side: Side, config: &Config, now: Instant) -> EscapeStep {
        let maneuver = self.maneuver(config);
        let t = elapsed(self.started, now);

        if t < maneuver.straight {
            EscapeStep::Drive(self.straight(config))
        } else if t < maneuver.total() {
            EscapeStep::Drive(DriveCommand::rotate(self.rotation, config.speeds.escape))
        } else if border.any() {
            *self = Escape::plan(border, last_side, now);
            EscapeStep::Retry(self.straight(config))
        } else {
            EscapeStep::Clear
        }
    }

    fn straight(&self, config: &Config) -> DriveCommand {
        match self.zone {
            Zone::Front | Zone::Side => DriveCommand::Backward(config.speeds.escape),
            Zone::Back => DriveCommand::Forward(config.speeds.escape),
        }
    }
}

/// Side of the pair that is triggered, or the one with the larger raw value
/// when both are. Ties go to the left.
fn stronger(border: &BorderFlags, left: BorderSensorId, right: BorderSensorId) -> Side {
    match (border.is_set(left), border.is_set(right)) {
        (true, false) => Side::Left,
        (false, true) => Side::Right,
        _ if border.raw(right) > border.raw(left) => Side::Right,
        _ => Side::Left,
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Zone::Front => "front",
            Zone::Side => "side",
            Zone::Back => "back",
        })
    }
}
