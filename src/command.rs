// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Drive intents produced by the tactical state machine.
//!
//! The state machine never touches wheel channels directly. Every tick it
//! produces one [`DriveCommand`], which [`MotorController`] turns into a
//! signed command per wheel.
//!
//! ```text
//!   RotateCcw  <-  [ robot ]  ->  RotateCw
//!                 L         R
//!   Differential { left, right }: each wheel's sign picks its direction
//! ```
//!
//! [`MotorController`]: crate::motor::MotorController

use core::fmt;

/// Signed wheel speed in drive units (see [`DRIVE_RANGE`](crate::config::DRIVE_RANGE)).
pub type Speed = i16;

/// Direction of an in-place rotation, seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    /// Turn right: left wheel forward, right wheel backward
    Clockwise,
    /// Turn left: left wheel backward, right wheel forward
    CounterClockwise,
}

impl Rotation {
    /// Rotation that turns the nose toward `side`.
    pub fn toward(side: Side) -> Self {
        match side {
            Side::Left => Rotation::CounterClockwise,
            Side::Right => Rotation::Clockwise,
        }
    }

    /// Rotation that turns the nose away from `side`.
    pub fn away_from(side: Side) -> Self {
        Self::toward(side.opposite())
    }
}

/// Left or right flank of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    /// Robot's left flank
    Left,
    /// Robot's right flank; the default search direction
    #[default]
    Right,
}

impl Side {
    /// Returns the other flank.
    ///
    /// # Returns
    ///
    /// * `Side::Right` for `Side::Left` and vice versa
    ///
    /// # Examples
    ///
    /// ```
    /// use sumo_robot::command::Side;
    /// assert_eq!(Side::Left.opposite(), Side::Right);
    /// ```
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Abstract motion intent for one control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveCommand {
    /// Both wheels off
    Stop,
    /// Both wheels forward at the given speed
    Forward(Speed),
    /// Both wheels backward at the given speed
    Backward(Speed),
    /// In-place turn to the right
    RotateCw(Speed),
    /// In-place turn to the left
    RotateCcw(Speed),
    /// Independent signed wheel speeds
    Differential { left: Speed, right: Speed },
}

impl DriveCommand {
    /// In-place rotation in the given direction.
    pub fn rotate(rotation: Rotation, speed: Speed) -> Self {
        match rotation {
            Rotation::Clockwise => DriveCommand::RotateCw(speed),
            Rotation::CounterClockwise => DriveCommand::RotateCcw(speed),
        }
    }

    /// Forward arc curving toward `side`: the wheel on that side runs at
    /// `inner`, the other at `outer`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumo_robot::command::{DriveCommand, Side};
    ///
    /// assert_eq!(
    ///     DriveCommand::arc(Side::Left, 800, 500),
    ///     DriveCommand::Differential { left: 500, right: 800 }
    /// );
    /// ```
    pub fn arc(side: Side, outer: Speed, inner: Speed) -> Self {
        match side {
            Side::Left => DriveCommand::Differential {
                left: inner,
                right: outer,
            },
            Side::Right => DriveCommand::Differential {
                left: outer,
                right: inner,
            },
        }
    }

    /// Whether this command drives either wheel backward.
    pub fn is_reversing(&self) -> bool {
        match *self {
            DriveCommand::Backward(speed) => speed > 0,
            DriveCommand::Differential { left, right } => left < 0 && right < 0,
            _ => false,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rotation::Clockwise => f.write_str("CW"),
            Rotation::CounterClockwise => f.write_str("CCW"),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveCommand::Stop => f.write_str("stop"),
            DriveCommand::Forward(s) => write!(f, "forward {s}"),
            DriveCommand::Backward(s) => write!(f, "backward {s}"),
            DriveCommand::RotateCw(s) => write!(f, "rotate CW {s}"),
            DriveCommand::RotateCcw(s) => write!(f, "rotate CCW {s}"),
            DriveCommand::Differential { left, right } => write!(f, "L {left} / R {right}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_toward_and_away() {
        assert_eq!(Rotation::toward(Side::Left), Rotation::CounterClockwise);
        assert_eq!(Rotation::toward(Side::Right), Rotation::Clockwise);
        assert_eq!(Rotation::away_from(Side::Left), Rotation::Clockwise);
        assert_eq!(Rotation::away_from(Side::Right), Rotation::CounterClockwise);
    }

    #[test]
    fn arc_puts_inner_wheel_on_turning_side() {
        assert_eq!(
            DriveCommand::arc(Side::Right, 800, 500),
            DriveCommand::Differential { left: 800, right: 500 }
        );
    }

    #[test]
    fn rotate_maps_direction() {
        assert_eq!(DriveCommand::rotate(Rotation::Clockwise, 300), DriveCommand::RotateCw(300));
        assert_eq!(
            DriveCommand::rotate(Rotation::CounterClockwise, 300),
            DriveCommand::RotateCcw(300)
        );
    }

    #[test]
    fn only_backward_motion_counts_as_reversing() {
        assert!(DriveCommand::Backward(100).is_reversing());
        assert!(DriveCommand::Differential { left: -5, right: -5 }.is_reversing());
        assert!(!DriveCommand::RotateCw(100).is_reversing());
        assert!(!DriveCommand::Forward(100).is_reversing());
        assert!(!DriveCommand::Backward(0).is_reversing());
    }
}
