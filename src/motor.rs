// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Motion actuation for the differential drive.
//!
//! [`MotorController`] exposes motion intents (stop, forward, backward,
//! rotate, differential) on top of any [`DriveOutput`]. It knows nothing
//! about tactics; it only clamps speeds and maps each intent to one signed
//! command per wheel.
//!
//! # Wheel Signs
//!
//! | Intent       | Left  | Right |
//! |--------------|-------|-------|
//! | `forward`    | `+s`  | `+s`  |
//! | `backward`   | `-s`  | `-s`  |
//! | `rotate_cw`  | `+s`  | `-s`  |
//! | `rotate_ccw` | `-s`  | `+s`  |
//!
//! # Examples
//!
//! ```
//! use sumo_robot::motor::{DriveOutput, MotorController};
//!
//! struct Recorder(i16, i16);
//! impl DriveOutput for Recorder {
//!     fn set_drive(&mut self, left: i16, right: i16) {
//!         self.0 = left;
//!         self.1 = right;
//!     }
//! }
//!
//! let mut motors = MotorController::new(Recorder(0, 0), 1000);
//! motors.rotate_cw(400);
//! assert_eq!(motors.output().0, 400);
//! assert_eq!(motors.output().1, -400);
//! ```

use crate::command::{DriveCommand, Speed};
use crate::config::{DRIVE_RANGE, PWM_TOP};

/// Two-channel signed drive output.
///
/// Implementations drive each wheel in exactly one direction at a time: a
/// positive value forward, a negative value backward, zero stopped.
pub trait DriveOutput {
    /// Applies signed speeds, already clamped to the configured maximum.
    fn set_drive(&mut self, left: Speed, right: Speed);
}

impl<T: DriveOutput + ?Sized> DriveOutput for &mut T {
    fn set_drive(&mut self, left: Speed, right: Speed) {
        (**self).set_drive(left, right);
    }
}

/// PWM compare value for a signed wheel speed.
///
/// Only the magnitude matters; the direction pins carry the sign. Speeds
/// beyond `DRIVE_RANGE` saturate at `PWM_TOP`.
pub fn pwm_duty(speed: Speed) -> u16 {
    let magnitude = u32::from(speed.unsigned_abs().min(DRIVE_RANGE as u16));
    (magnitude * u32::from(PWM_TOP) / DRIVE_RANGE as u32) as u16
}

/// H-bridge direction inputs `(forward, backward)` for a signed wheel speed.
///
/// At most one input is high; both are low for zero, which lets the wheel
/// coast.
///
/// # Examples
///
/// ```
/// use sumo_robot::motor::direction_pins;
///
/// assert_eq!(direction_pins(300), (true, false));
/// assert_eq!(direction_pins(-300), (false, true));
/// assert_eq!(direction_pins(0), (false, false));
/// ```
pub fn direction_pins(speed: Speed) -> (bool, bool) {
    (speed > 0, speed < 0)
}

/// Intent-level controller for a pair of wheels.
pub struct MotorController<D> {
    output: D,
    max_speed: Speed,
    last: (Speed, Speed),
}

impl<D: DriveOutput> MotorController<D> {
    /// Creates a controller and stops both wheels.
    ///
    /// # Arguments
    ///
    /// * `output` - Drive output for both wheels
    /// * `max_speed` - Clamp applied to every wheel command (non-negative)
    pub fn new(output: D, max_speed: Speed) -> Self {
        let mut controller = Self {
            output,
            max_speed: max_speed.max(0),
            last: (0, 0),
        };
        controller.stop();
        controller
    }

    /// Stops both wheels immediately.
    pub fn stop(&mut self) {
        self.set(0, 0);
    }

    /// Drives both wheels forward. Negative speeds are treated as zero.
    pub fn forward(&mut self, speed: Speed) {
        let s = speed.max(0);
        self.set(s, s);
    }

    /// Drives both wheels backward. Negative speeds are treated as zero.
    pub fn backward(&mut self, speed: Speed) {
        let s = speed.max(0);
        self.set(-s, -s);
    }

    /// Turns right in place: left wheel forward, right wheel backward.
    pub fn rotate_cw(&mut self, speed: Speed) {
        let s = speed.max(0);
        self.set(s, -s);
    }

    /// Turns left in place: left wheel backward, right wheel forward.
    pub fn rotate_ccw(&mut self, speed: Speed) {
        let s = speed.max(0);
        self.set(-s, s);
    }

    /// Drives each wheel independently; the sign of each side selects its direction.
    pub fn differential(&mut self, left: Speed, right: Speed) {
        self.set(left, right);
    }

    /// Executes one [`DriveCommand`].
    pub fn apply(&mut self, command: DriveCommand) {
        match command {
            DriveCommand::Stop => self.stop(),
            DriveCommand::Forward(s) => self.forward(s),
            DriveCommand::Backward(s) => self.backward(s),
            DriveCommand::RotateCw(s) => self.rotate_cw(s),
            DriveCommand::RotateCcw(s) => self.rotate_ccw(s),
            DriveCommand::Differential { left, right } => self.differential(left, right),
        }
    }

    /// Last `(left, right)` pair sent to the output.
    pub fn last_drive(&self) -> (Speed, Speed) {
        self.last
    }

    /// The wrapped drive output.
    pub fn output(&self) -> &D {
        &self.output
    }

    fn set(&mut self, left: Speed, right: Speed) {
        let left = left.clamp(-self.max_speed, self.max_speed);
        let right = right.clamp(-self.max_speed, self.max_speed);
        self.last = (left, right);
        self.output.set_drive(left, right);
    }
}
