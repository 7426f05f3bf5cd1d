// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Dual H-bridge output for the two drive motors.
//!
//! # Motor Pin Configuration
//!
//! ## Left Motor
//! - PWM: PWMA (GPIO 16)
//! - Forward: AIN1 (GPIO 18)
//! - Backward: AIN2 (GPIO 17)
//!
//! ## Right Motor
//! - PWM: PWMB (GPIO 21)
//! - Forward: BIN1 (GPIO 19)
//! - Backward: BIN2 (GPIO 20)
//!
//! Each wheel has its own PWM channel, so the two sides can turn at
//! different speeds for the attack arcs.

use embassy_rp::gpio::Output;
use embassy_rp::pwm::{Pwm, SetDutyCycle};

use crate::command::Speed;
use crate::motor::{DriveOutput, direction_pins, pwm_duty};

/// One motor: a PWM channel for speed and two direction pins.
pub struct Wheel<'d> {
    pwm: Pwm<'d>,
    fwd: Output<'d>,
    back: Output<'d>,
}

impl<'d> Wheel<'d> {
    /// Creates a wheel and stops it.
    ///
    /// # Arguments
    ///
    /// * `pwm` - PWM channel on the bridge's enable input (PWMA/PWMB)
    /// * `fwd` - Forward direction input (AIN1/BIN1)
    /// * `back` - Backward direction input (AIN2/BIN2)
    pub fn new(pwm: Pwm<'d>, fwd: Output<'d>, back: Output<'d>) -> Self {
        let mut wheel = Self { pwm, fwd, back };
        wheel.set(0);
        wheel
    }

    /// Drives the wheel at a signed speed.
    ///
    /// Pins are released before any is raised, so both direction inputs are
    /// never high together, even between the two writes.
    pub fn set(&mut self, speed: Speed) {
        let (fwd, back) = direction_pins(speed);
        self.pwm.set_duty_cycle(pwm_duty(speed)).ok();
        if !fwd {
            self.fwd.set_low();
        }
        if !back {
            self.back.set_low();
        }
        if fwd {
            self.fwd.set_high();
        }
        if back {
            self.back.set_high();
        }
    }
}

/// Left and right wheels behind one [`DriveOutput`].
pub struct HBridge<'d> {
    left: Wheel<'d>,
    right: Wheel<'d>,
}

impl<'d> HBridge<'d> {
    /// Combines the left and right wheels into one drive output.
    pub fn new(left: Wheel<'d>, right: Wheel<'d>) -> Self {
        Self { left, right }
    }
}

impl DriveOutput for HBridge<'_> {
    fn set_drive(&mut self, left: Speed, right: Speed) {
        self.left.set(left);
        self.right.set(right);
    }
}
