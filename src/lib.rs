// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Robot-sumo controller for an RP2350 differential-drive robot.
//!
//! The control core is hardware-agnostic and `no_std`: it consumes three
//! capability traits and produces drive commands and diagnostics events.
//!
//! | Capability         | Trait                                 | Firmware implementation   |
//! |--------------------|---------------------------------------|---------------------------|
//! | Border sensors     | [`sensors::BorderSensors`]            | `line_sensors::LineSensors` (TLC1543) |
//! | Range sensors      | [`sensors::RangeSensors`]             | `ultrasonic::RangeArray` (HC-SR04) |
//! | Differential drive | [`motor::DriveOutput`]                | `hbridge::HBridge`        |
//! | Diagnostics        | [`diagnostics::Diagnostics`]          | [`diagnostics::LogSink`]  |
//!
//! Each control tick, [`robot::Robot::tick`] samples the sensors, lets the
//! [`controller::Controller`] apply the border-safety rule and the current
//! state's logic, and sends the resulting [`command::DriveCommand`] to the
//! motors.
//!
//! # Features
//!
//! - `defmt`: log through defmt
//! - `log`: log through the `log` facade
//! - `rp2350`: board drivers and the firmware binary (implies `defmt`)

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod command;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod escape;
pub mod motor;
pub mod robot;
pub mod scheduler;
pub mod sensors;

#[cfg(feature = "rp2350")]
pub mod hbridge;
#[cfg(feature = "rp2350")]
pub mod ir_receiver;
#[cfg(feature = "rp2350")]
pub mod line_sensors;
#[cfg(feature = "rp2350")]
pub mod ultrasonic;

pub use command::DriveCommand;
pub use config::Config;
pub use controller::TacticalState;
pub use robot::Robot;
