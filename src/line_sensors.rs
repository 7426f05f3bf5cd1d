// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! TLC1543 10-bit serial ADC behind the five reflectance sensors.
//!
//! # Pin Configuration
//!
//! - Clock: GPIO 6
//! - Address: GPIO 7
//! - Data out: GPIO 27 (pull-up)
//! - Chip select: GPIO 28
//!
//! # Transfer
//!
//! Each chip-select cycle clocks out 10 bits: the first four clocks also
//! shift in the next channel address, MSB first. The result of a cycle is
//! the conversion started by the previous one, so a batch addresses one
//! channel more than it keeps and drops the first result.
//!
//! Channels map to sensor positions through [`BORDER_CHANNELS`].

use embassy_rp::gpio::{Input, Output};
use embassy_time::{Duration, block_for};

use crate::config::BORDER_CHANNELS;
use crate::sensors::{BORDER_SENSORS, BorderSensorId, BorderSensors};

/// Conversion time between chip-select cycles.
const CONVERSION_TIME: Duration = Duration::from_micros(100);

/// Bit-banged TLC1543 reading the five border sensors.
pub struct LineSensors<'d> {
    clock: Output<'d>,
    address: Output<'d>,
    data: Input<'d>,
    cs: Output<'d>,
}

impl<'d> LineSensors<'d> {
    /// Creates the reader with chip select released.
    ///
    /// # Arguments
    ///
    /// * `clock` - I/O clock output
    /// * `address` - Channel address output
    /// * `data` - Conversion data input
    /// * `cs` - Chip select output, active low
    pub fn new(clock: Output<'d>, address: Output<'d>, data: Input<'d>, mut cs: Output<'d>) -> Self {
        cs.set_high();
        Self {
            clock,
            address,
            data,
            cs,
        }
    }

    /// One chip-select cycle: addresses `next` and returns the previous conversion.
    fn transfer(&mut self, next: u8) -> u16 {
        let mut value = 0u16;
        self.cs.set_low();
        for bit in 0..10 {
            if bit < 4 {
                if (next >> (3 - bit)) & 1 == 1 {
                    self.address.set_high();
                } else {
                    self.address.set_low();
                }
            }
            value = (value << 1) | u16::from(self.data.is_high());
            self.clock.set_high();
            self.clock.set_low();
        }
        block_for(CONVERSION_TIME);
        self.cs.set_high();
        value
    }
}

impl BorderSensors for LineSensors<'_> {
    fn read(&mut self, sensor: BorderSensorId) -> u16 {
        let channel = channel_of(sensor);
        self.transfer(channel);
        self.transfer(channel)
    }

    fn read_all(&mut self) -> [u16; BORDER_SENSORS] {
        let mut values = [0u16; BORDER_SENSORS];
        self.transfer(0);
        for channel in 1..=BORDER_SENSORS {
            values[BORDER_CHANNELS[channel - 1].index()] = self.transfer(channel as u8);
        }
        values
    }
}

/// ADC channel wired to `sensor`.
fn channel_of(sensor: BorderSensorId) -> u8 {
    BORDER_CHANNELS
        .iter()
        .position(|&s| s == sensor)
        .unwrap_or(sensor.index()) as u8
}
