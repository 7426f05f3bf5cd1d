// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! HC-SR04 trigger/echo range sensors, measured in their own task.
//!
//! # Pin Configuration
//!
//! | Sensor | Trigger | Echo    |
//! |--------|---------|---------|
//! | Front  | GPIO 14 | GPIO 15 |
//! | Left   | GPIO 2  | GPIO 3  |
//! | Right  | GPIO 10 | GPIO 11 |
//!
//! A 10µs trigger pulse starts a measurement; the echo pin then stays high
//! for the round-trip time of the ping, 58µs per centimeter.
//!
//! # Data Flow
//!
//! ```text
//! ranging task --measure().await--> RangeChannels --try_take()--> LatestRanges (control loop)
//! ```
//!
//! Every wait in [`Ultrasonic::measure`] is an awaited GPIO edge or timer,
//! so the executor keeps running the control loop while a ping is in
//! flight. The control loop only takes finished readings out of
//! [`RangeChannels`] and never waits on them.

use embassy_rp::gpio::{Input, Output};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer, with_timeout};

use crate::sensors::{Centimeters, RangeError, RangeReading, RangeSensorId, RangeSensors};

const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Microseconds of echo per centimeter of distance.
const US_PER_CM: u64 = 58;

/// Longest wait for the echo to rise after the trigger.
const ECHO_START_TIMEOUT: Duration = Duration::from_millis(5);

/// Longest echo accepted; a bit beyond the sensor's 4m rated range.
const ECHO_WIDTH_TIMEOUT: Duration = Duration::from_millis(25);

/// One HC-SR04 module.
pub struct Ultrasonic<'d> {
    trigger: Output<'d>,
    echo: Input<'d>,
}

impl<'d> Ultrasonic<'d> {
    /// Creates a sensor with the trigger held low.
    ///
    /// # Arguments
    ///
    /// * `trigger` - Output driving the module's TRIG input
    /// * `echo` - Input on the module's ECHO output (level-shifted to 3.3V)
    pub fn new(mut trigger: Output<'d>, echo: Input<'d>) -> Self {
        trigger.set_low();
        Self { trigger, echo }
    }

    /// Pings once and times the echo.
    ///
    /// # Returns
    ///
    /// * `Ok(cm)` - Distance to the nearest echo
    /// * `Err(RangeError::NoEchoStart)` - Echo never rose after the trigger
    /// * `Err(RangeError::Timeout)` - Echo outlasted the range window (nothing in range)
    pub async fn measure(&mut self) -> RangeReading {
        self.trigger.set_high();
        Timer::after(TRIGGER_PULSE).await;
        self.trigger.set_low();

        with_timeout(ECHO_START_TIMEOUT, self.echo.wait_for_high())
            .await
            .map_err(|_| RangeError::NoEchoStart)?;
        let rise = Instant::now();
        with_timeout(ECHO_WIDTH_TIMEOUT, self.echo.wait_for_low())
            .await
            .map_err(|_| RangeError::Timeout)?;

        let width = rise.elapsed().as_micros();
        Ok((width / US_PER_CM).min(u64::from(Centimeters::MAX)) as Centimeters)
    }
}

/// Front, left and right sensors, owned by the ranging task.
pub struct RangeArray<'d> {
    pub front: Ultrasonic<'d>,
    pub left: Ultrasonic<'d>,
    pub right: Ultrasonic<'d>,
}

impl RangeArray<'_> {
    /// Measures one sensor of the array.
    pub async fn measure(&mut self, sensor: RangeSensorId) -> RangeReading {
        match sensor {
            RangeSensorId::Front => self.front.measure().await,
            RangeSensorId::Left => self.left.measure().await,
            RangeSensorId::Right => self.right.measure().await,
        }
    }
}

/// Latest finished reading per sensor, handed from the ranging task to the
/// control loop. A newer reading replaces one that was never taken.
pub struct RangeChannels {
    front: Signal<CriticalSectionRawMutex, RangeReading>,
    left: Signal<CriticalSectionRawMutex, RangeReading>,
    right: Signal<CriticalSectionRawMutex, RangeReading>,
}

impl RangeChannels {
    /// Creates the channels with no reading pending, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            front: Signal::new(),
            left: Signal::new(),
            right: Signal::new(),
        }
    }

    /// Publishes a finished measurement.
    pub fn publish(&self, sensor: RangeSensorId, reading: RangeReading) {
        self.channel(sensor).signal(reading);
    }

    fn channel(&self, sensor: RangeSensorId) -> &Signal<CriticalSectionRawMutex, RangeReading> {
        match sensor {
            RangeSensorId::Front => &self.front,
            RangeSensorId::Left => &self.left,
            RangeSensorId::Right => &self.right,
        }
    }
}

impl Default for RangeChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// Control-loop side of [`RangeChannels`].
pub struct LatestRanges<'a>(pub &'a RangeChannels);

impl RangeSensors for LatestRanges<'_> {
    fn latest(&mut self, sensor: RangeSensorId) -> Option<RangeReading> {
        self.0.channel(sensor).try_take()
    }
}
