// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! RP2350A Robot-Sumo Firmware
//!
//! Autonomous sumo controller for the Waveshare Pico2Go (RP2350-Plus) using
//! the Embassy async runtime.
//!
//! # Hardware Configuration
//! - **Microcontroller**: RP2350A (ARM Cortex-M33)
//! - **Motors**: Dual DC motors with H-bridge driver
//!   - Left motor: PWM on GPIO 16 (PWMA), direction on GPIO 18 (AIN1) & GPIO 17 (AIN2)
//!   - Right motor: PWM on GPIO 21 (PWMB), direction on GPIO 19 (BIN1) & GPIO 20 (BIN2)
//! - **Border sensors**: TLC1543 ADC on GPIO 6 (clock), 7 (address), 27 (data), 28 (CS)
//! - **Range sensors**: HC-SR04 front 14/15, left 2/3, right 10/11 (trigger/echo)
//! - **IR Receiver**: NEC start signal on GPIO 5
//! - **Status LED**: GPIO 25
//!
//! # Match Sequence
//! 1. Power up, motors stopped, LED off
//! 2. Wait for the start key on the IR remote, LED on
//! 3. Start the ranging task, then run the control loop every `LOOP_PERIOD`
//!    until reset
//!
//! # Tasks
//! - **main**: border sampling, tactics and motor output, once per tick
//! - **ranging**: staggered HC-SR04 pings, publishing finished readings to
//!   [`RangeChannels`]; all of its waits are awaited, so the control loop
//!   runs while a ping is in flight
//!
//! # Build
//! ```bash
//! cargo build --release --features rp2350 --target thumbv8m.main-none-eabihf
//! ```

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_time::{Instant, Ticker};
use {defmt_rtt as _, panic_probe as _};

use sumo_robot::Robot;
use sumo_robot::config::{Config, LOOP_PERIOD, PWM_TOP, START_KEY, Timings};
use sumo_robot::diagnostics::LogSink;
use sumo_robot::hbridge::{HBridge, Wheel};
use sumo_robot::ir_receiver::IrReceiver;
use sumo_robot::line_sensors::LineSensors;
use sumo_robot::sensors::SensorTimers;
use sumo_robot::ultrasonic::{LatestRanges, RangeArray, RangeChannels, Ultrasonic};

/// Program metadata for picotool info command
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"Sumo Robot"),
    embassy_rp::binary_info::rp_program_description!(c"RP2350A Autonomous Sumo Controller"),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

/// Finished range readings, from the ranging task to the control loop
static RANGES: RangeChannels = RangeChannels::new();

/// Ranging task
///
/// Measures the front sensor every `front_poll` and the side pair every
/// `side_poll`, offset from each other so no two groups ping together.
#[embassy_executor::task]
async fn ranging(mut sensors: RangeArray<'static>, timings: Timings) {
    let mut timers = SensorTimers::new(&timings, Instant::now());
    let mut ticker = Ticker::every(LOOP_PERIOD);
    loop {
        if let Some(group) = timers.due(Instant::now()) {
            for &sensor in group.sensors() {
                let reading = sensors.measure(sensor).await;
                RANGES.publish(sensor, reading);
            }
        }
        ticker.next().await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("RP2350A Sumo Robot Starting!");
    let p = embassy_rp::init(Default::default());

    let mut led = Output::new(p.PIN_25, Level::Low);

    let mut pwm_config = PwmConfig::default();
    pwm_config.top = PWM_TOP;
    pwm_config.compare_a = 0;
    pwm_config.compare_b = 0;

    let left = Wheel::new(
        Pwm::new_output_a(p.PWM_SLICE0, p.PIN_16, pwm_config.clone()),
        Output::new(p.PIN_18, Level::Low), // AIN1
        Output::new(p.PIN_17, Level::Low), // AIN2
    );
    let right = Wheel::new(
        Pwm::new_output_b(p.PWM_SLICE2, p.PIN_21, pwm_config.clone()),
        Output::new(p.PIN_19, Level::Low), // BIN1
        Output::new(p.PIN_20, Level::Low), // BIN2
    );
    let drive = HBridge::new(left, right);

    let border = LineSensors::new(
        Output::new(p.PIN_6, Level::Low),
        Output::new(p.PIN_7, Level::Low),
        Input::new(p.PIN_27, Pull::Up),
        Output::new(p.PIN_28, Level::High),
    );

    let range = RangeArray {
        front: Ultrasonic::new(Output::new(p.PIN_14, Level::Low), Input::new(p.PIN_15, Pull::None)),
        left: Ultrasonic::new(Output::new(p.PIN_2, Level::Low), Input::new(p.PIN_3, Pull::None)),
        right: Ultrasonic::new(Output::new(p.PIN_10, Level::Low), Input::new(p.PIN_11, Pull::None)),
    };

    let ir = IrReceiver::new(Input::new(p.PIN_5, Pull::Up));

    info!("Robot ready! Waiting for start key 0x{:02X}...", START_KEY);
    ir.wait_for_key(START_KEY);
    led.set_high();

    let config = Config::DEFAULT;
    let mut robot = match Robot::new(config, border, LatestRanges(&RANGES), drive, LogSink, Instant::now()) {
        Ok(robot) => robot,
        Err(e) => defmt::panic!("invalid configuration: {}", e),
    };
    unwrap!(spawner.spawn(ranging(range, config.timings)));

    let mut ticker = Ticker::every(LOOP_PERIOD);
    loop {
        robot.tick(Instant::now());
        ticker.next().await;
    }
}
