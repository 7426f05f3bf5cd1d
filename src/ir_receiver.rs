// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! NEC remote receiver used as the match start signal.
//!
//! # Frame
//!
//! ```text
//! [Lead][Space][Address][~Address][Command][~Command]
//!   9ms  4.5ms   8 bits    8 bits    8 bits   8 bits
//! ```
//!
//! Bits are pulse-distance coded, LSB first: a 560µs mark followed by a
//! 560µs space for `0` or a 1.69ms space for `1`. The receiver module's
//! output is active low.

use embassy_rp::gpio::{Input, Level};
use embassy_time::{Duration, Instant};

/// Space length above which a bit reads as `1`.
const ONE_THRESHOLD_US: u64 = 1200;

/// NEC decoder on the output of a 38kHz IR receiver module.
///
/// Decoding busy-waits on the pin; it runs only before the match starts,
/// never alongside the control loop.
pub struct IrReceiver<'d> {
    pin: Input<'d>,
}

impl<'d> IrReceiver<'d> {
    /// `pin` must be configured with a pull-up.
    pub fn new(pin: Input<'d>) -> Self {
        Self { pin }
    }

    /// Decodes one frame and returns its command byte.
    ///
    /// Blocks for up to ~150ms waiting for a lead pulse. Returns `None` on
    /// timeout, bad timing or a failed inverse check.
    pub fn read_command(&self) -> Option<u8> {
        wait_for_level(&self.pin, Level::Low, 150_000)?;
        let lead = wait_for_level(&self.pin, Level::High, 12_000)?;
        if !(8_000..=10_000).contains(&lead) {
            return None;
        }
        let space = wait_for_level(&self.pin, Level::Low, 7_000)?;
        if !(3_500..=5_000).contains(&space) {
            return None;
        }

        let mut frame = [0u8; 4];
        for i in 0..32 {
            wait_for_level(&self.pin, Level::High, 1_000)?;
            let width = wait_for_level(&self.pin, Level::Low, 2_500)?;
            if width < 200 {
                return None;
            }
            if width > ONE_THRESHOLD_US {
                frame[i / 8] |= 1 << (i % 8);
            }
        }

        let [address, address_inv, command, command_inv] = frame;
        (address.wrapping_add(address_inv) == 0xFF && command.wrapping_add(command_inv) == 0xFF)
            .then_some(command)
    }

    /// Blocks until `key` is received, logging any other key.
    pub fn wait_for_key(&self, key: u8) {
        loop {
            match self.read_command() {
                Some(k) if k == key => return,
                Some(k) => debug!("ignoring key 0x{:02X}", k),
                None => {}
            }
        }
    }
}

/// Busy-waits for `pin` to reach `level`.
///
/// Returns the microseconds waited, or `None` once `timeout_us` has passed.
fn wait_for_level(pin: &Input<'_>, level: Level, timeout_us: u64) -> Option<u64> {
    let start = Instant::now();
    let timeout = Duration::from_micros(timeout_us);
    loop {
        if pin.get_level() == level {
            return Some(start.elapsed().as_micros());
        }
        if start.elapsed() > timeout {
            return None;
        }
    }
}
