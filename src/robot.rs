// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! One control-loop tick, end to end.
//!
//! ```text
//! sensors.sample() -> controller.step(snapshot, now) -> motors.apply(command)
//!                               |
//!                               +-> diagnostics
//! ```
//!
//! The firmware calls [`Robot::tick`] from its main loop on a fixed ticker;
//! tests call it with a simulated clock.

use embassy_time::Instant;

use crate::command::DriveCommand;
use crate::config::{Config, ConfigError};
use crate::controller::{Controller, TacticalState};
use crate::diagnostics::Diagnostics;
use crate::motor::{DriveOutput, MotorController};
use crate::sensors::{BorderSensors, RangeSensors, SensorAcquisition};

/// The assembled robot: sensors, tactics, motors and a diagnostics sink.
pub struct Robot<B, R, D, S> {
    sensors: SensorAcquisition<B, R>,
    controller: Controller,
    motors: MotorController<D>,
    diagnostics: S,
}

impl<B, R, D, S> Robot<B, R, D, S>
where
    B: BorderSensors,
    R: RangeSensors,
    D: DriveOutput,
    S: Diagnostics,
{
    /// Validates `config` and assembles a robot in `Startup`, entered at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first configuration invariant that does not hold.
    pub fn new(
        config: Config,
        border: B,
        range: R,
        drive: D,
        diagnostics: S,
        now: Instant,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sensors: SensorAcquisition::new(border, range, &config),
            controller: Controller::new(config, now),
            motors: MotorController::new(drive, config.speeds.max),
            diagnostics,
        })
    }

    /// Runs one control cycle and returns the command sent to the motors.
    ///
    /// Nothing in a tick waits on hardware: range readings are whatever the
    /// measurement side has finished since the previous tick.
    pub fn tick(&mut self, now: Instant) -> DriveCommand {
        let snapshot = self.sensors.sample();
        let command = self.controller.step(&snapshot, now, &mut self.diagnostics);
        self.motors.apply(command);
        command
    }

    /// Current tactical state.
    pub fn state(&self) -> TacticalState {
        self.controller.state()
    }

    /// The state machine, for inspecting its [`RobotState`](crate::controller::RobotState).
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// The acquisition stage, holding the last valid range readings.
    pub fn sensors(&self) -> &SensorAcquisition<B, R> {
        &self.sensors
    }

    /// The motor controller, holding the last wheel pair sent.
    pub fn motors(&self) -> &MotorController<D> {
        &self.motors
    }

    /// The diagnostics sink.
    pub fn diagnostics(&self) -> &S {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Event;
    use crate::motor::DriveOutput;
    use crate::sensors::{BORDER_SENSORS, BorderSensorId, Centimeters, RangeReading, RangeSensorId};

    struct Border([u16; BORDER_SENSORS]);

    impl BorderSensors for Border {
        fn read(&mut self, sensor: BorderSensorId) -> u16 {
            self.0[sensor.index()]
        }
    }

    struct Front(Centimeters);

    impl RangeSensors for Front {
        fn latest(&mut self, sensor: RangeSensorId) -> Option<RangeReading> {
            match sensor {
                RangeSensorId::Front => Some(Ok(self.0)),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct Wheels(Option<(i16, i16)>);

    impl DriveOutput for Wheels {
        fn set_drive(&mut self, left: i16, right: i16) {
            self.0 = Some((left, right));
        }
    }

    #[derive(Default)]
    struct Events(Vec<Event>);

    impl Diagnostics for Events {
        fn report(&mut self, _state: TacticalState, event: &Event) {
            self.0.push(*event);
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = Config::DEFAULT;
        config.distances.close = config.distances.far;
        let robot = Robot::new(config, Border([0; 5]), Front(50), Wheels::default(), (), at(0));
        assert!(matches!(robot, Err(ConfigError::ThresholdOrder)));
    }

    #[test]
    fn motors_stay_stopped_during_startup() {
        let mut robot =
            Robot::new(Config::DEFAULT, Border([0; 5]), Front(50), Wheels::default(), (), at(0))
                .unwrap();
        assert_eq!(robot.motors().output().0, Some((0, 0)));
        assert_eq!(robot.tick(at(5)), DriveCommand::Stop);
        assert_eq!(robot.state(), TacticalState::Startup);
        assert_eq!(robot.sensors().distance(RangeSensorId::Front), Some(50));
    }

    #[test]
    fn border_during_startup_drives_escape() {
        let config = Config::DEFAULT;
        let mut robot = Robot::new(
            config,
            Border([700, 0, 0, 0, 0]),
            Front(50),
            Wheels::default(),
            Events::default(),
            at(0),
        )
        .unwrap();

        let command = robot.tick(at(5));
        assert_eq!(robot.state(), TacticalState::BorderEscape);
        assert_eq!(command, DriveCommand::Backward(config.speeds.escape));
        assert_eq!(
            robot.motors().last_drive(),
            (-config.speeds.escape, -config.speeds.escape)
        );
        assert!(matches!(
            robot.diagnostics().0[..],
            [Event::Transition { .. }, Event::EscapeStarted { .. }]
        ));
    }
}
