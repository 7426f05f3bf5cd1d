// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Scripted hardware and a simulated clock for driving the controller on the host.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use embassy_time::{Duration, Instant};
use sumo_robot::command::Speed;
use sumo_robot::config::{BORDER_THRESHOLD, Config, LOOP_PERIOD};
use sumo_robot::controller::{Controller, TacticalState};
use sumo_robot::diagnostics::{Diagnostics, Event};
use sumo_robot::motor::DriveOutput;
use sumo_robot::robot::Robot;
use sumo_robot::sensors::{
    BORDER_SENSORS, BorderFlags, BorderSensorId, BorderSensors, Centimeters, RangeError,
    RangeReading, RangeSensorId, RangeSensors, SensorSnapshot,
};

pub fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

/// Default tuning with a start delay and opening short enough to step through.
pub fn quick_start() -> Config {
    let mut config = Config::DEFAULT;
    config.timings.start_delay = Duration::from_millis(10);
    config.timings.opening.rotate = Duration::from_millis(10);
    config.timings.opening.straight = Duration::from_millis(10);
    config
}

pub fn ranges(
    front: Option<Centimeters>,
    left: Option<Centimeters>,
    right: Option<Centimeters>,
) -> SensorSnapshot {
    SensorSnapshot {
        front,
        left,
        right,
        ..SensorSnapshot::default()
    }
}

pub fn front(cm: Centimeters) -> SensorSnapshot {
    ranges(Some(cm), None, None)
}

pub fn on_border(raw: [u16; BORDER_SENSORS]) -> SensorSnapshot {
    SensorSnapshot {
        border: BorderFlags::from_raw(raw, BORDER_THRESHOLD),
        ..SensorSnapshot::default()
    }
}

/// A controller stepped through Startup and the opening with nothing in
/// sight, together with the tick it entered Search on.
pub fn searching(config: Config) -> (Controller, Instant) {
    let mut now = at(0);
    let mut controller = Controller::new(config, now);
    while controller.state() != TacticalState::Search {
        now = now + LOOP_PERIOD;
        controller.step(&SensorSnapshot::default(), now, &mut ());
        assert!(now < at(60_000), "never reached Search");
    }
    (controller, now)
}

/// Diagnostics sink that keeps every event.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<(TacticalState, Event)>,
}

impl Recorder {
    pub fn transitions(&self) -> Vec<(TacticalState, TacticalState)> {
        self.events
            .iter()
            .filter_map(|(_, event)| match *event {
                Event::Transition { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect()
    }
}

impl Diagnostics for Recorder {
    fn report(&mut self, state: TacticalState, event: &Event) {
        self.events.push((state, *event));
    }
}

pub struct ScriptedBorder(Rc<Cell<[u16; BORDER_SENSORS]>>);

impl BorderSensors for ScriptedBorder {
    fn read(&mut self, sensor: BorderSensorId) -> u16 {
        self.0.get()[sensor.index()]
    }
}

type RangeScript = [RangeReading; 3];

/// Delivers a fresh measurement of the scripted value on every tick, unless
/// measurements are held in flight.
pub struct ScriptedRange {
    script: Rc<Cell<RangeScript>>,
    in_flight: Rc<Cell<bool>>,
}

impl RangeSensors for ScriptedRange {
    fn latest(&mut self, sensor: RangeSensorId) -> Option<RangeReading> {
        if self.in_flight.get() {
            None
        } else {
            Some(self.script.get()[sensor as usize])
        }
    }
}

/// Every `(left, right)` pair sent to the wheels.
#[derive(Debug, Default)]
pub struct RecordingDrive {
    pub sent: Vec<(Speed, Speed)>,
}

impl DriveOutput for RecordingDrive {
    fn set_drive(&mut self, left: Speed, right: Speed) {
        self.sent.push((left, right));
    }
}

/// Handles for changing what the robot's sensors report.
pub struct Field {
    border: Rc<Cell<[u16; BORDER_SENSORS]>>,
    range: Rc<Cell<RangeScript>>,
    in_flight: Rc<Cell<bool>>,
}

impl Field {
    pub fn set_border(&self, raw: [u16; BORDER_SENSORS]) {
        self.border.set(raw);
    }

    pub fn set_range(&self, sensor: RangeSensorId, reading: RangeReading) {
        let mut script = self.range.get();
        script[sensor as usize] = reading;
        self.range.set(script);
    }

    /// Holds every range measurement in flight (`true`) or lets them finish.
    pub fn hold_ranges(&self, in_flight: bool) {
        self.in_flight.set(in_flight);
    }
}

pub type SimRobot = Robot<ScriptedBorder, ScriptedRange, RecordingDrive, Recorder>;

/// A robot on scripted hardware, ticked every `LOOP_PERIOD`.
pub struct Sim {
    pub robot: SimRobot,
    pub field: Field,
    pub now: Instant,
}

impl Sim {
    pub fn new(config: Config) -> Self {
        let border = Rc::new(Cell::new([0; BORDER_SENSORS]));
        let range = Rc::new(Cell::new([Err(RangeError::Timeout); 3]));
        let in_flight = Rc::new(Cell::new(false));
        let now = at(0);
        let robot = Robot::new(
            config,
            ScriptedBorder(border.clone()),
            ScriptedRange {
                script: range.clone(),
                in_flight: in_flight.clone(),
            },
            RecordingDrive::default(),
            Recorder::default(),
            now,
        )
        .expect("valid config");
        Self {
            robot,
            field: Field {
                border,
                range,
                in_flight,
            },
            now,
        }
    }

    /// Advances the clock one period and runs a tick.
    pub fn tick(&mut self) -> sumo_robot::DriveCommand {
        self.now = self.now + LOOP_PERIOD;
        self.robot.tick(self.now)
    }

    /// Ticks until `state` is reached, panicking after `limit`.
    pub fn run_until(&mut self, state: TacticalState, limit: Duration) {
        let deadline = self.now + limit;
        while self.robot.state() != state {
            assert!(self.now < deadline, "{state:?} not reached, stuck in {:?}", self.robot.state());
            self.tick();
        }
    }

    pub fn wheels(&self) -> (Speed, Speed) {
        self.robot.motors().last_drive()
    }

    pub fn events(&self) -> &[(TacticalState, Event)] {
        &self.robot.diagnostics().events
    }
}
