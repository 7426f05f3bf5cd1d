// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

mod common;

use common::*;
use embassy_time::Duration;
use proptest::prelude::*;
use sumo_robot::DriveCommand;
use sumo_robot::command::Side;
use sumo_robot::config::{Config, LOOP_PERIOD};
use sumo_robot::controller::{TacticalState, Trigger};
use sumo_robot::diagnostics::Event;
use sumo_robot::motor::{DriveOutput, MotorController};
use sumo_robot::sensors::{BORDER_SENSORS, SensorSnapshot};

#[test]
fn frontal_target_is_attacked_then_pushed() {
    let config = Config::DEFAULT;
    let s = config.speeds;
    let (mut controller, start) = searching(config);

    let command = controller.step(&front(100), start + LOOP_PERIOD, &mut ());
    assert_eq!(controller.state(), TacticalState::Attack);
    assert_eq!(command, DriveCommand::Differential { left: s.arc_outer, right: s.arc_inner });

    let command = controller.step(&front(25), start + LOOP_PERIOD * 2, &mut ());
    assert_eq!(controller.state(), TacticalState::Push);
    assert_eq!(command, DriveCommand::Forward(s.push));

    struct Wheels((i16, i16));
    impl DriveOutput for Wheels {
        fn set_drive(&mut self, left: i16, right: i16) {
            self.0 = (left, right);
        }
    }
    let mut motors = MotorController::new(Wheels((0, 0)), s.max);
    motors.apply(command);
    assert_eq!(motors.output().0, (s.max, s.max));
}

#[test]
fn escape_ends_on_first_tick_after_maneuver() {
    let config = Config::DEFAULT;
    let t = config.timings;
    let cases = [
        ([700, 0, 0, 0, 0], t.front_escape.total()),
        ([0, 0, 0, 700, 0], t.side_escape.total()),
        ([0, 0, 0, 0, 700], t.back_escape.total()),
    ];

    for (raw, maneuver) in cases {
        let (mut controller, start) = searching(config);
        controller.step(&on_border(raw), start, &mut ());
        assert_eq!(controller.state(), TacticalState::BorderEscape);

        let done = start + maneuver;
        let mut now = start;
        loop {
            now = now + LOOP_PERIOD;
            controller.step(&SensorSnapshot::default(), now, &mut ());
            if now < done {
                assert_eq!(controller.state(), TacticalState::BorderEscape, "left early at {now:?}");
            } else {
                assert_eq!(controller.state(), TacticalState::Search);
                break;
            }
        }
        assert!(now < done + LOOP_PERIOD);
    }
}

#[test]
fn escape_repeats_while_border_persists() {
    let config = Config::DEFAULT;
    let (mut controller, start) = searching(config);
    let mut recorder = Recorder::default();
    let edge = on_border([0, 0, 700, 0, 0]);

    controller.step(&edge, start, &mut recorder);
    let first_end = start + config.timings.side_escape.total();
    let command = controller.step(&edge, first_end, &mut recorder);
    assert_eq!(controller.state(), TacticalState::BorderEscape);
    assert_eq!(command, DriveCommand::Backward(config.speeds.escape));
    assert!(matches!(recorder.events.last(), Some((_, Event::EscapeRetry { .. }))));

    let second_end = first_end + config.timings.side_escape.total();
    controller.step(&SensorSnapshot::default(), second_end, &mut recorder);
    assert_eq!(controller.state(), TacticalState::Search);
}

#[test]
fn stalled_push_reverses_before_reattacking() {
    let config = Config::DEFAULT;
    let window = config.timings.deadlock_window;
    let (mut controller, start) = searching(config);
    let mut recorder = Recorder::default();

    let entered = start + LOOP_PERIOD;
    controller.step(&front(20), entered, &mut recorder);
    assert_eq!(controller.state(), TacticalState::Push);

    let mut now = entered;
    let mut reversed = false;
    let recovered_at = loop {
        now = now + LOOP_PERIOD;
        let seen = recorder.events.len();
        let command = controller.step(&front(20), now, &mut recorder);
        let recovered = recorder.events[seen..].iter().any(|(_, event)| {
            matches!(
                event,
                Event::Transition {
                    to: TacticalState::Attack,
                    trigger: Trigger::DeadlockRecovered,
                    ..
                }
            )
        });
        if recovered {
            break now;
        }
        reversed |= command == DriveCommand::Backward(config.speeds.recovery);
        assert!(now < entered + window * 3, "never recovered");
    };

    assert!(reversed);
    assert!(recovered_at >= entered + window);
    assert!(recorder.events.iter().any(|(_, e)| matches!(e, Event::Deadlock { distance: Some(20) })));
}

#[test]
fn side_target_sets_arc_side() {
    let config = Config::DEFAULT;
    let s = config.speeds;
    let (mut controller, start) = searching(config);

    controller.step(&ranges(None, Some(50), None), start, &mut ());
    assert_eq!(controller.last_side(), Side::Left);
    let faced = start + config.timings.search_turn;
    let command = controller.step(&front(100), faced, &mut ());
    assert_eq!(controller.state(), TacticalState::Attack);
    assert_eq!(command, DriveCommand::Differential { left: s.arc_inner, right: s.arc_outer });
}

fn reading() -> impl Strategy<Value = Option<u16>> {
    prop::option::of(0u16..=400)
}

fn snapshot_strategy() -> impl Strategy<Value = SensorSnapshot> {
    (
        prop::array::uniform5(prop_oneof![3 => 0u16..600, 1 => 600u16..=1023]),
        reading(),
        reading(),
        reading(),
    )
        .prop_map(|(raw, front, left, right): ([u16; BORDER_SENSORS], _, _, _)| SensorSnapshot {
            front,
            left,
            right,
            ..on_border(raw)
        })
}

proptest! {
    #[test]
    fn border_always_preempts(
        ticks in prop::collection::vec((snapshot_strategy(), 0u64..80), 1..60),
    ) {
        let (mut controller, mut now) = searching(quick_start());
        for (snapshot, dt) in ticks {
            now = now + Duration::from_millis(dt);
            let before = controller.state();
            controller.step(&snapshot, now, &mut ());
            if snapshot.border.any() && before != TacticalState::BorderEscape {
                prop_assert_eq!(controller.state(), TacticalState::BorderEscape);
            }
        }
    }

    #[test]
    fn close_threshold_splits_attack_and_push(d in 0u16..=300) {
        let config = Config::DEFAULT;
        let s = config.speeds;
        let (mut controller, start) = searching(config);
        controller.step(&front(100), start, &mut ());
        prop_assert_eq!(controller.state(), TacticalState::Attack);

        let command = controller.step(&front(d), start + LOOP_PERIOD, &mut ());
        if d <= config.distances.close {
            prop_assert_eq!(controller.state(), TacticalState::Push);
            prop_assert_eq!(command, DriveCommand::Forward(s.push));
        } else {
            prop_assert_eq!(controller.state(), TacticalState::Attack);
            let expected = if d <= config.distances.medium {
                DriveCommand::arc(Side::Right, s.attack, s.arc_outer)
            } else {
                DriveCommand::arc(Side::Right, s.arc_outer, s.arc_inner)
            };
            prop_assert_eq!(command, expected);
        }
    }
}
