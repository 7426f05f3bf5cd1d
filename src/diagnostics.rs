// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Structured event reporting.
//!
//! The controller reports every transition, the start and retries of border
//! escapes, push deadlocks, and a periodic status line while engaged
//! (Search, Attack, Push). Each event is tagged with the state it was
//! reported in. [`LogSink`] prints them as `[STATE] event`; any other
//! [`Diagnostics`] implementation can record or forward them instead.

use core::fmt;

use crate::controller::{TacticalState, Trigger};
use crate::escape::Zone;
use crate::scheduler::EnemyEstimate;
use crate::sensors::Centimeters;

/// One diagnostics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Tactical state changed
    Transition {
        from: TacticalState,
        to: TacticalState,
        trigger: Trigger,
    },
    /// Periodic sensor summary while engaged
    Status {
        front: Option<Centimeters>,
        left: Option<Centimeters>,
        right: Option<Centimeters>,
        enemy: EnemyEstimate,
    },
    /// Border escape began in `zone`
    EscapeStarted {
        zone: Zone,
    },
    /// Border still seen after an escape; restarted for `zone`
    EscapeRetry {
        zone: Zone,
    },
    /// Push stalled with no distance progress
    Deadlock {
        distance: Option<Centimeters>,
    },
}

/// Receiver for diagnostics events.
pub trait Diagnostics {
    fn report(&mut self, state: TacticalState, event: &Event);
}

/// Discards everything.
impl Diagnostics for () {
    fn report(&mut self, _state: TacticalState, _event: &Event) {}
}

impl<T: Diagnostics + ?Sized> Diagnostics for &mut T {
    fn report(&mut self, state: TacticalState, event: &Event) {
        (**self).report(state, event);
    }
}

/// Forwards events to the crate's log output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl Diagnostics for LogSink {
    fn report(&mut self, state: TacticalState, event: &Event) {
        info!("[{}] {}", state, event);
    }
}

struct Cm(Option<Centimeters>);

impl fmt::Display for Cm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(cm) => write!(f, "{cm}cm"),
            None => f.write_str("--"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Event::Transition { from, to, trigger } => write!(f, "{from} -> {to} ({trigger})"),
            Event::Status {
                front,
                left,
                right,
                enemy,
            } => write!(
                f,
                "F {} L {} R {}, {}",
                Cm(front),
                Cm(left),
                Cm(right),
                enemy
            ),
            Event::EscapeStarted { zone } => write!(f, "escaping {zone} border"),
            Event::EscapeRetry { zone } => write!(f, "border still set, retrying {zone} escape"),
            Event::Deadlock { distance } => write!(f, "push stalled at {}", Cm(distance)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Direction;

    #[test]
    fn events_render_for_log_output() {
        let transition = Event::Transition {
            from: TacticalState::Search,
            to: TacticalState::Attack,
            trigger: Trigger::TargetAhead,
        };
        assert_eq!(format!("{transition}"), "SEARCH -> ATTACK (target ahead)");

        let status = Event::Status {
            front: Some(42),
            left: None,
            right: Some(150),
            enemy: EnemyEstimate {
                present: true,
                direction: Direction::Front,
                distance: Some(42),
            },
        };
        assert_eq!(format!("{status}"), "F 42cm L -- R 150cm, enemy front at 42 cm");

        let deadlock = Event::Deadlock { distance: None };
        assert_eq!(format!("{deadlock}"), "push stalled at --");
    }

    #[test]
    fn mutable_reference_forwards() {
        struct Recorder(Vec<(TacticalState, Event)>);
        impl Diagnostics for Recorder {
            fn report(&mut self, state: TacticalState, event: &Event) {
                self.0.push((state, *event));
            }
        }

        fn report_retry<D: Diagnostics>(mut sink: D) {
            sink.report(TacticalState::BorderEscape, &Event::EscapeRetry { zone: Zone::Side });
        }

        let mut recorder = Recorder(Vec::new());
        report_retry(&mut recorder);
        report_retry(());
        assert_eq!(
            recorder.0,
            [(TacticalState::BorderEscape, Event::EscapeRetry { zone: Zone::Side })]
        );
    }
}
