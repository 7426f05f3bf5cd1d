// Copyright (c) 2025 Kevin Thomas
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Tactical state machine.
//!
//! ```text
//!   Startup -> OpeningMove -> Search <-> Attack <-> Push
//!                                ^
//!   any state --border--> BorderEscape --clear--+
//! ```
//!
//! Every tick is evaluated in strict priority order:
//!
//! 1. **Border safety**: any border flag outside `BorderEscape` enters
//!    `BorderEscape`, whatever else the sensors say.
//! 2. **State logic**: the current state's handler runs against the tick's
//!    [`SensorSnapshot`] and [`EnemyEstimate`] and either stays (returning a
//!    drive command) or names the next state.
//!
//! When a handler names a new state, that state's handler runs in the same
//! tick, so the returned command always belongs to the state the robot ends
//! the tick in.
//!
//! # Tactical Policy
//!
//! Search never gives up. The flank the opponent was last seen on sets the
//! search rotation, the attack arc, the recovery turn and the back-zone
//! escape turn; before any sighting it is the right flank.

use core::fmt;

use embassy_time::Instant;

use crate::command::{DriveCommand, Rotation, Side};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Event};
use crate::escape::{Escape, EscapeStep};
use crate::scheduler::{DeadlockMonitor, Direction, EnemyEstimate, PollTimer, elapsed};
use crate::sensors::{Centimeters, SensorSnapshot};

/// Upper bound on state entries evaluated within one tick.
const MAX_TRANSITIONS_PER_TICK: usize = 4;

/// Behavior state, without its per-state data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TacticalState {
    /// Motors held still until the start delay elapses
    Startup,
    /// Scripted dash off the starting line
    OpeningMove,
    /// Rotating to find the opponent
    Search,
    /// Closing on an opponent ahead
    Attack,
    /// Full-power contact push
    Push,
    /// Backing away from the ring edge
    BorderEscape,
}

impl TacticalState {
    /// States that report status on the diagnostics cadence.
    pub fn is_engaged(self) -> bool {
        matches!(self, TacticalState::Search | TacticalState::Attack | TacticalState::Push)
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Start delay elapsed
    StartDelay,
    /// Opening move finished
    OpeningDone,
    /// Opponent seen within range ahead
    TargetAhead,
    /// Opponent seen on a flank
    TargetFlank,
    /// Opponent within push distance
    TargetClose,
    /// Front reading missing or beyond the lost distance
    TargetLost,
    /// A border sensor saw the ring edge
    Border,
    /// Escape maneuver completed
    BorderClear,
    /// Deadlock recovery maneuver completed
    DeadlockRecovered,
}

/// Search sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SearchPhase {
    /// Rotating in place
    #[default]
    Sweep,
    /// Turning to face a flank target
    Turn { toward: Side, since: Instant },
}

/// Attack bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttackPhase {
    /// First tick of the current loss of target
    pub lost_since: Option<Instant>,
}

/// Push sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushPhase {
    /// Full power into the opponent
    #[default]
    Drive,
    /// Reverse-then-rotate after a deadlock
    Recover { since: Instant },
}

/// Behavior state together with its per-state data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Behavior {
    Startup,
    OpeningMove,
    Search(SearchPhase),
    Attack(AttackPhase),
    Push(PushPhase),
    BorderEscape(Escape),
}

impl Behavior {
    /// Tactical state this behavior belongs to, without its phase data.
    pub fn state(&self) -> TacticalState {
        match self {
            Behavior::Startup => TacticalState::Startup,
            Behavior::OpeningMove => TacticalState::OpeningMove,
            Behavior::Search(_) => TacticalState::Search,
            Behavior::Attack(_) => TacticalState::Attack,
            Behavior::Push(_) => TacticalState::Push,
            Behavior::BorderEscape(_) => TacticalState::BorderEscape,
        }
    }
}

/// Control context carried across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RobotState {
    pub behavior: Behavior,
    /// Tick at which `behavior` was entered
    pub entered_at: Instant,
    /// Push progress window
    pub deadlock: DeadlockMonitor,
}

/// Result of one state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Stay(DriveCommand),
    Enter(Behavior, Trigger),
}

/// Read-only inputs shared by every handler.
struct Context<'a> {
    config: &'a Config,
    snapshot: &'a SensorSnapshot,
    enemy: EnemyEstimate,
    now: Instant,
    entered_at: Instant,
    last_side: Side,
}

impl Context<'_> {
    fn in_state_for(&self) -> embassy_time::Duration {
        elapsed(self.entered_at, self.now)
    }

    /// Frontal reading while the target still counts as engaged.
    fn tracked_front(&self) -> Option<Centimeters> {
        self.snapshot.front.filter(|&cm| cm <= self.config.distances.lost)
    }

    fn wide_arc(&self) -> DriveCommand {
        let s = &self.config.speeds;
        DriveCommand::arc(self.last_side, s.arc_outer, s.arc_inner)
    }

    fn closing_arc(&self) -> DriveCommand {
        let s = &self.config.speeds;
        DriveCommand::arc(self.last_side, s.attack, s.arc_outer)
    }
}

/// Owns the [`RobotState`] and decides one drive command per tick.
pub struct Controller {
    config: Config,
    state: RobotState,
    last_side: Side,
    status: PollTimer,
}

impl Controller {
    /// Creates a controller in `Startup`, entered at `now`.
    ///
    /// The configuration is expected to be validated already.
    pub fn new(config: Config, now: Instant) -> Self {
        Self {
            config,
            state: RobotState {
                behavior: Behavior::Startup,
                entered_at: now,
                deadlock: DeadlockMonitor::new(now, None),
            },
            last_side: Side::default(),
            status: PollTimer::new(config.timings.status_interval, now),
        }
    }

    /// Current tactical state.
    pub fn state(&self) -> TacticalState {
        self.state.behavior.state()
    }

    /// Full control context, including the active behavior's phase.
    pub fn robot_state(&self) -> &RobotState {
        &self.state
    }

    /// Validated configuration the controller runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flank the opponent was last seen on.
    pub fn last_side(&self) -> Side {
        self.last_side
    }

    /// Evaluates one tick and returns the drive command for it.
    pub fn step<S: Diagnostics>(
        &mut self,
        snapshot: &SensorSnapshot,
        now: Instant,
        diagnostics: &mut S,
    ) -> DriveCommand {
        let enemy = EnemyEstimate::from_snapshot(snapshot, self.config.distances.far);
        if let Some(side) = enemy.flank() {
            self.last_side = side;
        }

        if snapshot.border.any() && self.state() != TacticalState::BorderEscape {
            let escape = Escape::plan(&snapshot.border, self.last_side, now);
            self.enter(Behavior::BorderEscape(escape), Trigger::Border, snapshot, now, diagnostics);
        }

        let mut entries = 0;
        let command = loop {
            match self.evaluate(snapshot, enemy, now, diagnostics) {
                Step::Stay(command) => break command,
                Step::Enter(next, trigger) => {
                    self.enter(next, trigger, snapshot, now, diagnostics);
                    entries += 1;
                    if entries == MAX_TRANSITIONS_PER_TICK {
                        warn!("transition chain cut at {}", self.state());
                        break DriveCommand::Stop;
                    }
                }
            }
        };

        let state = self.state();
        if state.is_engaged() && self.status.poll(now) {
            diagnostics.report(
                state,
                &Event::Status {
                    front: snapshot.front,
                    left: snapshot.left,
                    right: snapshot.right,
                    enemy,
                },
            );
        }

        command
    }

    fn evaluate<S: Diagnostics>(
        &mut self,
        snapshot: &SensorSnapshot,
        enemy: EnemyEstimate,
        now: Instant,
        diagnostics: &mut S,
    ) -> Step {
        let ctx = Context {
            config: &self.config,
            snapshot,
            enemy,
            now,
            entered_at: self.state.entered_at,
            last_side: self.last_side,
        };

        match &mut self.state.behavior {
            Behavior::Startup => startup(&ctx),
            Behavior::OpeningMove => opening_move(&ctx),
            Behavior::Search(phase) => phase.step(&ctx),
            Behavior::Attack(phase) => phase.step(&ctx),
            Behavior::Push(phase) => phase.step(&ctx, &mut self.state.deadlock, diagnostics),
            Behavior::BorderEscape(escape) => {
                match escape.step(&snapshot.border, ctx.last_side, ctx.config, now) {
                    EscapeStep::Drive(command) => Step::Stay(command),
                    EscapeStep::Retry(command) => {
                        debug!("border still set, retrying {} escape", escape.zone());
                        diagnostics.report(
                            TacticalState::BorderEscape,
                            &Event::EscapeRetry { zone: escape.zone() },
                        );
                        Step::Stay(command)
                    }
                    EscapeStep::Clear => Step::Enter(Behavior::Search(SearchPhase::Sweep), Trigger::BorderClear),
                }
            }
        }
    }

    fn enter<S: Diagnostics>(
        &mut self,
        next: Behavior,
        trigger: Trigger,
        snapshot: &SensorSnapshot,
        now: Instant,
        diagnostics: &mut S,
    ) {
        let from = self.state();
        let to = next.state();

        if to == TacticalState::Push {
            self.state.deadlock.reset(now, snapshot.front);
        }
        self.state.behavior = next;
        self.state.entered_at = now;

        info!("{} -> {} ({})", from, to, trigger);
        diagnostics.report(to, &Event::Transition { from, to, trigger });
        if let Behavior::BorderEscape(escape) = next {
            diagnostics.report(to, &Event::EscapeStarted { zone: escape.zone() });
        }
    }
}

/// Motors off until the start delay has run out.
fn startup(ctx: &Context<'_>) -> Step {
    if ctx.in_state_for() >= ctx.config.timings.start_delay {
        Step::Enter(Behavior::OpeningMove, Trigger::StartDelay)
    } else {
        Step::Stay(DriveCommand::Stop)
    }
}

/// Spin, then charge straight.
fn opening_move(ctx: &Context<'_>) -> Step {
    let opening = ctx.config.timings.opening;
    let t = ctx.in_state_for();
    if t < opening.rotate {
        Step::Stay(DriveCommand::rotate(ctx.config.opening_rotation, ctx.config.speeds.search))
    } else if t < opening.total() {
        Step::Stay(DriveCommand::Forward(ctx.config.speeds.attack))
    } else {
        Step::Enter(Behavior::Search(SearchPhase::Sweep), Trigger::OpeningDone)
    }
}

impl SearchPhase {
    fn step(&mut self, ctx: &Context<'_>) -> Step {
        let speed = ctx.config.speeds.search;
        match *self {
            SearchPhase::Sweep => {
                if ctx.enemy.present && ctx.enemy.direction == Direction::Front {
                    Step::Enter(Behavior::Attack(AttackPhase::default()), Trigger::TargetAhead)
                } else if let Some(side) = ctx.enemy.flank() {
                    *self = SearchPhase::Turn {
                        toward: side,
                        since: ctx.now,
                    };
                    Step::Stay(DriveCommand::rotate(Rotation::toward(side), speed))
                } else {
                    Step::Stay(DriveCommand::rotate(Rotation::toward(ctx.last_side), speed))
                }
            }
            SearchPhase::Turn { toward, since } => {
                if elapsed(since, ctx.now) >= ctx.config.timings.search_turn {
                    Step::Enter(Behavior::Attack(AttackPhase::default()), Trigger::TargetFlank)
                } else {
                    Step::Stay(DriveCommand::rotate(Rotation::toward(toward), speed))
                }
            }
        }
    }
}

impl AttackPhase {
    fn step(&mut self, ctx: &Context<'_>) -> Step {
        let distances = &ctx.config.distances;
        match ctx.tracked_front() {
            None => {
                let since = *self.lost_since.get_or_insert(ctx.now);
                if elapsed(since, ctx.now) > ctx.config.timings.attack_grace {
                    Step::Enter(Behavior::Search(SearchPhase::Sweep), Trigger::TargetLost)
                } else {
                    Step::Stay(ctx.wide_arc())
                }
            }
            Some(cm) => {
                self.lost_since = None;
                if cm <= distances.close {
                    Step::Enter(Behavior::Push(PushPhase::Drive), Trigger::TargetClose)
                } else if cm <= distances.medium {
                    Step::Stay(ctx.closing_arc())
                } else {
                    Step::Stay(ctx.wide_arc())
                }
            }
        }
    }
}

impl PushPhase {
    fn step<S: Diagnostics>(
        &mut self,
        ctx: &Context<'_>,
        deadlock: &mut DeadlockMonitor,
        diagnostics: &mut S,
    ) -> Step {
        let speeds = &ctx.config.speeds;
        match *self {
            PushPhase::Drive => {
                let front = ctx.snapshot.front;
                let window = ctx.config.timings.deadlock_window;
                if deadlock.observe(ctx.now, front, window, ctx.config.distances.deadlock_tolerance) {
                    warn!("push stalled at {:?} cm, recovering", front);
                    diagnostics.report(TacticalState::Push, &Event::Deadlock { distance: front });
                    *self = PushPhase::Recover { since: ctx.now };
                    return Step::Stay(DriveCommand::Backward(speeds.recovery));
                }
                match ctx.tracked_front() {
                    Some(_) => Step::Stay(DriveCommand::Forward(speeds.push)),
                    None => Step::Enter(Behavior::Search(SearchPhase::Sweep), Trigger::TargetLost),
                }
            }
            PushPhase::Recover { since } => {
                let recovery = ctx.config.timings.recovery;
                let t = elapsed(since, ctx.now);
                if t < recovery.straight {
                    Step::Stay(DriveCommand::Backward(speeds.recovery))
                } else if t < recovery.total() {
                    Step::Stay(DriveCommand::rotate(Rotation::toward(ctx.last_side), speeds.recovery))
                } else {
                    Step::Enter(Behavior::Attack(AttackPhase::default()), Trigger::DeadlockRecovered)
                }
            }
        }
    }
}

impl fmt::Display for TacticalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TacticalState::Startup => "STARTUP",
            TacticalState::OpeningMove => "OPENING_MOVE",
            TacticalState::Search => "SEARCH",
            TacticalState::Attack => "ATTACK",
            TacticalState::Push => "PUSH",
            TacticalState::BorderEscape => "BORDER_ESCAPE",
        })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::StartDelay => "start delay over",
            Trigger::OpeningDone => "opening done",
            Trigger::TargetAhead => "target ahead",
            Trigger::TargetFlank => "faced flank target",
            Trigger::TargetClose => "target close",
            Trigger::TargetLost => "target lost",
            Trigger::Border => "border",
            Trigger::BorderClear => "border clear",
            Trigger::DeadlockRecovered => "deadlock recovered",
        })
    }
}
