//! Mission-phase state machine.
//!
//! A [`PhaseController`] is generic over an application-defined phase set, an
//! event enumeration, a source enumeration, and a fixed count of independent
//! timers. The controller knows phase identity only - what "Boost" means to a
//! pyro driver or a logger is expressed through [`PhaseObserver`]s, never
//! inside the machine.
//!
//! ## Transition application
//!
//! `on_event`, `on_source_crossed`, and timer expiry all look up
//! `(current phase, trigger)` in the transition table. A match applies, in
//! strict order:
//!
//! 1. the outgoing phase's exit notifications,
//! 2. the phase swap,
//! 3. re-arming: planned timers for the new phase start, all others stop,
//!    and the armed-source set is replaced,
//! 4. the incoming phase's entry notifications.
//!
//! Triggers with no matching row - including source crossings while the
//! source is not armed - are ignored no-ops: irrelevant sensor noise in a
//! phase that does not care is normal, not an error.
//!
//! ## Threading
//!
//! Calls are synchronous and complete in bounded time; they run on whichever
//! thread feeds the controller, typically a time-critical sampling loop, and
//! must not block. The controller is owned by a single detector unit's thread
//! by convention (`&mut self` entry points, no internal lock). Give each
//! machine one owning unit rather than sharing it across detectors.
//!
//! ## Detector arming
//!
//! Entering a phase replaces the armed-source set. The unit feeding a
//! threshold detector checks [`source_armed`](PhaseController::source_armed)
//! and resets its detector when the source becomes armed, so each arm cycle
//! gets the one-shot crossing contract of
//! [`RollingThreshold`](crate::core::detection::RollingThreshold).

mod observer;
mod timer;

pub use observer::{PhaseChange, PhaseObserver};
pub use timer::TimerId;

use core::fmt::Debug;
use std::time::Duration;

use crate::core::traits::time::TimeSource;
use crate::log_info;
use timer::TimerSlot;

/// A discrete cause of a phase transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger<E, S> {
    /// An application event was raised (e.g. a network launch notification).
    Event(E),
    /// A threshold detector reported its source crossing.
    SourceCrossed(S),
    /// A planned one-shot timer expired.
    TimerExpired(TimerId),
}

/// One row of the transition table.
#[derive(Clone, Copy, Debug)]
struct Transition<P, E, S> {
    from: P,
    on: Trigger<E, S>,
    to: P,
}

/// Generic mission-phase controller.
///
/// `TIMERS` fixes the number of independent one-shot timers; timers are
/// polled, not interrupt-driven, so the owning unit calls
/// [`poll_timers`](Self::poll_timers) from its loop.
pub struct PhaseController<P, E, S, T, const TIMERS: usize>
where
    P: Copy + PartialEq + Debug,
    E: Copy + PartialEq + Debug,
    S: Copy + PartialEq + Debug,
    T: TimeSource,
{
    current: P,
    started: bool,
    transitions: Vec<Transition<P, E, S>>,
    entry_observers: Vec<(P, Box<dyn PhaseObserver<P>>)>,
    exit_observers: Vec<(P, Box<dyn PhaseObserver<P>>)>,
    timer_plans: Vec<(P, TimerId, Duration)>,
    source_plans: Vec<(P, S)>,
    timers: [TimerSlot; TIMERS],
    time: T,
}

impl<P, E, S, T, const TIMERS: usize> PhaseController<P, E, S, T, TIMERS>
where
    P: Copy + PartialEq + Debug,
    E: Copy + PartialEq + Debug,
    S: Copy + PartialEq + Debug,
    T: TimeSource,
{
    /// Creates a controller resting in `initial` (the ground/idle phase).
    ///
    /// Nothing is armed and no observers fire until [`start`](Self::start).
    pub fn new(initial: P, time: T) -> Self {
        Self {
            current: initial,
            started: false,
            transitions: Vec::new(),
            entry_observers: Vec::new(),
            exit_observers: Vec::new(),
            timer_plans: Vec::new(),
            source_plans: Vec::new(),
            timers: [TimerSlot::default(); TIMERS],
            time,
        }
    }

    /// Adds a transition row: while in `from`, trigger `on` moves to `to`.
    pub fn add_transition(&mut self, from: P, on: Trigger<E, S>, to: P) {
        self.transitions.push(Transition { from, on, to });
    }

    /// Registers an observer invoked after `phase` is entered.
    pub fn add_entry_observer(&mut self, phase: P, observer: Box<dyn PhaseObserver<P>>) {
        self.entry_observers.push((phase, observer));
    }

    /// Registers an observer invoked before `phase` is left.
    pub fn add_exit_observer(&mut self, phase: P, observer: Box<dyn PhaseObserver<P>>) {
        self.exit_observers.push((phase, observer));
    }

    /// Plans one-shot `timer` to start with `duration` whenever `phase` is
    /// entered.
    ///
    /// # Panics
    ///
    /// Panics if `timer` is outside the controller's `TIMERS` slots; plans
    /// are wired at construction time, so this is a configuration bug.
    pub fn plan_timer(&mut self, phase: P, timer: TimerId, duration: Duration) {
        assert!(timer < TIMERS, "timer {} out of range ({})", timer, TIMERS);
        self.timer_plans.push((phase, timer, duration));
    }

    /// Arms `source` whenever `phase` is entered. Crossings of unarmed
    /// sources are ignored.
    pub fn arm_source(&mut self, phase: P, source: S) {
        self.source_plans.push((phase, source));
    }

    /// Enters the initial phase: arms its plans and runs its entry
    /// notifications once. Subsequent calls are no-ops.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let initial = self.current;
        self.rearm_for(initial);
        self.notify_entry(initial, initial);
        log_info!("phase controller started in {:?}", initial);
    }

    /// Currently active phase.
    pub fn current(&self) -> P {
        self.current
    }

    /// True while `source` is armed for the current phase.
    pub fn source_armed(&self, source: S) -> bool {
        self.source_plans
            .iter()
            .any(|(phase, planned)| *phase == self.current && *planned == source)
    }

    /// Feeds a discrete event through the transition table.
    pub fn on_event(&mut self, event: E) {
        self.apply(Trigger::Event(event));
    }

    /// Feeds a detector crossing through the transition table. Crossings of
    /// sources not armed for the current phase are ignored.
    pub fn on_source_crossed(&mut self, source: S) {
        if !self.source_armed(source) {
            return;
        }
        self.apply(Trigger::SourceCrossed(source));
    }

    /// Feeds a timer expiry through the transition table, disarming the
    /// slot first (timers are one-shot per arming). Normally driven by
    /// [`poll_timers`](Self::poll_timers); exposed for boundaries that
    /// deliver expiry themselves.
    pub fn on_timer_expired(&mut self, timer: TimerId) {
        if timer >= TIMERS {
            return;
        }
        self.timers[timer].disarm();
        self.apply(Trigger::TimerExpired(timer));
    }

    /// Fires any timers whose deadline has passed. Call from the owning
    /// unit's loop.
    pub fn poll_timers(&mut self) {
        let now_us = self.time.now_us();
        for id in 0..TIMERS {
            if self.timers[id].expired(now_us) {
                self.on_timer_expired(id);
            }
        }
    }

    fn lookup(&self, trigger: Trigger<E, S>) -> Option<P> {
        self.transitions
            .iter()
            .find(|t| t.from == self.current && t.on == trigger)
            .map(|t| t.to)
    }

    fn apply(&mut self, trigger: Trigger<E, S>) {
        let Some(next) = self.lookup(trigger) else {
            return;
        };
        let from = self.current;
        self.notify_exit(from, next);
        self.current = next;
        self.rearm_for(next);
        self.notify_entry(from, next);
        log_info!("phase {:?} -> {:?} on {:?}", from, next, trigger);
    }

    fn rearm_for(&mut self, phase: P) {
        let now_us = self.time.now_us();
        for id in 0..TIMERS {
            let plan = self
                .timer_plans
                .iter()
                .find(|(planned_phase, timer, _)| *planned_phase == phase && *timer == id);
            match plan {
                Some((_, _, duration)) => {
                    let duration_us = duration.as_micros().min(u64::MAX as u128) as u64;
                    self.timers[id].arm(now_us, duration_us);
                }
                None => self.timers[id].disarm(),
            }
        }
    }

    fn notify_exit(&mut self, from: P, to: P) {
        let change = PhaseChange { from, to };
        for (phase, observer) in self.exit_observers.iter_mut() {
            if *phase == from {
                observer.notify(&change);
            }
        }
    }

    fn notify_entry(&mut self, from: P, to: P) {
        let change = PhaseChange { from, to };
        for (phase, observer) in self.entry_observers.iter_mut() {
            if *phase == to {
                observer.notify(&change);
            }
        }
    }
}
