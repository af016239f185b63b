//! Phase entry/exit notification.

/// Snapshot of a phase transition handed to observers.
///
/// During the initial [`start`](super::PhaseController::start) entry, `from`
/// and `to` both name the initial phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseChange<P> {
    /// Phase being left.
    pub from: P,
    /// Phase being entered.
    pub to: P,
}

/// Observer notified when a phase is entered or exited.
///
/// Notifications are the sole side-effect mechanism of the phase controller:
/// arming pyro channels, switching a logger's target, or changing telemetry
/// cadence all happen here, never inside the controller itself. Observers
/// registered for the same phase and edge run in registration order, and the
/// controller's phase field is already consistent when either edge fires
/// (exit runs before the swap is visible to entry observers).
pub trait PhaseObserver<P>: Send {
    /// Called with the transition being applied.
    fn notify(&mut self, change: &PhaseChange<P>);
}
