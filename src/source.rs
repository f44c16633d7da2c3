//! Collaborator traits for the primitive stream constructors.
//!
//! The core never talks to a host environment directly. Event delivery and
//! timers come in through these two traits; the host (a DOM wrapper, a UI
//! event loop, the in-crate [`testing`](crate::testing) doubles) supplies
//! the implementation. Both traits assume single-threaded, synchronous
//! callback dispatch.

/// Identifies one registered listener on an [`EventSource`].
///
/// Returned by `add_listener` and passed back to `remove_listener` so that
/// teardown deregisters exactly the listener it registered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerHandle(pub u64);

/// A named source of discrete external notifications (pointer events,
/// key events, ...).
///
/// `remove_listener` on a handle that was already removed must be a no-op;
/// teardown is allowed to double-release.
pub trait EventSource {
    /// Payload delivered to listeners.
    type Event;

    /// Registers `callback` for events named `name` and returns the handle
    /// that identifies this registration.
    fn add_listener(&self, name: &str, callback: Box<dyn FnMut(Self::Event)>) -> ListenerHandle;

    /// Deregisters the listener identified by `handle`.
    fn remove_listener(&self, handle: ListenerHandle);
}

/// Identifies one repeating timer on an [`IntervalScheduler`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimerHandle(pub u64);

/// A facility that fires a callback every `period` time units until
/// cancelled.
///
/// No drift correction or pause semantics are required. `clear_interval`
/// on an already-cancelled handle must be a no-op. `set_interval` must
/// never invoke the callback synchronously, even for a zero period.
pub trait IntervalScheduler {
    /// Schedules `callback` to fire every `period` time units.
    fn set_interval(&self, period: u64, callback: Box<dyn FnMut()>) -> TimerHandle;

    /// Cancels the timer identified by `handle`.
    fn clear_interval(&self, handle: TimerHandle);
}
