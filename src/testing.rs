//! Deterministic in-memory collaborators for exercising pipelines.
//!
//! [`TestEventSource`] and [`TestScheduler`] implement the collaborator
//! traits against plain data structures, so lifecycle behaviour (listener
//! registration, timer cancellation, virtual-time ordering) can be
//! asserted exactly. They are public so downstream crates can unit-test
//! their own pipelines the same way.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::source::{EventSource, IntervalScheduler, ListenerHandle, TimerHandle};

type EventCallback<E> = Rc<RefCell<Box<dyn FnMut(E)>>>;

struct ListenerEntry<E> {
    id: u64,
    name: String,
    callback: EventCallback<E>,
}

/// An [`EventSource`] backed by an in-memory listener registry.
///
/// `emit` dispatches synchronously to every listener registered under the
/// event name, and tolerates listeners that deregister themselves or
/// other listeners from inside their callback (a listener removed
/// mid-dispatch is skipped).
pub struct TestEventSource<E> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<ListenerEntry<E>>>,
}

impl<E> Default for TestEventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TestEventSource<E> {
    pub fn new() -> Self {
        TestEventSource {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Number of currently registered listeners across all event names.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl<E: Clone> TestEventSource<E> {
    /// Synchronously delivers `event` to every listener registered for
    /// `name`, in registration order.
    pub fn emit(&self, name: &str, event: E) {
        // snapshot first: callbacks may add or remove listeners
        let snapshot: Vec<(u64, EventCallback<E>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| (entry.id, entry.callback.clone()))
            .collect();
        for (id, callback) in snapshot {
            let still_registered = self
                .listeners
                .borrow()
                .iter()
                .any(|entry| entry.id == id);
            if still_registered {
                (callback.borrow_mut())(event.clone());
            }
        }
    }
}

impl<E> EventSource for TestEventSource<E> {
    type Event = E;

    fn add_listener(&self, name: &str, callback: Box<dyn FnMut(E)>) -> ListenerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            name: name.to_owned(),
            callback: Rc::new(RefCell::new(callback)),
        });
        ListenerHandle(id)
    }

    fn remove_listener(&self, handle: ListenerHandle) {
        self.listeners.borrow_mut().retain(|entry| entry.id != handle.0);
    }
}

type TimerCallback = Rc<RefCell<Box<dyn FnMut()>>>;

struct TimerEntry {
    period: u64,
    due: u64,
    callback: TimerCallback,
}

/// An [`IntervalScheduler`] driven by a virtual clock.
///
/// Nothing fires until [`advance`](TestScheduler::advance) is called;
/// timers then fire in due-time order, timers due at the same instant in
/// registration order. A zero period is clamped to one tick, mirroring
/// host timer clamping, so a zero-period interval still delivers
/// asynchronously.
pub struct TestScheduler {
    now: Cell<u64>,
    next_id: Cell<u64>,
    timers: RefCell<BTreeMap<u64, TimerEntry>>,
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScheduler {
    pub fn new() -> Self {
        TestScheduler {
            now: Cell::new(0),
            next_id: Cell::new(0),
            timers: RefCell::new(BTreeMap::new()),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Number of currently scheduled timers.
    pub fn timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Advances the clock by `delta`, firing every timer that falls due,
    /// in time order. Callbacks may schedule and cancel timers; a timer
    /// cancelled mid-advance stops firing immediately.
    pub fn advance(&self, delta: u64) {
        let target = self.now.get() + delta;
        loop {
            // earliest due timer within the window; ties resolve to the
            // lowest id, i.e. registration order (BTreeMap iteration)
            let next = self
                .timers
                .borrow()
                .iter()
                .filter(|(_, entry)| entry.due <= target)
                .min_by_key(|(id, entry)| (entry.due, **id))
                .map(|(id, entry)| (*id, entry.due, entry.callback.clone()));
            let Some((id, due, callback)) = next else {
                break;
            };
            self.now.set(due);
            if let Some(entry) = self.timers.borrow_mut().get_mut(&id) {
                entry.due = due + entry.period;
            }
            log::trace!("timer {} fired at {}", id, due);
            (callback.borrow_mut())();
        }
        self.now.set(target);
    }
}

impl IntervalScheduler for TestScheduler {
    fn set_interval(&self, period: u64, callback: Box<dyn FnMut()>) -> TimerHandle {
        let period = period.max(1);
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.timers.borrow_mut().insert(
            id,
            TimerEntry {
                period,
                due: self.now.get() + period,
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        log::trace!("timer {} registered, period {}", id, period);
        TimerHandle(id)
    }

    fn clear_interval(&self, handle: TimerHandle) {
        if self.timers.borrow_mut().remove(&handle.0).is_some() {
            log::trace!("timer {} cancelled", handle.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_dispatches_in_registration_order() {
        let source = TestEventSource::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = seen.clone();
            source.add_listener("ev", Box::new(move |n: u32| seen.borrow_mut().push((tag, n))));
        }
        source.emit("ev", 5);
        assert_eq!(*seen.borrow(), vec![("a", 5), ("b", 5)]);
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let source = Rc::new(TestEventSource::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let second: Rc<Cell<Option<ListenerHandle>>> = Rc::new(Cell::new(None));
        {
            let source = source.clone();
            let second = second.clone();
            source.clone().add_listener(
                "ev",
                Box::new(move |_: u32| {
                    if let Some(handle) = second.take() {
                        source.remove_listener(handle);
                    }
                }),
            );
        }
        let handle = {
            let seen = seen.clone();
            source.add_listener("ev", Box::new(move |n: u32| seen.borrow_mut().push(n)))
        };
        second.set(Some(handle));
        source.emit("ev", 1);
        source.emit("ev", 2);
        assert!(seen.borrow().is_empty());
        assert_eq!(source.listener_count(), 1);
    }

    #[test]
    fn double_remove_is_a_no_op() {
        let source = TestEventSource::<u32>::new();
        let handle = source.add_listener("ev", Box::new(|_| {}));
        source.remove_listener(handle);
        source.remove_listener(handle);
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn timers_fire_in_due_time_order() {
        let scheduler = TestScheduler::new();
        let fired = Rc::new(RefCell::new(Vec::new()));
        for (tag, period) in [("slow", 30u64), ("fast", 10u64)] {
            let fired = fired.clone();
            scheduler.set_interval(period, Box::new(move || fired.borrow_mut().push(tag)));
        }
        scheduler.advance(30);
        assert_eq!(*fired.borrow(), vec!["fast", "fast", "slow", "fast"]);
        assert_eq!(scheduler.now(), 30);
    }

    #[test]
    fn simultaneous_timers_fire_in_registration_order() {
        let scheduler = TestScheduler::new();
        let fired = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let fired = fired.clone();
            scheduler.set_interval(10, Box::new(move || fired.borrow_mut().push(tag)));
        }
        scheduler.advance(10);
        assert_eq!(*fired.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn zero_period_is_clamped_and_never_fires_synchronously() {
        let scheduler = TestScheduler::new();
        let count = Rc::new(Cell::new(0u32));
        {
            let count = count.clone();
            scheduler.set_interval(0, Box::new(move || count.set(count.get() + 1)));
        }
        assert_eq!(count.get(), 0);
        scheduler.advance(3);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn timer_cancelled_from_inside_a_callback_stops_firing() {
        let scheduler = Rc::new(TestScheduler::new());
        let count = Rc::new(Cell::new(0u32));
        let handle: Rc<Cell<Option<TimerHandle>>> = Rc::new(Cell::new(None));
        let registered = {
            let scheduler = scheduler.clone();
            let count = count.clone();
            let handle = handle.clone();
            scheduler.clone().set_interval(
                10,
                Box::new(move || {
                    count.set(count.get() + 1);
                    if let Some(h) = handle.take() {
                        scheduler.clear_interval(h);
                    }
                }),
            )
        };
        handle.set(Some(registered));
        scheduler.advance(50);
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.timer_count(), 0);
    }
}
