use std::cell::Cell;
use std::rc::Rc;

use crate::source::{EventSource, IntervalScheduler};
use crate::subscription::Subscription;

mod ops;

/// A lazy, repeatable description of a value-producing pipeline.
///
/// A `Stream` does nothing when constructed; side effects happen only when
/// it is subscribed. Every `subscribe` call re-runs the whole source chain
/// independently, so one `Stream` can be subscribed many times and each
/// subscription owns its own state (its own listeners, timers and operator
/// accumulators).
///
/// Streams are built from the primitive constructors ([`from_event`],
/// [`from_iter`], [`interval`], or [`Stream::new`] for custom sources) and
/// composed with the operator methods (`map`, `filter`, `inspect`, `scan`,
/// `flat_map`, `take_until`).
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use streamlet::Stream;
///
/// let totals = Rc::new(RefCell::new(Vec::new()));
/// let sink = totals.clone();
/// Stream::from_iter([1, 2, 3])
///     .scan(0, |total, n| total + n)
///     .subscribe(move |total| sink.borrow_mut().push(total));
/// assert_eq!(*totals.borrow(), vec![1, 3, 6]);
/// ```
///
/// [`from_event`]: Stream::from_event
/// [`from_iter`]: Stream::from_iter
/// [`interval`]: Stream::interval
pub struct Stream<T> {
    connect: Rc<dyn Fn(Subscription<T>)>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Stream {
            connect: self.connect.clone(),
        }
    }
}

impl<T: 'static> Stream<T> {
    /// Creates a stream from a subscription function.
    ///
    /// `connect` is invoked once per `subscribe` call with the fresh
    /// [`Subscription`]. It attaches to whatever upstream resource the
    /// stream wraps, delivers through `next`/`complete`, and registers the
    /// matching release via [`Subscription::add_teardown`].
    pub fn new(connect: impl Fn(Subscription<T>) + 'static) -> Self {
        Stream {
            connect: Rc::new(connect),
        }
    }

    /// Subscribes with a value callback and the default completion
    /// behaviour (a debug log line).
    ///
    /// Returns the live [`Subscription`]; call
    /// [`unsubscribe`](Subscription::unsubscribe) on it to stop the
    /// pipeline and release every upstream resource it acquired. Sources
    /// that deliver synchronously (e.g. [`Stream::from_iter`]) will have
    /// fired callbacks before this returns.
    pub fn subscribe(&self, on_next: impl FnMut(T) + 'static) -> Subscription<T> {
        self.subscribe_with(on_next, || log::debug!("stream completed"))
    }

    /// Subscribes with explicit value and completion callbacks.
    pub fn subscribe_with(
        &self,
        on_next: impl FnMut(T) + 'static,
        on_complete: impl FnMut() + 'static,
    ) -> Subscription<T> {
        let subscription = Subscription::new(on_next, on_complete);
        (self.connect)(subscription.clone());
        subscription
    }

    /// Stream of every event named `name` delivered by `source`.
    ///
    /// Each subscription registers its own listener at subscribe time and
    /// deregisters exactly that listener at teardown. The stream never
    /// completes on its own.
    pub fn from_event<S>(source: &Rc<S>, name: &str) -> Stream<T>
    where
        S: EventSource<Event = T> + 'static,
    {
        let source = source.clone();
        let name = name.to_owned();
        Stream::new(move |subscription: Subscription<T>| {
            let listener = {
                let subscription = subscription.clone();
                move |event| subscription.next(event)
            };
            let handle = source.add_listener(&name, Box::new(listener));
            let source = source.clone();
            subscription.add_teardown(move || source.remove_listener(handle));
        })
    }

    /// Stream that synchronously delivers every item of `items` in order,
    /// then completes, all before `subscribe` returns.
    ///
    /// Delivery stops early if the subscription closes mid-sequence
    /// (e.g. a `take_until` trigger firing from inside the pipeline).
    pub fn from_iter<I>(items: I) -> Stream<T>
    where
        I: IntoIterator<Item = T> + Clone + 'static,
    {
        Stream::new(move |subscription: Subscription<T>| {
            for item in items.clone() {
                if subscription.is_closed() {
                    return;
                }
                subscription.next(item);
            }
            subscription.complete();
        })
    }
}

impl Stream<u64> {
    /// Stream that fires every `period` time units on `scheduler`,
    /// delivering the cumulative elapsed time (a running total, not the
    /// raw period).
    ///
    /// Never completes on its own; teardown cancels the timer. Delivery is
    /// always asynchronous relative to `subscribe`, even for a zero
    /// period.
    pub fn interval<S>(scheduler: &Rc<S>, period: u64) -> Stream<u64>
    where
        S: IntervalScheduler + 'static,
    {
        let scheduler = scheduler.clone();
        Stream::new(move |subscription: Subscription<u64>| {
            let elapsed = Cell::new(0u64);
            let tick = {
                let subscription = subscription.clone();
                move || {
                    let total = elapsed.get() + period;
                    elapsed.set(total);
                    subscription.next(total);
                }
            };
            let handle = scheduler.set_interval(period, Box::new(tick));
            let scheduler = scheduler.clone();
            subscription.add_teardown(move || scheduler.clear_interval(handle));
        })
    }
}
