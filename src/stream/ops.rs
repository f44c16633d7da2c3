//! The operator set: stream-to-stream transformations.
//!
//! Every operator returns a new [`Stream`] whose subscription function
//! subscribes to the upstream stream(s), relays transformed notifications
//! to its own subscription, completes when upstream completes (except
//! where noted) and registers "unsubscribe my upstream subscription" as a
//! downstream teardown, so that cancelling a composed pipeline releases
//! every listener and timer the whole chain acquired.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::subscription::Subscription;

use super::Stream;

impl<T: 'static> Stream<T> {
    /// Relays `transform(value)` for each upstream value.
    ///
    /// Panics in `transform` are not caught; they propagate up the
    /// delivering call stack (see the crate-level error contract).
    pub fn map<U: 'static>(&self, transform: impl Fn(T) -> U + 'static) -> Stream<U> {
        let upstream = self.clone();
        let transform = Rc::new(transform);
        Stream::new(move |out: Subscription<U>| {
            let transform = transform.clone();
            let source = upstream.subscribe_with(
                {
                    let out = out.clone();
                    move |value| out.next(transform(value))
                },
                {
                    let out = out.clone();
                    move || out.complete()
                },
            );
            out.add_teardown(move || source.unsubscribe());
        })
    }

    /// Relays only the values for which `predicate` holds; the rest are
    /// dropped silently.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let upstream = self.clone();
        let predicate = Rc::new(predicate);
        Stream::new(move |out: Subscription<T>| {
            let predicate = predicate.clone();
            let source = upstream.subscribe_with(
                {
                    let out = out.clone();
                    move |value| {
                        if predicate(&value) {
                            out.next(value);
                        }
                    }
                },
                {
                    let out = out.clone();
                    move || out.complete()
                },
            );
            out.add_teardown(move || source.unsubscribe());
        })
    }

    /// Invokes `action` on each value for its side effect, then relays the
    /// value unchanged (tap semantics).
    pub fn inspect(&self, action: impl Fn(&T) + 'static) -> Stream<T> {
        let upstream = self.clone();
        let action = Rc::new(action);
        Stream::new(move |out: Subscription<T>| {
            let action = action.clone();
            let source = upstream.subscribe_with(
                {
                    let out = out.clone();
                    move |value| {
                        action(&value);
                        out.next(value);
                    }
                },
                {
                    let out = out.clone();
                    move || out.complete()
                },
            );
            out.add_teardown(move || source.unsubscribe());
        })
    }

    /// Like fold, but relays every intermediate accumulation.
    ///
    /// The running state starts at `initial` when the subscription is
    /// created; two subscriptions to the same scanned stream accumulate
    /// independently.
    pub fn scan<S>(&self, initial: S, accumulate: impl Fn(S, T) -> S + 'static) -> Stream<S>
    where
        S: Clone + 'static,
    {
        let upstream = self.clone();
        let accumulate = Rc::new(accumulate);
        Stream::new(move |out: Subscription<S>| {
            let accumulate = accumulate.clone();
            let state = Cell::new(Some(initial.clone()));
            let source = upstream.subscribe_with(
                {
                    let out = out.clone();
                    move |value| {
                        if let Some(current) = state.take() {
                            let folded = accumulate(current, value);
                            state.set(Some(folded.clone()));
                            out.next(folded);
                        }
                    }
                },
                {
                    let out = out.clone();
                    move || out.complete()
                },
            );
            out.add_teardown(move || source.unsubscribe());
        })
    }

    /// For each upstream value, subscribes to `project(value)` and relays
    /// every value that inner stream produces, flattened into one output
    /// stream.
    ///
    /// An inner stream completing does not complete the output; only the
    /// outer upstream completing does. Inner subscriptions still active
    /// when the output completes or is unsubscribed are released.
    /// Concurrently active inner streams interleave in arrival order.
    pub fn flat_map<U: 'static>(&self, project: impl Fn(T) -> Stream<U> + 'static) -> Stream<U> {
        let upstream = self.clone();
        let project = Rc::new(project);
        Stream::new(move |out: Subscription<U>| {
            let project = project.clone();
            let inners: Rc<RefCell<Vec<Subscription<U>>>> = Rc::new(RefCell::new(Vec::new()));
            let source = upstream.subscribe_with(
                {
                    let out = out.clone();
                    let inners = inners.clone();
                    move |value| {
                        let inner = project(value).subscribe_with(
                            {
                                let out = out.clone();
                                move |v| out.next(v)
                            },
                            // inner completion leaves the output running
                            || {},
                        );
                        let mut live = inners.borrow_mut();
                        live.retain(|sub| !sub.is_closed());
                        if !inner.is_closed() {
                            live.push(inner);
                        }
                    }
                },
                {
                    let out = out.clone();
                    move || out.complete()
                },
            );
            out.add_teardown({
                let inners = inners.clone();
                move || {
                    for inner in inners.borrow_mut().drain(..) {
                        inner.unsubscribe();
                    }
                }
            });
            out.add_teardown(move || source.unsubscribe());
        })
    }

    /// Relays upstream values until `notifier` produces its first value,
    /// then completes.
    ///
    /// Whichever fires first wins: the source completing naturally, or the
    /// notifier emitting. Exactly one completion reaches downstream even
    /// if both fire. A notifier that completes without ever emitting
    /// leaves the source running. Teardown releases the subscriptions to
    /// both the source and the notifier.
    pub fn take_until<N: 'static>(&self, notifier: &Stream<N>) -> Stream<T> {
        let upstream = self.clone();
        let notifier = notifier.clone();
        Stream::new(move |out: Subscription<T>| {
            let trigger = notifier.subscribe_with(
                {
                    let out = out.clone();
                    move |_| out.complete()
                },
                || {},
            );
            let source = upstream.subscribe_with(
                {
                    let out = out.clone();
                    move |value| out.next(value)
                },
                {
                    let out = out.clone();
                    move || out.complete()
                },
            );
            out.add_teardown(move || {
                source.unsubscribe();
                trigger.unsubscribe();
            });
        })
    }
}
