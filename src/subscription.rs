use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A live, running instance of a [`Stream`](crate::Stream).
///
/// One `Subscription` is created per `subscribe` call. Notifications flow
/// through a chain of subscriptions mirroring the chain of streams that
/// produced them: each operator's subscription forwards `next`/`complete`
/// down to the subscription below it.
///
/// The wrapper enforces the lifecycle contract:
/// - after the subscription is closed, no further `next` reaches the
///   downstream callbacks;
/// - `complete` fires the downstream completion callback at most once;
/// - every registered teardown action runs exactly once, in reverse
///   registration order, no matter how many times `complete` or
///   `unsubscribe` are called or in what order.
///
/// Cloning a `Subscription` clones the handle, not the state; all clones
/// observe and drive the same lifecycle.
pub struct Subscription<T> {
    inner: Rc<Inner<T>>,
}

struct Inner<T> {
    closed: Cell<bool>,
    on_next: RefCell<Box<dyn FnMut(T)>>,
    on_complete: RefCell<Box<dyn FnMut()>>,
    // release actions, run in reverse registration order on close
    teardowns: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Subscription {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Subscription<T> {
    pub(crate) fn new(
        on_next: impl FnMut(T) + 'static,
        on_complete: impl FnMut() + 'static,
    ) -> Self {
        Subscription {
            inner: Rc::new(Inner {
                closed: Cell::new(false),
                on_next: RefCell::new(Box::new(on_next)),
                on_complete: RefCell::new(Box::new(on_complete)),
                teardowns: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Delivers one value downstream. No-op once the subscription is closed.
    pub fn next(&self, value: T) {
        if self.inner.closed.get() {
            return;
        }
        (self.inner.on_next.borrow_mut())(value);
    }

    /// Terminates the stream: fires the downstream completion callback,
    /// then releases every registered teardown. Idempotent.
    pub fn complete(&self) {
        // the flag flips before the callback runs, so a reentrant
        // complete/next from inside the callback is already a no-op
        if self.inner.closed.replace(true) {
            return;
        }
        (self.inner.on_complete.borrow_mut())();
        self.run_teardowns();
    }

    /// Closes the subscription without signalling completion and releases
    /// every registered teardown. Idempotent.
    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        self.run_teardowns();
    }

    /// Registers a release action to run when this subscription closes.
    ///
    /// If the subscription is already closed the action runs immediately:
    /// a resource acquired after a synchronous completion (e.g. a source
    /// that completes inside `subscribe`) must still be released.
    pub fn add_teardown(&self, action: impl FnOnce() + 'static) {
        if self.inner.closed.get() {
            action();
        } else {
            self.inner.teardowns.borrow_mut().push(Box::new(action));
        }
    }

    /// True once the subscription has completed or been unsubscribed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    fn run_teardowns(&self) {
        let teardowns = self.inner.teardowns.take();
        for teardown in teardowns.into_iter().rev() {
            teardown();
        }
    }
}
