//! A minimal push-based event-stream core.
//!
//! A [`Stream`] is a lazy, immutable description of how to produce values
//! over time; nothing runs until [`subscribe`](Stream::subscribe) is
//! called. Subscribing creates a live [`Subscription`] that receives
//! values, completes at most once, and releases every acquired resource
//! (listeners, timers, nested subscriptions) exactly once when it closes.
//!
//! Streams come from the primitive constructors ([`Stream::from_event`],
//! [`Stream::from_iter`], [`Stream::interval`]) and are composed with
//! chainable operators: `map`, `filter`, `inspect`, `scan`, `flat_map`,
//! `take_until`. Delivery is single-threaded and synchronous on the call
//! stack of the originating source callback; there is no error channel,
//! and panics in consumer-supplied functions are not caught.
//!
//! External event and timer facilities plug in through the
//! [`EventSource`] and [`IntervalScheduler`] traits; deterministic
//! in-memory implementations live in [`testing`].

mod source;
mod stream;
mod subscription;
pub mod testing;

pub use source::{EventSource, IntervalScheduler, ListenerHandle, TimerHandle};
pub use stream::Stream;
pub use subscription::Subscription;
