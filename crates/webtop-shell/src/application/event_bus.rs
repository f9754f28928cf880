//! EventBus: synchronous publish/subscribe between shell components.
//!
//! # How dispatch works (for beginners)
//!
//! ```text
//! publish(event)
//!   1. borrow the registry, copy the handlers subscribed to event.channel()
//!      (plus wildcard handlers) into a local Vec, release the borrow
//!   2. call each handler in subscription order
//!        ├─ Ok(())       → next handler
//!        ├─ Err(e)       → log at warn, next handler
//!        └─ panic        → caught, log at warn, next handler
//! ```
//!
//! Because step 1 takes a *snapshot*, a handler that subscribes or
//! unsubscribes during dispatch only affects later publishes, and a handler
//! may publish again from inside its callback without deadlocking on the
//! registry.
//!
//! The bus is single-threaded.  Handles are `Rc`-based and cheap to clone;
//! every component that needs to publish holds its own clone.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{trace, warn};
use webtop_core::{Channel, ShellEvent};

/// A bus callback.
///
/// Returning `Err` is the polite way to report a failure; it is logged and
/// never reaches the publisher.
pub type Handler = Rc<dyn Fn(&ShellEvent) -> anyhow::Result<()>>;

/// Which events a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Topic {
    Channel(Channel),
    All,
}

impl Topic {
    fn matches(&self, channel: &Channel) -> bool {
        match self {
            Topic::All => true,
            Topic::Channel(c) => c == channel,
        }
    }
}

struct Entry {
    id: u64,
    topic: Topic,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
    next_id: u64,
}

/// The shell's event bus.  Clone freely; all clones share one registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<Registry>>,
}

/// Capability returned by [`EventBus::subscribe`].
///
/// Dropping it does **not** unsubscribe, so fire-and-forget subscriptions
/// stay alive.  Call [`Subscription::unsubscribe`] to remove the handler.
#[must_use = "keep the Subscription to be able to unsubscribe later"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Removes the handler.  Publishes that start after this call will not
    /// reach it.  A no-op if the bus is already gone.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().entries.retain(|e| e.id != self.id);
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to one channel.
    pub fn subscribe<F>(&self, channel: Channel, handler: F) -> Subscription
    where
        F: Fn(&ShellEvent) -> anyhow::Result<()> + 'static,
    {
        self.add(Topic::Channel(channel), Rc::new(handler))
    }

    /// Subscribes `handler` to every channel.  Used by logging and analytics
    /// consumers.
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ShellEvent) -> anyhow::Result<()> + 'static,
    {
        self.add(Topic::All, Rc::new(handler))
    }

    fn add(&self, topic: Topic, handler: Handler) -> Subscription {
        let mut registry = self.inner.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry { id, topic, handler });
        Subscription {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// Delivers `event` to every handler subscribed at the moment of the call.
    ///
    /// Never fails.  Returns the number of handlers that completed without
    /// error or panic.
    pub fn publish(&self, event: ShellEvent) -> usize {
        let channel = event.channel();
        let snapshot: Vec<(u64, Handler)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .filter(|e| e.topic.matches(&channel))
            .map(|e| (e.id, Rc::clone(&e.handler)))
            .collect();

        trace!(%channel, handlers = snapshot.len(), "publishing");

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(%channel, subscription = id, error = %e, "bus subscriber failed");
                }
                Err(panic) => {
                    warn!(
                        %channel,
                        subscription = id,
                        panic = panic_message(&*panic),
                        "bus subscriber panicked"
                    );
                }
            }
        }
        delivered
    }

    /// Number of handlers that would receive an event on `channel`, wildcard
    /// subscribers included.
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|e| e.topic.matches(channel))
            .count()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
