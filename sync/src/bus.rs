//! Typed publish/subscribe with last-value caching.
//!
//! Everything here is single-threaded: handlers run synchronously on the
//! firing task, in registration order, against a snapshot of the handler
//! list taken when `fire` starts.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

type Handler<T> = Rc<dyn Fn(&T) -> anyhow::Result<()>>;

struct Registration<T> {
    id: u64,
    alive: Rc<Cell<bool>>,
    handler: Handler<T>,
}

impl<T> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            alive: self.alive.clone(),
            handler: self.handler.clone(),
        }
    }
}

struct Registry<T> {
    next_id: u64,
    handlers: Vec<Registration<T>>,
    current: Option<T>,
    /// Set while the outermost `fire` is delivering.
    dispatching: bool,
    /// Values fired from inside a handler, delivered after the current one.
    pending: VecDeque<T>,
}

/// A typed event bus.
///
/// Cloning yields another handle to the same bus.
pub struct EventEmitter<T> {
    name: &'static str,
    inner: Rc<RefCell<Registry<T>>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> EventEmitter<T> {
    /// `name` only shows up in logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
                current: None,
                dispatching: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Register `handler`. Registering the same closure twice yields two
    /// independent registrations.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// disposed or dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) -> anyhow::Result<()> + 'static,
    {
        let alive = Rc::new(Cell::new(true));
        let id = {
            let mut registry = self.inner.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.handlers.push(Registration {
                id,
                alive: alive.clone(),
                handler: Rc::new(handler),
            });
            id
        };

        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            alive.set(false);
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().handlers.retain(|r| r.id != id);
            }
        })
    }

    /// Store `value` as the current value, then deliver it to every handler
    /// registered at this moment.
    ///
    /// Handlers added while dispatching wait for the next value. A handler
    /// disposed mid-dispatch is skipped. A failing or panicking handler is
    /// logged and the remaining handlers still run.
    ///
    /// A `fire` from inside a handler is queued and delivered once every
    /// handler has seen the current value, so each handler observes values
    /// in firing order.
    pub fn fire(&self, value: T) {
        {
            let mut registry = self.inner.borrow_mut();
            registry.current = Some(value.clone());
            if registry.dispatching {
                registry.pending.push_back(value);
                return;
            }
            registry.dispatching = true;
        }

        let mut next = Some(value);
        while let Some(value) = next {
            let snapshot = self.inner.borrow().handlers.clone();
            self.deliver(&snapshot, &value);
            let mut registry = self.inner.borrow_mut();
            next = registry.pending.pop_front();
            if next.is_none() {
                registry.dispatching = false;
            }
        }
    }

    fn deliver(&self, snapshot: &[Registration<T>], value: &T) {
        for registration in snapshot {
            if !registration.alive.get() {
                continue;
            }
            let handler = &registration.handler;
            match catch_unwind(AssertUnwindSafe(|| handler(value))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(bus = self.name, error = %e, "Event handler failed");
                }
                Err(_) => {
                    tracing::error!(bus = self.name, "Event handler panicked");
                }
            }
        }
    }

    /// The most recently fired value, if any.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.inner.borrow().current.clone()
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    /// Whether both handles point at the same bus.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Ownership of one registration.
///
/// Disposing removes exactly that registration; disposing again is a no-op.
/// Dropping disposes.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    disposer: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(disposer: impl FnOnce() + 'static) -> Self {
        Self {
            disposer: Some(Box::new(disposer)),
        }
    }

    pub fn dispose(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposer.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
