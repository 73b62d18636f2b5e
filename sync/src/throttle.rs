//! Delayed throttle for expensive refreshes.
//!
//! The first trigger in a quiet period arms a timer; triggers arriving while
//! it is armed only replace the callback. When the timer fires, the latest
//! callback runs. The timer is disarmed *before* the callback starts, so a
//! trigger during a slow callback begins a fresh waiting period rather than
//! queueing a back-to-back run.
//!
//! Must be used from within a [`tokio::task::LocalSet`].

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;

type Callback = Box<dyn FnOnce() -> LocalBoxFuture<'static, ()>>;

#[derive(Default)]
struct ThrottleState {
    waiting: bool,
    /// Single slot, overwritten by every trigger and read at fire time.
    latest: Option<Callback>,
}

#[derive(Clone, Default)]
pub struct DelayedThrottle {
    state: Rc<RefCell<ThrottleState>>,
}

impl DelayedThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a run of `callback` after `delay`.
    ///
    /// Returns `true` if this call armed the timer, `false` if it was
    /// absorbed into an already pending run. The delay of an absorbed call
    /// is ignored; the callback replaces the pending one.
    pub fn trigger<F, Fut>(&self, delay: Duration, callback: F) -> bool
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        {
            let mut state = self.state.borrow_mut();
            state.latest = Some(Box::new(move || callback().boxed_local()));
            if state.waiting {
                return false;
            }
            state.waiting = true;
        }

        let state = self.state.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            let callback = {
                let mut state = state.borrow_mut();
                state.waiting = false;
                state.latest.take()
            };
            if let Some(callback) = callback {
                callback().await;
            }
        });
        true
    }

    /// Drop the pending callback. An armed timer still expires but runs
    /// nothing.
    pub fn cancel(&self) {
        self.state.borrow_mut().latest = None;
    }

    /// Whether a run is armed and has not started yet.
    #[cfg(test)]
    fn is_waiting(&self) -> bool {
        self.state.borrow().waiting
    }
}
