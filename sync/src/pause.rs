//! Pausable projection of a fast-changing value.

/// Exposes the live value while running and the value observed just
/// before pausing while paused.
///
/// Upstream updates keep flowing in while paused; they are only hidden.
/// Resuming reveals the latest upstream value immediately.
#[derive(Debug, Clone)]
pub struct Pausable<T> {
    paused: bool,
    shown: T,
    latest: T,
}

impl<T: Clone> Pausable<T> {
    #[must_use]
    pub fn new(initial: T, start_paused: bool) -> Self {
        Self {
            paused: start_paused,
            shown: initial.clone(),
            latest: initial,
        }
    }

    /// Feed the current upstream value. Returns the value to expose.
    pub fn update(&mut self, live: T) -> &T {
        if self.paused {
            self.latest = live;
        } else {
            self.shown = live.clone();
            self.latest = live;
        }
        &self.shown
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused && !paused {
            self.shown = self.latest.clone();
        }
        self.paused = paused;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn value(&self) -> &T {
        &self.shown
    }
}
