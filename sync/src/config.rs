//! Scheduler configuration.

use std::time::Duration;

use serde::Deserialize;

const fn default_idle_interval_ms() -> u64 {
    50
}

const fn default_busy_interval_ms() -> u64 {
    500
}

/// Throttle intervals for goal updates.
///
/// ```toml
/// [scheduler]
/// idle_interval_ms = 50
/// busy_interval_ms = 500
/// ```
///
/// While the worker reports the document as still processing, updates
/// back off to `busy_interval_ms` so a worker that is already behind is
/// not flooded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
    #[serde(default = "default_busy_interval_ms")]
    pub busy_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: default_idle_interval_ms(),
            busy_interval_ms: default_busy_interval_ms(),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn interval(&self, busy: bool) -> Duration {
        if busy {
            Duration::from_millis(self.busy_interval_ms)
        } else {
            Duration::from_millis(self.idle_interval_ms)
        }
    }

    /// Apply a host-pushed idle interval, if any.
    #[must_use]
    pub fn with_idle_override(self, idle_interval_ms: Option<u64>) -> Self {
        match idle_interval_ms {
            Some(idle_interval_ms) => Self {
                idle_interval_ms,
                ..self
            },
            None => self,
        }
    }
}
