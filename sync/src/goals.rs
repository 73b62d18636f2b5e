//! Goal request orchestrator.
//!
//! For one tracked position, fetches the primary goal and the term goal
//! concurrently and reconciles both outcomes into a single [`GoalState`]
//! snapshot: `Loading → Updating → {Ready | Error}`, where any new trigger
//! moves back to `Updating`.
//!
//! Completions are checked against the position *at completion time*; a
//! completion for a position that is no longer current is dropped.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures_util::future;

use infoview_types::{DocumentPosition, GoalArtifact};

use crate::bus::{EventEmitter, Subscription};
use crate::config::SchedulerConfig;
use crate::error::WorkerError;
use crate::host::GoalWorker;
use crate::protocol;
use crate::throttle::DelayedThrottle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalStatus {
    Loading,
    Updating,
    Ready,
    /// A non-stale failure; cleared by the next successful update.
    Error(String),
}

/// Immutable display snapshot for one tracked position.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalState {
    pub position: Option<DocumentPosition>,
    pub status: GoalStatus,
    pub goal: Option<GoalArtifact>,
    pub term_goal: Option<GoalArtifact>,
    pub goal_error: Option<String>,
    pub term_goal_error: Option<String>,
}

impl GoalState {
    fn loading(position: Option<DocumentPosition>) -> Self {
        Self {
            position,
            status: GoalStatus::Loading,
            goal: None,
            term_goal: None,
            goal_error: None,
            term_goal_error: None,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == GoalStatus::Ready
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            GoalStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

struct Inner {
    worker: Rc<dyn GoalWorker>,
    throttle: DelayedThrottle,
    scheduler: Cell<SchedulerConfig>,
    position: RefCell<Option<DocumentPosition>>,
    busy: Cell<bool>,
    want_term_goal: Cell<bool>,
    /// Bumped by every trigger and every run; only the newest run may
    /// publish.
    generation: Cell<u64>,
    disposed: Cell<bool>,
    state: RefCell<Rc<GoalState>>,
    updates: EventEmitter<Rc<GoalState>>,
}

/// Cloning yields another handle to the same orchestrator. Scheduled runs
/// hold only a weak reference, so dropping every handle stops updates.
#[derive(Clone)]
pub struct GoalOrchestrator {
    inner: Rc<Inner>,
}

impl GoalOrchestrator {
    #[must_use]
    pub fn new(worker: Rc<dyn GoalWorker>, scheduler: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                worker,
                throttle: DelayedThrottle::new(),
                scheduler: Cell::new(scheduler),
                position: RefCell::new(None),
                busy: Cell::new(false),
                want_term_goal: Cell::new(true),
                generation: Cell::new(0),
                disposed: Cell::new(false),
                state: RefCell::new(Rc::new(GoalState::loading(None))),
                updates: EventEmitter::new("goal-state"),
            }),
        }
    }

    /// Track `position`. A change of position triggers an update.
    pub fn set_position(&self, position: Option<DocumentPosition>) {
        if *self.inner.position.borrow() == position {
            return;
        }
        *self.inner.position.borrow_mut() = position;
        self.inner.schedule();
    }

    /// Record whether the worker is still processing the tracked document.
    /// A flip in either direction triggers an update.
    pub fn set_busy(&self, busy: bool) {
        if self.inner.busy.replace(busy) != busy {
            self.inner.schedule();
        }
    }

    /// Manual retry / refresh.
    pub fn refresh(&self) {
        self.inner.schedule();
    }

    pub fn set_scheduler(&self, scheduler: SchedulerConfig) {
        self.inner.scheduler.set(scheduler);
    }

    /// Whether to request the term goal at all. When off, the term goal
    /// stays absent and does not block `Ready`.
    pub fn set_term_goal_enabled(&self, enabled: bool) {
        if self.inner.want_term_goal.replace(enabled) != enabled {
            self.inner.schedule();
        }
    }

    /// Stop for good: the pending run is dropped, in-flight results are
    /// discarded and later triggers are ignored. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.throttle.cancel();
        self.inner.bump_generation();
    }

    #[must_use]
    pub fn position(&self) -> Option<DocumentPosition> {
        self.inner.position.borrow().clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.get()
    }

    #[must_use]
    pub fn state(&self) -> Rc<GoalState> {
        self.inner.state.borrow().clone()
    }

    /// Observe every published snapshot.
    pub fn on_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Rc<GoalState>) -> anyhow::Result<()> + 'static,
    {
        self.inner.updates.subscribe(handler)
    }
}

impl Inner {
    fn publish(&self, next: GoalState) {
        let next = Rc::new(next);
        *self.state.borrow_mut() = next.clone();
        self.updates.fire(next);
    }

    fn bump_generation(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        generation
    }

    /// A trigger supersedes any run already in flight, so the state stays
    /// `Updating` until the run it schedules completes.
    fn schedule(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        self.bump_generation();
        let current = self.state.borrow().clone();
        if current.status != GoalStatus::Updating {
            let mut next = (*current).clone();
            next.status = GoalStatus::Updating;
            self.publish(next);
        }

        let delay = self.scheduler.get().interval(self.busy.get());
        let weak: Weak<Self> = Rc::downgrade(self);
        self.throttle.trigger(delay, move || async move {
            if let Some(inner) = weak.upgrade() {
                inner.run_update().await;
            }
        });
    }

    async fn run_update(self: Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        let Some(pos) = self.position.borrow().clone() else {
            self.publish(GoalState {
                status: GoalStatus::Ready,
                ..GoalState::loading(None)
            });
            return;
        };

        let generation = self.bump_generation();
        tracing::debug!(position = %pos, generation, "Requesting goals");

        let goal_request = self.worker.request(protocol::worker::PLAIN_GOAL, &pos);
        let term_request = async {
            if self.want_term_goal.get() {
                self.worker
                    .request(protocol::worker::PLAIN_TERM_GOAL, &pos)
                    .await
            } else {
                Ok(None)
            }
        };
        let (goal, term_goal) = future::join(goal_request, term_request).await;

        if self.generation.get() != generation
            || self.position.borrow().as_ref() != Some(&pos)
        {
            tracing::debug!(position = %pos, "Dropping goals for superseded request");
            return;
        }

        if matches!(goal, Err(WorkerError::StaleDocument))
            || matches!(term_goal, Err(WorkerError::StaleDocument))
        {
            tracing::debug!(position = %pos, "Document changed mid-request; retrying");
            self.schedule();
            return;
        }

        let previous = self.state.borrow().clone();
        let mut next = GoalState {
            position: Some(pos.clone()),
            ..(*previous).clone()
        };
        // Results from another position never carry over.
        if previous.position.as_ref() != Some(&pos) {
            next.goal = None;
            next.term_goal = None;
        }
        match goal {
            Ok(goal) => {
                next.goal = goal;
                next.goal_error = None;
            }
            Err(e) => next.goal_error = Some(e.to_string()),
        }
        match term_goal {
            Ok(term_goal) => {
                next.term_goal = term_goal;
                next.term_goal_error = None;
            }
            Err(e) => next.term_goal_error = Some(e.to_string()),
        }

        next.status = match next.goal_error.as_ref().or(next.term_goal_error.as_ref()) {
            Some(message) => {
                tracing::warn!(position = %pos, error = %message, "Goal request failed");
                GoalStatus::Error(message.clone())
            }
            None => GoalStatus::Ready,
        };
        self.publish(next);
    }
}
