//! InfoviewSession facade - public API consumed by the binary and views.
//!
//! Routes inbound host notifications into the diagnostics aggregator, the
//! file-progress map, the cursor goal orchestrator and one orchestrator per
//! pinned position. Views observe immutable snapshots through `on_*`
//! subscriptions.
//!
//! Must be used from within a [`tokio::task::LocalSet`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tokio::sync::mpsc;

use infoview_types::{
    DisplayOptions, DocumentPosition, DocumentUri, FileProgress, InfoviewAction, PinSet, Range,
};

use crate::bus::{EventEmitter, Subscription};
use crate::config::SchedulerConfig;
use crate::diagnostics::{DiagnosticsAggregator, DiagnosticsSnapshot};
use crate::goals::{GoalOrchestrator, GoalState};
use crate::host::{EditorHost, GoalWorker, HostCommand, run_host_pump};
use crate::messages::{KeyedMessage, order_messages};
use crate::pause::Pausable;
use crate::protocol::{
    self, CursorLocationParams, FileProgressParams, PublishDiagnosticsParams,
};
use crate::router::NotificationRouter;

/// Everything a view needs besides goals and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub paused: bool,
    pub show_all_messages: bool,
    pub pins: Vec<DocumentPosition>,
    pub options: DisplayOptions,
}

struct PinEntry {
    orchestrator: GoalOrchestrator,
    _updates: Subscription,
}

struct SessionInner {
    router: NotificationRouter,
    commands: mpsc::UnboundedSender<HostCommand>,
    worker: Rc<dyn GoalWorker>,
    /// Locally configured intervals, before any host override.
    scheduler: SchedulerConfig,
    diagnostics: DiagnosticsAggregator,
    progress: RefCell<HashMap<DocumentUri, FileProgress>>,
    options: RefCell<DisplayOptions>,
    show_all_messages: Cell<bool>,

    cursor: GoalOrchestrator,
    cursor_position: RefCell<Pausable<Option<DocumentPosition>>>,
    cursor_goals: RefCell<Pausable<Rc<GoalState>>>,
    goal_view: EventEmitter<Rc<GoalState>>,

    pins: RefCell<PinSet>,
    pin_goals: RefCell<HashMap<DocumentPosition, PinEntry>>,
    pin_view: EventEmitter<(DocumentPosition, Rc<GoalState>)>,

    ui: EventEmitter<UiState>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct InfoviewSession {
    inner: Rc<SessionInner>,
}

impl InfoviewSession {
    /// Start a session: spawn the host command pump and subscribe to every
    /// inbound notification the session consumes.
    #[must_use]
    pub fn start(
        host: Rc<dyn EditorHost>,
        worker: Rc<dyn GoalWorker>,
        scheduler: SchedulerConfig,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::task::spawn_local(run_host_pump(host, rx));
        Self::with_command_queue(commands, worker, scheduler)
    }

    /// Build a session whose host calls go to `commands` instead of a pump.
    #[must_use]
    pub fn with_command_queue(
        commands: mpsc::UnboundedSender<HostCommand>,
        worker: Rc<dyn GoalWorker>,
        scheduler: SchedulerConfig,
    ) -> Self {
        let cursor = GoalOrchestrator::new(worker.clone(), scheduler);
        let initial_goals = cursor.state();
        let inner = Rc::new(SessionInner {
            router: NotificationRouter::new(commands.clone()),
            commands,
            worker,
            scheduler,
            diagnostics: DiagnosticsAggregator::new(),
            progress: RefCell::new(HashMap::new()),
            options: RefCell::new(DisplayOptions::default()),
            show_all_messages: Cell::new(false),
            cursor,
            cursor_position: RefCell::new(Pausable::new(None, false)),
            cursor_goals: RefCell::new(Pausable::new(initial_goals, false)),
            goal_view: EventEmitter::new("goal-view"),
            pins: RefCell::new(PinSet::new()),
            pin_goals: RefCell::new(HashMap::new()),
            pin_view: EventEmitter::new("pin-view"),
            ui: EventEmitter::new("ui-state"),
            subscriptions: RefCell::new(Vec::new()),
        });
        let session = Self { inner };
        session.wire();
        session
    }

    fn wire(&self) {
        let router = &self.inner.router;
        let weak = Rc::downgrade(&self.inner);
        let subscriptions = vec![
            router.subscribe_typed(
                protocol::notify::PUBLISH_DIAGNOSTICS,
                with_session(&weak, |s, p: PublishDiagnosticsParams| {
                    s.inner.diagnostics.publish(p.uri, p.diagnostics);
                }),
            ),
            router.subscribe_typed(
                protocol::notify::FILE_PROGRESS,
                with_session(&weak, |s, p: FileProgressParams| {
                    s.on_file_progress(p.into_progress());
                }),
            ),
            router.subscribe_typed(
                protocol::notify::CURSOR_LOCATION,
                with_session(&weak, |s, p: CursorLocationParams| {
                    s.on_cursor_moved(p.into_position());
                }),
            ),
            router.subscribe_typed(
                protocol::notify::CONFIG_CHANGED,
                with_session(&weak, |s, options: DisplayOptions| s.set_options(options)),
            ),
            router.subscribe_typed(
                protocol::notify::ACTION,
                with_session(&weak, |s, action: InfoviewAction| s.run_action(action)),
            ),
            self.inner.cursor.on_update({
                let weak = weak.clone();
                move |state| {
                    if let Some(inner) = weak.upgrade() {
                        Self { inner }.on_cursor_goals(state.clone());
                    }
                    Ok(())
                }
            }),
        ];
        *self.inner.subscriptions.borrow_mut() = subscriptions;
    }

    /// Feed one inbound host notification.
    pub fn handle_notification(&self, method: &str, params: serde_json::Value) {
        self.inner.router.dispatch(method, params);
    }

    // --- inbound ---------------------------------------------------------

    fn on_file_progress(&self, progress: FileProgress) {
        let uri = progress.uri.clone();
        let busy = progress.is_busy();
        {
            let mut map = self.inner.progress.borrow_mut();
            if busy {
                map.insert(uri.clone(), progress);
            } else {
                map.remove(&uri);
            }
        }
        tracing::trace!(uri = %uri, busy, "File progress");

        if self
            .inner
            .cursor
            .position()
            .is_some_and(|pos| *pos.uri() == uri)
        {
            self.inner.cursor.set_busy(busy);
        }
        for orchestrator in self.pin_orchestrators(|pos| *pos.uri() == uri) {
            orchestrator.set_busy(busy);
        }
    }

    fn on_cursor_moved(&self, pos: DocumentPosition) {
        self.inner.cursor_position.borrow_mut().update(Some(pos.clone()));
        self.inner.cursor.set_busy(self.is_busy(pos.uri()));
        self.inner.cursor.set_position(Some(pos));
    }

    fn on_cursor_goals(&self, state: Rc<GoalState>) {
        let shown = {
            let mut view = self.inner.cursor_goals.borrow_mut();
            view.update(state);
            (!view.is_paused()).then(|| view.value().clone())
        };
        if let Some(shown) = shown {
            self.inner.goal_view.fire(shown);
        }
    }

    /// Apply a pushed display option snapshot.
    pub fn set_options(&self, options: DisplayOptions) {
        let scheduler = self.inner.scheduler.with_idle_override(options.debounce_time);
        let term_goals = options.show_expected_type;
        *self.inner.options.borrow_mut() = options;

        self.inner.cursor.set_scheduler(scheduler);
        self.inner.cursor.set_term_goal_enabled(term_goals);
        for orchestrator in self.pin_orchestrators(|_| true) {
            orchestrator.set_scheduler(scheduler);
            orchestrator.set_term_goal_enabled(term_goals);
        }
        self.publish_ui();
    }

    fn run_action(&self, action: InfoviewAction) {
        tracing::debug!(?action, "Host requested action");
        match action {
            InfoviewAction::TogglePaused => {
                self.toggle_paused();
            }
            InfoviewAction::ToggleAllMessages => {
                self.inner
                    .show_all_messages
                    .set(!self.inner.show_all_messages.get());
                self.publish_ui();
            }
            InfoviewAction::CopyToComment => {
                self.copy_to_comment();
            }
            InfoviewAction::TogglePin => {
                // The position the user sees, frozen while paused.
                let Some(pos) = self.cursor_position() else {
                    tracing::debug!("No cursor position to pin");
                    return;
                };
                let pinned = self.inner.pins.borrow().contains(&pos);
                if pinned {
                    self.unpin(&pos);
                } else {
                    self.pin(pos);
                }
            }
        }
    }

    /// Handles to pin orchestrators, collected so no borrow is held while
    /// they publish.
    fn pin_orchestrators(
        &self,
        filter: impl Fn(&DocumentPosition) -> bool,
    ) -> Vec<GoalOrchestrator> {
        self.inner
            .pin_goals
            .borrow()
            .iter()
            .filter(|(pos, _)| filter(pos))
            .map(|(_, entry)| entry.orchestrator.clone())
            .collect()
    }

    fn is_busy(&self, uri: &DocumentUri) -> bool {
        self.inner
            .progress
            .borrow()
            .get(uri)
            .is_some_and(FileProgress::is_busy)
    }

    fn effective_scheduler(&self) -> SchedulerConfig {
        self.inner
            .scheduler
            .with_idle_override(self.inner.options.borrow().debounce_time)
    }

    // --- queries ---------------------------------------------------------

    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.inner.diagnostics.snapshot()
    }

    /// Messages at the (possibly frozen) cursor, ordered and keyed.
    #[must_use]
    pub fn messages_at_cursor(&self) -> Vec<KeyedMessage> {
        let Some(pos) = self.cursor_position() else {
            return Vec::new();
        };
        let all_on_line = self.inner.options.borrow().all_errors_on_line;
        order_messages(self.diagnostics().filter_for(&pos, all_on_line))
    }

    /// Every message in `uri`, ordered and keyed.
    #[must_use]
    pub fn all_messages(&self, uri: &DocumentUri) -> Vec<KeyedMessage> {
        order_messages(self.diagnostics().get(uri).iter().cloned())
    }

    /// The cursor position as shown; frozen while paused.
    #[must_use]
    pub fn cursor_position(&self) -> Option<DocumentPosition> {
        self.inner.cursor_position.borrow().value().clone()
    }

    /// The cursor goal state as shown; frozen while paused.
    #[must_use]
    pub fn goal_state(&self) -> Rc<GoalState> {
        self.inner.cursor_goals.borrow().value().clone()
    }

    #[must_use]
    pub fn pin_state(&self, pos: &DocumentPosition) -> Option<Rc<GoalState>> {
        self.inner
            .pin_goals
            .borrow()
            .get(pos)
            .map(|entry| entry.orchestrator.state())
    }

    #[must_use]
    pub fn ui_state(&self) -> UiState {
        UiState {
            paused: self.is_paused(),
            show_all_messages: self.inner.show_all_messages.get(),
            pins: self.pins(),
            options: self.inner.options.borrow().clone(),
        }
    }

    #[must_use]
    pub fn options(&self) -> DisplayOptions {
        self.inner.options.borrow().clone()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.cursor_goals.borrow().is_paused()
    }

    // --- pins ------------------------------------------------------------

    /// Pin `pos` for persistent display. Returns `false` if already pinned.
    pub fn pin(&self, pos: DocumentPosition) -> bool {
        if !self.inner.pins.borrow_mut().pin(pos.clone()) {
            return false;
        }
        tracing::debug!(position = %pos, "Pinned");

        let orchestrator =
            GoalOrchestrator::new(self.inner.worker.clone(), self.effective_scheduler());
        let term_goals = self.inner.options.borrow().show_expected_type;
        orchestrator.set_term_goal_enabled(term_goals);
        let weak = Rc::downgrade(&self.inner);
        let key = pos.clone();
        let updates = orchestrator.on_update(move |state| {
            if let Some(inner) = weak.upgrade() {
                inner.pin_view.fire((key.clone(), state.clone()));
            }
            Ok(())
        });
        orchestrator.set_busy(self.is_busy(pos.uri()));
        orchestrator.set_position(Some(pos.clone()));

        self.inner.pin_goals.borrow_mut().insert(
            pos,
            PinEntry {
                orchestrator,
                _updates: updates,
            },
        );
        self.publish_ui();
        true
    }

    /// Remove a pin. Returns `false` if `pos` was not pinned.
    pub fn unpin(&self, pos: &DocumentPosition) -> bool {
        if !self.inner.pins.borrow_mut().unpin(pos) {
            return false;
        }
        tracing::debug!(position = %pos, "Unpinned");
        let removed = self.inner.pin_goals.borrow_mut().remove(pos);
        drop(removed);
        self.publish_ui();
        true
    }

    #[must_use]
    pub fn pins(&self) -> Vec<DocumentPosition> {
        self.inner.pins.borrow().iter().cloned().collect()
    }

    // --- user actions ----------------------------------------------------

    /// Manual retry for the cursor and every pin.
    pub fn refresh(&self) {
        self.inner.cursor.refresh();
        for orchestrator in self.pin_orchestrators(|_| true) {
            orchestrator.refresh();
        }
    }

    pub fn set_paused(&self, paused: bool) {
        let resumed = {
            let mut goals = self.inner.cursor_goals.borrow_mut();
            let was_paused = goals.is_paused();
            goals.set_paused(paused);
            self.inner.cursor_position.borrow_mut().set_paused(paused);
            (was_paused && !paused).then(|| goals.value().clone())
        };
        if let Some(latest) = resumed {
            self.inner.goal_view.fire(latest);
        }
        self.publish_ui();
    }

    /// Returns the new paused state.
    pub fn toggle_paused(&self) -> bool {
        let paused = !self.is_paused();
        self.set_paused(paused);
        paused
    }

    pub fn reveal(&self, uri: DocumentUri, range: Range) {
        self.queue(HostCommand::Reveal { uri, range });
    }

    pub fn copy_text(&self, text: impl Into<String>) {
        self.queue(HostCommand::CopyText(text.into()));
    }

    /// Insert the shown goal above the cursor as a block comment.
    ///
    /// Returns `false` when there is no goal to copy.
    pub fn copy_to_comment(&self) -> bool {
        let state = self.goal_state();
        let Some(goal) = state.goal.as_ref().or(state.term_goal.as_ref()) else {
            tracing::debug!("No goal to copy");
            return false;
        };
        self.queue(HostCommand::InsertText(format!(
            "/-\n{}\n-/",
            goal.plain_text()
        )));
        true
    }

    fn queue(&self, command: HostCommand) {
        if self.inner.commands.send(command).is_err() {
            tracing::warn!("Host command queue closed; dropping host call");
        }
    }

    // --- observers -------------------------------------------------------

    /// Cursor goal snapshots as shown; nothing fires while paused.
    pub fn on_goal_state<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Rc<GoalState>) -> anyhow::Result<()> + 'static,
    {
        self.inner.goal_view.subscribe(handler)
    }

    pub fn on_pin_state<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&(DocumentPosition, Rc<GoalState>)) -> anyhow::Result<()> + 'static,
    {
        self.inner.pin_view.subscribe(handler)
    }

    pub fn on_ui_state<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&UiState) -> anyhow::Result<()> + 'static,
    {
        self.inner.ui.subscribe(handler)
    }

    pub fn on_diagnostics<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DiagnosticsSnapshot) -> anyhow::Result<()> + 'static,
    {
        self.inner.diagnostics.on_update(handler)
    }

    fn publish_ui(&self) {
        self.inner.ui.fire(self.ui_state());
    }

    /// Release every notification interest (the host sees unsubscribes),
    /// cancel pending and in-flight goal requests and stop tracking pins.
    /// Further notifications are ignored.
    pub fn dispose(&self) {
        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.borrow_mut());
        if subscriptions.is_empty() {
            return;
        }
        tracing::debug!("Disposing infoview session");
        drop(subscriptions);
        self.inner.cursor.dispose();
        let pins = std::mem::take(&mut *self.inner.pin_goals.borrow_mut());
        for entry in pins.into_values() {
            entry.orchestrator.dispose();
        }
    }
}

/// Adapt a session method into a router handler that holds the session weakly.
fn with_session<P, F>(
    weak: &Weak<SessionInner>,
    f: F,
) -> impl Fn(P) -> anyhow::Result<()> + 'static
where
    P: 'static,
    F: Fn(&InfoviewSession, P) + 'static,
{
    let weak = weak.clone();
    move |params| {
        if let Some(inner) = weak.upgrade() {
            f(&InfoviewSession { inner }, params);
        }
        Ok(())
    }
}
