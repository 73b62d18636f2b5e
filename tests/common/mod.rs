//! Shared test utilities and fixtures
//!
//! A recording editor host, a scripted remote worker, and builders for the
//! notification payloads the host pushes.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use infoview_sync::{
    EditorHost, GoalWorker, HostError, InfoviewSession, LocalFut, SchedulerConfig, WorkerError,
};
use infoview_types::{DocumentPosition, DocumentUri, GoalArtifact, Position, Range};

pub const DOC: &str = "file:///Main.lean";

/// Records every host call in order.
#[derive(Default)]
pub struct RecordingHost {
    pub calls: RefCell<Vec<String>>,
    pub reject_subscribe: Cell<bool>,
}

impl RecordingHost {
    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl EditorHost for RecordingHost {
    fn subscribe_notifications<'a>(
        &'a self,
        method: &'a str,
    ) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.record(format!("subscribe {method}"));
            if self.reject_subscribe.get() {
                return Err(HostError::Rejected {
                    method: method.to_string(),
                    code: -32603,
                    message: "subscriptions disabled".to_string(),
                });
            }
            Ok(())
        })
    }

    fn unsubscribe_notifications<'a>(
        &'a self,
        method: &'a str,
    ) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.record(format!("unsubscribe {method}"));
            Ok(())
        })
    }

    fn reveal_location<'a>(
        &'a self,
        uri: &'a DocumentUri,
        range: Range,
    ) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.record(format!("reveal {uri} {}", range.start.line));
            Ok(())
        })
    }

    fn copy_to_clipboard<'a>(&'a self, text: &'a str) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.record(format!("copy {text}"));
            Ok(())
        })
    }

    fn insert_text<'a>(&'a self, text: &'a str) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.record(format!("insert {text}"));
            Ok(())
        })
    }
}

pub type Reply = Result<Option<GoalArtifact>, WorkerError>;

/// Pops scripted replies per method; once a script runs dry, answers with
/// `{"rendered": "⊢ line N"}` for the requested line.
#[derive(Default)]
pub struct ScriptedWorker {
    latency: Cell<Duration>,
    script: RefCell<HashMap<String, VecDeque<Reply>>>,
    requests: RefCell<Vec<(String, DocumentPosition)>>,
}

impl ScriptedWorker {
    pub fn set_latency(&self, latency: Duration) {
        self.latency.set(latency);
    }

    pub fn push(&self, method: &str, reply: Reply) {
        self.script
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self, method: &str) -> Vec<DocumentPosition> {
        self.requests
            .borrow()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, pos)| pos.clone())
            .collect()
    }
}

impl GoalWorker for ScriptedWorker {
    fn request<'a>(&'a self, method: &'a str, pos: &'a DocumentPosition) -> LocalFut<'a, Reply> {
        Box::pin(async move {
            self.requests
                .borrow_mut()
                .push((method.to_string(), pos.clone()));
            let scripted = self
                .script
                .borrow_mut()
                .get_mut(method)
                .and_then(VecDeque::pop_front);
            let latency = self.latency.get();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            scripted.unwrap_or_else(|| Ok(Some(rendered(&format!("⊢ line {}", pos.line())))))
        })
    }
}

pub fn rendered(text: &str) -> GoalArtifact {
    GoalArtifact::new(serde_json::json!({ "rendered": text }))
}

/// A running session wired to a recording host and a scripted worker.
pub struct Harness {
    pub session: InfoviewSession,
    pub host: Rc<RecordingHost>,
    pub worker: Rc<ScriptedWorker>,
}

/// Must be called inside a `LocalSet`.
pub fn harness() -> Harness {
    harness_with(RecordingHost::default())
}

pub fn harness_with(host: RecordingHost) -> Harness {
    let host = Rc::new(host);
    let worker = Rc::new(ScriptedWorker::default());
    let session = InfoviewSession::start(host.clone(), worker.clone(), SchedulerConfig::default());
    Harness {
        session,
        host,
        worker,
    }
}

/// Let queued host calls and due timers run.
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn pos(line: u32, character: u32) -> DocumentPosition {
    DocumentPosition::new(DocumentUri::new(DOC), Position::new(line, character))
}

pub fn range(start: (u32, u32), end: (u32, u32)) -> serde_json::Value {
    serde_json::json!({
        "start": { "line": start.0, "character": start.1 },
        "end": { "line": end.0, "character": end.1 }
    })
}

pub fn cursor_params(line: u32, character: u32) -> serde_json::Value {
    serde_json::json!({
        "uri": DOC,
        "range": range((line, character), (line, character))
    })
}

pub fn diagnostic(
    start: (u32, u32),
    end: (u32, u32),
    severity: u8,
    message: &str,
) -> serde_json::Value {
    serde_json::json!({
        "range": range(start, end),
        "fullRange": range(start, end),
        "severity": severity,
        "message": message,
        "source": "Lean 4"
    })
}

pub fn diagnostics_params(uri: &str, diagnostics: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "uri": uri, "diagnostics": diagnostics })
}

pub fn progress_params(uri: &str, processing: &[((u32, u32), (u32, u32))]) -> serde_json::Value {
    let processing: Vec<serde_json::Value> = processing
        .iter()
        .map(|(start, end)| serde_json::json!({ "range": range(*start, *end), "kind": 1 }))
        .collect();
    serde_json::json!({
        "textDocument": { "uri": uri, "version": 1 },
        "processing": processing
    })
}
