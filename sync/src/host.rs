//! Seams to the editor host and the remote worker.
//!
//! Both are external collaborators. The engine talks to them through boxed
//! local futures so a session can hold them as trait objects on a
//! single-threaded runtime.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use tokio::sync::mpsc;

use infoview_types::{DocumentPosition, DocumentUri, GoalArtifact, Range};

use crate::error::{HostError, WorkerError};

/// Boxed, non-`Send` future returned by host and worker calls.
pub type LocalFut<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Calls the engine makes into the editor host.
///
/// Every call may be rejected; callers log and swallow rejections.
pub trait EditorHost {
    fn subscribe_notifications<'a>(
        &'a self,
        method: &'a str,
    ) -> LocalFut<'a, Result<(), HostError>>;

    fn unsubscribe_notifications<'a>(
        &'a self,
        method: &'a str,
    ) -> LocalFut<'a, Result<(), HostError>>;

    fn reveal_location<'a>(
        &'a self,
        uri: &'a DocumentUri,
        range: Range,
    ) -> LocalFut<'a, Result<(), HostError>>;

    fn copy_to_clipboard<'a>(&'a self, text: &'a str) -> LocalFut<'a, Result<(), HostError>>;

    /// Insert `text` into the active document above the cursor.
    fn insert_text<'a>(&'a self, text: &'a str) -> LocalFut<'a, Result<(), HostError>>;
}

/// Requests the engine sends to the remote worker.
pub trait GoalWorker {
    /// `Ok(None)` means the worker has nothing to show at `pos`.
    fn request<'a>(
        &'a self,
        method: &'a str,
        pos: &'a DocumentPosition,
    ) -> LocalFut<'a, Result<Option<GoalArtifact>, WorkerError>>;
}

/// A queued host call. Queuing lets synchronous code paths (disposers,
/// `Drop`) hand work to the host without awaiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Subscribe(String),
    Unsubscribe(String),
    Reveal { uri: DocumentUri, range: Range },
    CopyText(String),
    InsertText(String),
}

impl HostCommand {
    fn label(&self) -> &'static str {
        match self {
            Self::Subscribe(_) => "subscribe",
            Self::Unsubscribe(_) => "unsubscribe",
            Self::Reveal { .. } => "reveal",
            Self::CopyText(_) => "copy",
            Self::InsertText(_) => "insert",
        }
    }
}

/// Execute queued host calls in order until every sender is gone.
///
/// Rejections are logged and never reach the caller that queued them.
pub async fn run_host_pump(
    host: Rc<dyn EditorHost>,
    mut rx: mpsc::UnboundedReceiver<HostCommand>,
) {
    while let Some(command) = rx.recv().await {
        let result = match &command {
            HostCommand::Subscribe(method) => host.subscribe_notifications(method).await,
            HostCommand::Unsubscribe(method) => host.unsubscribe_notifications(method).await,
            HostCommand::Reveal { uri, range } => host.reveal_location(uri, *range).await,
            HostCommand::CopyText(text) => host.copy_to_clipboard(text).await,
            HostCommand::InsertText(text) => host.insert_text(text).await,
        };
        if let Err(e) = result {
            tracing::warn!(call = command.label(), error = %e, "Host call failed");
        }
    }
    tracing::debug!("Host command queue closed");
}
