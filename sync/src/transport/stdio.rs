//! JSON-RPC connection to the editor host over a byte stream pair.
//!
//! [`StdioHost`] plays both external roles: it is the [`EditorHost`] (host
//! calls are JSON-RPC requests) and the [`GoalWorker`] (worker requests are
//! sent to the host, which forwards them verbatim). Inbound notifications
//! are handed to the caller on a channel.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use infoview_types::{DocumentPosition, DocumentUri, GoalArtifact, Range};

use crate::error::{HostError, WorkerError};
use crate::host::{EditorHost, GoalWorker, LocalFut};
use crate::protocol::{self, Request, ResponseError};
use crate::transport::framing::{FrameError, FrameReader, FrameWriter};

const REQUEST_TIMEOUT_SECS: u64 = 30;

type Pending = Rc<RefCell<HashMap<u64, oneshot::Sender<serde_json::Value>>>>;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

enum IncomingFrame {
    Response {
        id: u64,
        body: serde_json::Value,
    },
    HostRequest {
        id: serde_json::Value,
        method: String,
    },
    Notification {
        method: String,
        params: serde_json::Value,
    },
}

/// A notification pushed by the host, not yet routed.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundNotification {
    pub method: String,
    pub params: serde_json::Value,
}

fn parse_incoming(frame: &serde_json::Value) -> Option<IncomingFrame> {
    let id = frame.get("id");
    let method = frame
        .get("method")
        .and_then(|m| m.as_str())
        .map(String::from);
    let has_result_or_error = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method, has_result_or_error) {
        (Some(id), None, true) => Some(IncomingFrame::Response {
            id: id.as_u64()?,
            body: frame.clone(),
        }),
        (Some(id), Some(method), _) => Some(IncomingFrame::HostRequest {
            id: id.clone(),
            method,
        }),
        (None, Some(method), _) => Some(IncomingFrame::Notification {
            method,
            params: frame
                .get("params")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        }),
        _ => None,
    }
}

enum CallError {
    Response(ResponseError),
    Transport(String),
}

pub struct StdioHost {
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    next_id: Cell<u64>,
    pending: Pending,
    /// Set once the host stops sending.
    closed: Rc<Cell<bool>>,
}

impl StdioHost {
    /// Spawn the reader and writer tasks on the current `LocalSet`.
    ///
    /// The returned receiver yields inbound notifications and closes when
    /// the input stream ends or becomes unreadable; outstanding requests
    /// then fail with a transport error.
    pub fn spawn<R, W>(input: R, output: W) -> (Rc<Self>, mpsc::UnboundedReceiver<InboundNotification>)
    where
        R: AsyncRead + Unpin + 'static,
        W: AsyncWrite + Unpin + 'static,
    {
        let pending: Pending = Rc::new(RefCell::new(HashMap::new()));
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        tokio::task::spawn_local(async move {
            let mut writer = FrameWriter::new(output);
            while let Some(command) = writer_rx.recv().await {
                match command {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            tracing::warn!(error = %e, "Write to host failed");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let closed = Rc::new(Cell::new(false));
        let reader_closed = closed.clone();
        let reader_pending = pending.clone();
        let reader_writer_tx = writer_tx.clone();
        tokio::task::spawn_local(async move {
            let mut reader = FrameReader::new(input);
            loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => {
                        dispatch_frame(&frame, &reader_pending, &reader_writer_tx, &notify_tx);
                    }
                    Ok(None) => {
                        tracing::info!("Host closed the input stream");
                        break;
                    }
                    // The body was consumed, so the stream is still aligned.
                    Err(FrameError::Json(e)) => {
                        tracing::warn!(error = %e, "Skipping malformed frame from host");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reading from host failed");
                        break;
                    }
                }
            }
            reader_closed.set(true);
            // Waiters see their sender dropped.
            reader_pending.borrow_mut().clear();
        });

        let host = Rc::new(Self {
            writer_tx,
            next_id: Cell::new(1),
            pending,
            closed,
        });
        (host, notify_rx)
    }

    /// Stop writing. Queued frames ahead of the shutdown are still sent.
    pub fn close(&self) {
        let _ = self.writer_tx.send(WriterCommand::Shutdown);
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, CallError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().insert(id, tx);

        let frame = serde_json::to_value(Request::new(id, method, Some(params)))
            .map_err(|e| CallError::Transport(format!("serializing request: {e}")))?;
        if self.writer_tx.send(WriterCommand::Send(frame)).is_err() {
            self.pending.borrow_mut().remove(&id);
            return Err(CallError::Transport("writer channel closed".to_string()));
        }
        // No response can arrive any more; the frame is still written.
        if self.closed.get() {
            self.pending.borrow_mut().remove(&id);
            return Err(CallError::Transport("connection closed".to_string()));
        }

        let body = match tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), rx).await {
            Ok(Ok(body)) => body,
            Ok(Err(_)) => {
                self.pending.borrow_mut().remove(&id);
                return Err(CallError::Transport("connection closed".to_string()));
            }
            Err(_) => {
                self.pending.borrow_mut().remove(&id);
                tracing::warn!(method, id, "Request to host timed out");
                return Err(CallError::Transport(format!("{method} timed out")));
            }
        };
        protocol::split_response(&body).map_err(CallError::Response)
    }

    async fn host_call(&self, method: &str, params: serde_json::Value) -> Result<(), HostError> {
        match self.call(method, params).await {
            Ok(_) => Ok(()),
            Err(CallError::Response(e)) => Err(HostError::Rejected {
                method: method.to_string(),
                code: e.code,
                message: e.message,
            }),
            Err(CallError::Transport(e)) => Err(HostError::Transport(e)),
        }
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }
}

fn dispatch_frame(
    frame: &serde_json::Value,
    pending: &Pending,
    writer_tx: &mpsc::UnboundedSender<WriterCommand>,
    notify_tx: &mpsc::UnboundedSender<InboundNotification>,
) {
    let Some(incoming) = parse_incoming(frame) else {
        tracing::trace!("Ignoring malformed JSON-RPC frame");
        return;
    };

    match incoming {
        IncomingFrame::Response { id, body } => {
            let sender = pending.borrow_mut().remove(&id);
            match sender {
                Some(tx) => {
                    let _ = tx.send(body);
                }
                None => tracing::trace!(id, "Response for unknown request"),
            }
        }
        IncomingFrame::HostRequest { id, method } => {
            tracing::debug!(method = %method, "Host sent a request; replying method not found");
            let response = serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": protocol::METHOD_NOT_FOUND,
                    "message": format!("Method not found: {method}")
                }
            });
            let _ = writer_tx.send(WriterCommand::Send(response));
        }
        IncomingFrame::Notification { method, params } => {
            let _ = notify_tx.send(InboundNotification { method, params });
        }
    }
}

impl EditorHost for StdioHost {
    fn subscribe_notifications<'a>(
        &'a self,
        method: &'a str,
    ) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(self.host_call(protocol::host::SUBSCRIBE, protocol::subscribe_params(method)))
    }

    fn unsubscribe_notifications<'a>(
        &'a self,
        method: &'a str,
    ) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(self.host_call(protocol::host::UNSUBSCRIBE, protocol::subscribe_params(method)))
    }

    fn reveal_location<'a>(
        &'a self,
        uri: &'a DocumentUri,
        range: Range,
    ) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(self.host_call(
            protocol::host::REVEAL_LOCATION,
            protocol::reveal_location_params(uri, range),
        ))
    }

    fn copy_to_clipboard<'a>(&'a self, text: &'a str) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(self.host_call(
            protocol::host::COPY_TO_CLIPBOARD,
            protocol::copy_to_clipboard_params(text),
        ))
    }

    fn insert_text<'a>(&'a self, text: &'a str) -> LocalFut<'a, Result<(), HostError>> {
        Box::pin(self.host_call(protocol::host::INSERT_TEXT, protocol::insert_text_params(text)))
    }
}

impl GoalWorker for StdioHost {
    fn request<'a>(
        &'a self,
        method: &'a str,
        pos: &'a DocumentPosition,
    ) -> LocalFut<'a, Result<Option<GoalArtifact>, WorkerError>> {
        Box::pin(async move {
            let params = protocol::text_document_position_params(pos);
            match self.call(method, params).await {
                Ok(serde_json::Value::Null) => Ok(None),
                Ok(result) => Ok(Some(GoalArtifact::new(result))),
                Err(CallError::Response(e)) => Err(WorkerError::from_response(e.code, e.message)),
                Err(CallError::Transport(e)) => Err(WorkerError::Transport(e)),
            }
        })
    }
}
