//! Wire shapes for host notifications, host calls and worker requests.

use serde::{Deserialize, Serialize};

use infoview_types::{
    Diagnostic, DocumentPosition, DocumentUri, FileProgress, Position, Range,
};

/// Reserved JSON-RPC code the worker uses when the document changed under a
/// request.
pub const CONTENT_MODIFIED: i64 = -32801;

pub const METHOD_NOT_FOUND: i64 = -32601;

/// Inbound notification methods (host → engine).
pub mod notify {
    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
    pub const FILE_PROGRESS: &str = "$/lean/fileProgress";
    pub const CURSOR_LOCATION: &str = "infoview/cursorLocation";
    pub const CONFIG_CHANGED: &str = "infoview/config";
    pub const ACTION: &str = "infoview/action";
}

/// Worker request methods, forwarded verbatim by the host.
pub mod worker {
    pub const PLAIN_GOAL: &str = "$/lean/plainGoal";
    pub const PLAIN_TERM_GOAL: &str = "$/lean/plainTermGoal";
}

/// Outbound host call methods (engine → host).
pub mod host {
    pub const SUBSCRIBE: &str = "infoview/subscribeNotifications";
    pub const UNSUBSCRIBE: &str = "infoview/unsubscribeNotifications";
    pub const REVEAL_LOCATION: &str = "infoview/revealLocation";
    pub const COPY_TO_CLIPBOARD: &str = "infoview/copyToClipboard";
    pub const INSERT_TEXT: &str = "infoview/insertText";
}

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Split a response frame into its result or its error.
pub(crate) fn split_response(
    body: &serde_json::Value,
) -> Result<serde_json::Value, ResponseError> {
    if let Some(error) = body.get("error") {
        return Err(
            serde_json::from_value(error.clone()).unwrap_or_else(|_| ResponseError {
                code: 0,
                message: error.to_string(),
            }),
        );
    }
    Ok(body
        .get("result")
        .cloned()
        .unwrap_or(serde_json::Value::Null))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublishDiagnosticsParams {
    pub uri: DocumentUri,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileProgressParams {
    pub text_document: TextDocumentIdentifier,
    pub processing: Vec<FileProgressProcessingInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDocumentIdentifier {
    pub uri: DocumentUri,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileProgressProcessingInfo {
    pub range: Range,
}

impl FileProgressParams {
    pub fn into_progress(self) -> FileProgress {
        FileProgress::new(
            self.text_document.uri,
            self.processing.into_iter().map(|p| p.range).collect(),
        )
    }
}

/// Cursor location pushed by the host; the caret is the start of `range`.
#[derive(Debug, Deserialize)]
pub(crate) struct CursorLocationParams {
    pub uri: DocumentUri,
    pub range: Range,
}

impl CursorLocationParams {
    pub fn into_position(self) -> DocumentPosition {
        DocumentPosition::new(self.uri, self.range.start)
    }
}

pub(crate) fn text_document_position_params(pos: &DocumentPosition) -> serde_json::Value {
    let Position { line, character } = pos.position();
    serde_json::json!({
        "textDocument": { "uri": pos.uri() },
        "position": { "line": line, "character": character }
    })
}

pub(crate) fn subscribe_params(method: &str) -> serde_json::Value {
    serde_json::json!({ "method": method })
}

pub(crate) fn reveal_location_params(uri: &DocumentUri, range: Range) -> serde_json::Value {
    serde_json::json!({ "uri": uri, "range": range })
}

pub(crate) fn copy_to_clipboard_params(text: &str) -> serde_json::Value {
    serde_json::json!({ "text": text })
}

pub(crate) fn insert_text_params(text: &str) -> serde_json::Value {
    serde_json::json!({ "text": text, "kind": "above" })
}
