//! Error taxonomy for host calls and worker requests.

use thiserror::Error;

use crate::protocol;

/// Failure of a goal request sent to the remote worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The document changed between request and response. Never shown to
    /// the user; the orchestrator retries silently.
    #[error("document changed while the request was in flight")]
    StaleDocument,
    #[error("{message}")]
    Failed { code: i64, message: String },
    #[error("worker transport failed: {0}")]
    Transport(String),
}

impl WorkerError {
    /// Map a JSON-RPC error response onto the taxonomy.
    ///
    /// Only the content-modified code means "stale"; every other code,
    /// known or not, is a generic failure.
    #[must_use]
    pub fn from_response(code: i64, message: impl Into<String>) -> Self {
        if code == protocol::CONTENT_MODIFIED {
            Self::StaleDocument
        } else {
            Self::Failed {
                code,
                message: message.into(),
            }
        }
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleDocument)
    }
}

/// Failure of an outbound call to the editor host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host rejected {method}: {message} ({code})")]
    Rejected {
        method: String,
        code: i64,
        message: String,
    },
    #[error("host transport failed: {0}")]
    Transport(String),
}
