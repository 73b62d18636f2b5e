use serde::{Deserialize, Serialize};

use crate::position::{DocumentUri, Range};

/// Ranges of a document the remote worker is still processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProgress {
    pub uri: DocumentUri,
    pub processing: Vec<Range>,
}

impl FileProgress {
    #[must_use]
    pub fn new(uri: DocumentUri, processing: Vec<Range>) -> Self {
        Self { uri, processing }
    }

    /// The worker is busy with this document while any range is pending.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.processing.is_empty()
    }
}
