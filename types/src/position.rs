//! Positions, ranges and document locations.
//!
//! Lines and characters are 0-indexed on the wire and in memory; only
//! [`DocumentPosition`]'s `Display` impl shifts them to 1-indexed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A caret location inside a document, without the document identity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Error)]
#[error("range end {end:?} precedes start {start:?}")]
pub struct InvalidRangeError {
    start: Position,
    end: Position,
}

/// A start/end pair. Both ends are inclusive for [`Range::contains`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Construct a range, rejecting an end that precedes the start.
    pub fn try_new(start: Position, end: Position) -> Result<Self, InvalidRangeError> {
        if end < start {
            return Err(InvalidRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether `pos` falls inside this range.
    ///
    /// With `ignore_character`, only the line span is checked, so every
    /// column of every covered line matches.
    #[must_use]
    pub fn contains(&self, pos: Position, ignore_character: bool) -> bool {
        if !ignore_character {
            if pos.line == self.start.line && pos.character < self.start.character {
                return false;
            }
            if pos.line == self.end.line && pos.character > self.end.character {
                return false;
            }
        }
        self.start.line <= pos.line && pos.line <= self.end.line
    }
}

/// Identity of a document as reported by the editor host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUri(String);

impl DocumentUri {
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentUri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A caret location within a specific document.
///
/// Immutable once constructed; a cursor move produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentPosition {
    uri: DocumentUri,
    position: Position,
}

impl DocumentPosition {
    #[must_use]
    pub fn new(uri: DocumentUri, position: Position) -> Self {
        Self { uri, position }
    }

    #[must_use]
    pub fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.position.line
    }

    #[must_use]
    pub fn character(&self) -> u32 {
        self.position.character
    }
}

impl fmt::Display for DocumentPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.uri,
            self.position.line + 1,
            self.position.character + 1
        )
    }
}
