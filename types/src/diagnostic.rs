//! Diagnostics as published by the remote worker.

use serde::{Deserialize, Serialize};

use crate::position::Range;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    /// Convert from LSP numeric severity (1=Error, 2=Warning, 3=Info, 4=Hint).
    ///
    /// Returns `None` for values outside the LSP-defined range.
    #[must_use]
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_lsp(self) -> u64 {
        self as u64
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

/// Wire shape of a diagnostic. Unknown severities are dropped at this
/// boundary instead of failing the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDiagnostic {
    range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    full_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    severity: Option<u64>,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<serde_json::Value>,
}

/// A single diagnostic from the remote worker.
///
/// Fields are private; external consumers read via accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireDiagnostic", into = "WireDiagnostic")]
pub struct Diagnostic {
    range: Range,
    full_range: Option<Range>,
    severity: Option<DiagnosticSeverity>,
    message: String,
    source: Option<String>,
    code: Option<serde_json::Value>,
}

impl From<WireDiagnostic> for Diagnostic {
    fn from(wire: WireDiagnostic) -> Self {
        Self {
            range: wire.range,
            full_range: wire.full_range,
            severity: wire.severity.and_then(DiagnosticSeverity::from_lsp),
            message: wire.message,
            source: wire.source,
            code: wire.code,
        }
    }
}

impl From<Diagnostic> for WireDiagnostic {
    fn from(diag: Diagnostic) -> Self {
        Self {
            range: diag.range,
            full_range: diag.full_range,
            severity: diag.severity.map(DiagnosticSeverity::to_lsp),
            message: diag.message,
            source: diag.source,
            code: diag.code,
        }
    }
}

impl Diagnostic {
    #[must_use]
    pub fn new(range: Range, severity: Option<DiagnosticSeverity>, message: String) -> Self {
        Self {
            range,
            full_range: None,
            severity,
            message,
            source: None,
            code: None,
        }
    }

    /// Attach the full (multi-line) extent of the diagnostic.
    #[must_use]
    pub fn with_full_range(mut self, full_range: Range) -> Self {
        self.full_range = Some(full_range);
        self
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    /// The full extent of the diagnostic, falling back to `range` when the
    /// worker did not send one.
    #[must_use]
    pub fn full_range(&self) -> Range {
        self.full_range.unwrap_or(self.range)
    }

    #[must_use]
    pub fn severity(&self) -> Option<DiagnosticSeverity> {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity.is_some_and(DiagnosticSeverity::is_error)
    }
}
