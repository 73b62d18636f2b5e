//! Diagnostics aggregator - keeps the latest diagnostic batch per document.
//!
//! Every publish replaces the whole mapping with a new [`DiagnosticsSnapshot`];
//! the previous snapshot is never touched, so views can compare snapshots
//! with [`DiagnosticsSnapshot::ptr_eq`] to skip work when nothing changed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use infoview_types::{Diagnostic, DiagnosticSeverity, DocumentPosition, DocumentUri};

use crate::bus::{EventEmitter, Subscription};

type Batches = HashMap<DocumentUri, Rc<[Diagnostic]>>;

/// Immutable view of all published diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    files: Rc<Batches>,
}

impl DiagnosticsSnapshot {
    /// The batch for `uri`; empty when nothing was ever published for it.
    #[must_use]
    pub fn get(&self, uri: &DocumentUri) -> Rc<[Diagnostic]> {
        self.files
            .get(uri)
            .cloned()
            .unwrap_or_else(|| Rc::from(Vec::new()))
    }

    /// Diagnostics in `pos`'s document whose range contains `pos`.
    ///
    /// With `all_errors_on_line`, anything touching the cursor line matches
    /// regardless of column.
    #[must_use]
    pub fn filter_for(&self, pos: &DocumentPosition, all_errors_on_line: bool) -> Vec<Diagnostic> {
        self.get(pos.uri())
            .iter()
            .filter(|d| d.range().contains(pos.position(), all_errors_on_line))
            .cloned()
            .collect()
    }

    /// Same snapshot, not merely equal contents.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.files, &other.files)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Documents with diagnostics: documents with errors first, then by uri.
    #[must_use]
    pub fn files(&self) -> Vec<(DocumentUri, Rc<[Diagnostic]>)> {
        let mut files: Vec<(DocumentUri, Rc<[Diagnostic]>)> = self
            .files
            .iter()
            .map(|(uri, items)| (uri.clone(), items.clone()))
            .collect();
        files.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(Diagnostic::is_error);
            let b_has_errors = b.1.iter().any(Diagnostic::is_error);
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });
        files
    }

    fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.files
            .values()
            .flat_map(|items| items.iter())
            .filter(|d| d.severity() == Some(severity))
            .count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticSeverity::Error)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(DiagnosticSeverity::Warning)
    }

    /// Compact summary such as `E:1 W:2`; empty when there is nothing to report.
    #[must_use]
    pub fn status_string(&self) -> String {
        let errors = self.error_count();
        let warnings = self.warning_count();
        match (errors, warnings) {
            (0, 0) => String::new(),
            (e, 0) => format!("E:{e}"),
            (0, w) => format!("W:{w}"),
            (e, w) => format!("E:{e} W:{w}"),
        }
    }
}

/// Sole writer of the diagnostics snapshot.
///
/// Cloning yields another handle to the same aggregator.
#[derive(Clone)]
pub struct DiagnosticsAggregator {
    current: Rc<RefCell<DiagnosticsSnapshot>>,
    updates: EventEmitter<DiagnosticsSnapshot>,
}

impl Default for DiagnosticsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Rc::new(RefCell::new(DiagnosticsSnapshot::default())),
            updates: EventEmitter::new("diagnostics"),
        }
    }

    /// Replace the batch for `uri` and publish the new snapshot.
    ///
    /// An empty batch drops the document from the mapping.
    pub fn publish(&self, uri: DocumentUri, diagnostics: Vec<Diagnostic>) -> DiagnosticsSnapshot {
        let mut files: Batches = (*self.current.borrow().files).clone();
        tracing::debug!(uri = %uri, count = diagnostics.len(), "Diagnostics published");
        if diagnostics.is_empty() {
            files.remove(&uri);
        } else {
            files.insert(uri, Rc::from(diagnostics));
        }

        let next = DiagnosticsSnapshot {
            files: Rc::new(files),
        };
        *self.current.borrow_mut() = next.clone();
        self.updates.fire(next.clone());
        next
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.current.borrow().clone()
    }

    pub fn on_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DiagnosticsSnapshot) -> anyhow::Result<()> + 'static,
    {
        self.updates.subscribe(handler)
    }
}
