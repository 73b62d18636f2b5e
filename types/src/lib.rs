//! Core domain types for the infoview sync engine.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod action;
mod diagnostic;
mod goal;
mod options;
mod pins;
mod position;
mod progress;

pub use action::InfoviewAction;
pub use diagnostic::{Diagnostic, DiagnosticSeverity};
pub use goal::GoalArtifact;
pub use options::DisplayOptions;
pub use pins::PinSet;
pub use position::{DocumentPosition, DocumentUri, InvalidRangeError, Position, Range};
pub use progress::FileProgress;
