//! Core utilities for gqlbind.
//!
//! This crate provides foundational types used throughout gqlbind:
//! - `span`: Source location tracking
//! - `text`: Name interning
//! - `diagnostics`: Error reporting

pub mod diagnostics;
pub mod span;
pub mod text;

pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, FatalDiagnostics, Label};
pub use span::{Location, SourceId, Span};
pub use text::{Interner, Text};
