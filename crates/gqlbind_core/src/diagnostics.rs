//! Diagnostic reporting for gqlbind.

use crate::span::Location;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagnostic severity level.
///
/// `Error` is the fatal tier: a batch containing any error blocks registry
/// freeze and code generation. Every other level is reported only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DiagnosticSeverity {
    /// An error that prevents generation.
    Error,
    /// A warning that doesn't prevent generation.
    Warning,
    /// An informational message.
    Info,
    /// A hint or suggestion.
    Hint,
}

impl DiagnosticSeverity {
    /// Returns true for the fatal tier.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// A label attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label {
    /// The location this label points to.
    pub location: Location,
    /// The label message.
    pub message: String,
}

impl Label {
    /// Creates a new label.
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    /// Severity level.
    pub severity: DiagnosticSeverity,
    /// Error code.
    pub code: String,
    /// Short title.
    pub title: String,
    /// Detailed message.
    pub message: Option<String>,
    /// Labels pointing to source locations.
    pub labels: Vec<Label>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code: code.into(),
            title: title.into(),
            message: None,
            labels: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            code: code.into(),
            title: title.into(),
            message: None,
            labels: Vec::new(),
        }
    }

    /// Adds a message to the diagnostic.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a label to the diagnostic.
    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a primary label at a location.
    #[must_use]
    pub fn with_location(mut self, location: Location, message: impl Into<String>) -> Self {
        self.labels.push(Label::new(location, message));
        self
    }

    /// Returns the primary location, if any.
    pub fn primary_location(&self) -> Option<Location> {
        self.labels.first().map(|l| l.location)
    }

    /// Returns true if this diagnostic blocks generation.
    pub fn is_fatal(&self) -> bool {
        self.severity.is_fatal()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.title)?;
        let detail = self
            .message
            .as_deref()
            .or_else(|| self.labels.first().map(|l| l.message.as_str()));
        if let Some(detail) = detail.filter(|d| !d.is_empty()) {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// A collection of diagnostics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Creates a new empty diagnostic bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Adds an error diagnostic.
    pub fn error(
        &mut self,
        code: impl Into<String>,
        title: impl Into<String>,
        location: Location,
        message: impl Into<String>,
    ) {
        self.add(Diagnostic::error(code, title).with_location(location, message));
    }

    /// Adds a warning diagnostic.
    pub fn warning(
        &mut self,
        code: impl Into<String>,
        title: impl Into<String>,
        location: Location,
        message: impl Into<String>,
    ) {
        self.add(Diagnostic::warning(code, title).with_location(location, message));
    }

    /// Moves every diagnostic of `other` into this bag.
    pub fn append(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_fatal()).count()
    }

    /// Returns an iterator over all diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Returns an iterator over errors.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_fatal())
    }

    /// Returns an iterator over warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// Returns an iterator over the diagnostics carrying `code`.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// Sorts diagnostics by location, then code.
    ///
    /// Stages that run in parallel push in nondeterministic order; reports
    /// are sorted before they are shown.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.primary_location()
                .cmp(&b.primary_location())
                .then_with(|| a.code.cmp(&b.code))
                .then_with(|| a.title.cmp(&b.title))
        });
    }

    /// Returns true if there are no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Consumes the bag.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Extend<Diagnostic> for DiagnosticBag {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

/// Returned when a stage refuses to continue because of fatal diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("{} fatal diagnostic(s) reported", .0.error_count())]
pub struct FatalDiagnostics(pub DiagnosticBag);

/// Common diagnostic codes.
pub mod codes {
    // Syntax (produced by the parse-tree source).
    pub const UNEXPECTED_TOKEN: &str = "E0001";
    pub const UNEXPECTED_EOF: &str = "E0002";
    pub const INVALID_SYNTAX: &str = "E0003";

    // Registry.
    pub const UNKNOWN_TYPE: &str = "E0010";
    pub const UNKNOWN_FIELD: &str = "E0011";
    pub const DUPLICATE_TYPE: &str = "E0012";
    pub const DUPLICATE_FIELD: &str = "E0013";
    pub const DUPLICATE_NAME: &str = "E0014";
    pub const KIND_MISMATCH: &str = "E0015";
    pub const REGISTRY_FROZEN: &str = "E0016";
    pub const RESERVED_NAME: &str = "E0017";
    pub const EMPTY_DEFINITION: &str = "E0018";

    // Conformance and directives.
    pub const CONFORMANCE: &str = "E0020";
    pub const UNKNOWN_DIRECTIVE: &str = "E0030";
    pub const DIRECTIVE_LOCATION: &str = "E0031";
    pub const REPEATED_DIRECTIVE: &str = "E0032";

    // Operations.
    pub const UNKNOWN_ARGUMENT: &str = "E0040";
    pub const MISSING_ARGUMENT: &str = "E0041";
    pub const INVALID_VALUE: &str = "E0042";
    pub const UNDEFINED_VARIABLE: &str = "E0043";
    pub const VARIABLE_MISMATCH: &str = "E0044";
    pub const UNKNOWN_FRAGMENT: &str = "E0045";
    pub const FRAGMENT_CONDITION: &str = "E0046";
    pub const FRAGMENT_CYCLE: &str = "E0047";
    pub const SELECTION_SHAPE: &str = "E0048";
    pub const FIELD_CONFLICT: &str = "E0049";
    pub const MISSING_ROOT: &str = "E0050";
    pub const ANONYMOUS_OPERATION: &str = "E0051";

    // Warnings.
    pub const UNUSED_FRAGMENT: &str = "W0001";
    pub const UNUSED_VARIABLE: &str = "W0002";
    pub const DEPRECATED_USAGE: &str = "W0003";
    pub const UNMAPPED_SCALAR: &str = "W0004";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{SourceId, Span};

    fn at(start: u32, end: u32) -> Location {
        Location::new(SourceId::from_raw(0), Span::new(start, end))
    }

    #[test]
    fn test_diagnostic_bag() {
        let mut bag = DiagnosticBag::new();
        bag.error("E001", "test error", at(0, 10), "details");
        bag.warning("W001", "test warning", at(0, 10), "details");

        assert!(bag.has_errors());
        assert_eq!(bag.error_count(), 1);
        assert_eq!(bag.warnings().count(), 1);
    }

    #[test]
    fn test_warnings_are_not_fatal() {
        let mut bag = DiagnosticBag::new();
        bag.warning(codes::UNUSED_FRAGMENT, "unused", at(0, 1), "details");
        assert!(!bag.has_errors());
    }

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::error("E001", "Test")
            .with_message("Details")
            .with_location(at(0, 5), "here");

        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.primary_location(), Some(at(0, 5)));
        assert_eq!(diag.to_string(), "[E001] Test: Details");
    }

    #[test]
    fn test_display_falls_back_to_label() {
        let diag = Diagnostic::warning("W9", "Unused").with_location(at(0, 1), "`x` is never used");
        assert_eq!(diag.to_string(), "[W9] Unused: `x` is never used");
    }

    #[test]
    fn test_sort_is_by_location() {
        let mut bag = DiagnosticBag::new();
        bag.error("E2", "second", at(10, 12), "");
        bag.error("E1", "first", at(1, 2), "");
        bag.sort();
        let codes: Vec<_> = bag.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["E1", "E2"]);
    }
}
