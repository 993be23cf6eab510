//! Diagnostic rendering: miette reports for people, JSON for tools.

use clap::ValueEnum;
use colored::Colorize;
use gqlbind_core::{Diagnostic, DiagnosticBag, DiagnosticSeverity, SourceId};
use gqlbind_semantic::SourceDocument;
use miette::{LabeledSpan, MietteDiagnostic, NamedSource, Severity};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Graphical reports on stderr
    #[default]
    Human,
    /// One JSON document on stdout
    Json,
}

/// One-based line and column of a byte offset.
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count();
    let column = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(offset, |pos| offset - pos - 1);
    (line + 1, column + 1)
}

#[derive(Debug, Serialize)]
pub struct LabelRecord<'a> {
    pub file: &'a str,
    pub line: usize,
    pub column: usize,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticRecord<'a> {
    pub severity: DiagnosticSeverity,
    pub code: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    pub labels: Vec<LabelRecord<'a>>,
}

/// The `--format json` document.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<DiagnosticRecord<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

pub struct Reporter<'a> {
    sources: &'a [SourceDocument],
}

impl<'a> Reporter<'a> {
    pub fn new(sources: &'a [SourceDocument]) -> Self {
        Self { sources }
    }

    fn source(&self, id: SourceId) -> Option<&'a SourceDocument> {
        let index = usize::try_from(id.as_raw()).ok()?;
        self.sources.get(index).filter(|source| source.id == id)
    }

    pub fn record(&self, diagnostic: &'a Diagnostic) -> DiagnosticRecord<'a> {
        let labels = diagnostic
            .labels
            .iter()
            .filter_map(|label| {
                let source = self.source(label.location.source)?;
                let (line, column) = line_column(&source.text, label.location.span.start as usize);
                Some(LabelRecord {
                    file: &source.path,
                    line,
                    column,
                    message: &label.message,
                })
            })
            .collect();

        DiagnosticRecord {
            severity: diagnostic.severity,
            code: &diagnostic.code,
            title: &diagnostic.title,
            message: diagnostic.message.as_deref(),
            labels,
        }
    }

    pub fn json(&self, diagnostics: &'a DiagnosticBag, files: Vec<String>) -> JsonReport<'a> {
        JsonReport {
            errors: diagnostics.error_count(),
            warnings: diagnostics.warnings().count(),
            diagnostics: diagnostics.iter().map(|d| self.record(d)).collect(),
            files,
        }
    }

    /// Builds a miette report. Labels are shown against the source of the
    /// first label; built-in locations have no source and are dropped.
    pub fn miette(&self, diagnostic: &Diagnostic) -> miette::Report {
        let severity = match diagnostic.severity {
            DiagnosticSeverity::Error => Severity::Error,
            DiagnosticSeverity::Warning => Severity::Warning,
            DiagnosticSeverity::Info | DiagnosticSeverity::Hint => Severity::Advice,
        };
        let mut report = MietteDiagnostic::new(diagnostic.title.clone())
            .with_code(diagnostic.code.clone())
            .with_severity(severity);
        if let Some(message) = &diagnostic.message {
            report = report.with_help(message.clone());
        }

        let primary = diagnostic
            .labels
            .first()
            .and_then(|label| self.source(label.location.source));
        let Some(source) = primary else {
            return miette::Report::new(report);
        };

        let labels = diagnostic
            .labels
            .iter()
            .filter(|label| label.location.source == source.id)
            .map(|label| LabeledSpan::new_with_span(Some(label.message.clone()), label.location.span));
        miette::Report::new(report.with_labels(labels))
            .with_source_code(NamedSource::new(&source.path, source.text.clone()))
    }

    /// Renders every diagnostic to stderr, followed by a summary line.
    /// With `quiet`, only errors are shown.
    pub fn print_human(&self, diagnostics: &DiagnosticBag, quiet: bool) {
        for diagnostic in diagnostics.iter() {
            if quiet && !diagnostic.is_fatal() {
                continue;
            }
            eprintln!("{:?}", self.miette(diagnostic));
        }

        let errors = diagnostics.error_count();
        let warnings = diagnostics.warnings().count();
        if errors > 0 {
            eprintln!(
                "{} {errors} error(s), {warnings} warning(s)",
                "Failed:".red().bold()
            );
        } else if warnings > 0 && !quiet {
            eprintln!("{} {warnings} warning(s)", "Warning:".yellow().bold());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlbind_core::diagnostics::codes;
    use gqlbind_core::{Location, Span};

    fn sources() -> Vec<SourceDocument> {
        vec![SourceDocument::new(0, "schema.graphql", "type Query {\n  foo: Foo\n}\n")]
    }

    fn unknown_foo() -> Diagnostic {
        let location = Location::new(SourceId::from_raw(0), Span::new(20, 23));
        Diagnostic::error(codes::UNKNOWN_TYPE, "unknown type").with_location(location, "type `Foo` is not defined")
    }

    #[test]
    fn test_line_column() {
        let text = "ab\ncd\n";
        assert_eq!(line_column(text, 0), (1, 1));
        assert_eq!(line_column(text, 4), (2, 2));
        assert_eq!(line_column(text, 100), (3, 1));
    }

    #[test]
    fn test_record_points_at_file() {
        let sources = sources();
        let reporter = Reporter::new(&sources);
        let diagnostic = unknown_foo();
        let record = reporter.record(&diagnostic);

        assert_eq!(record.code, "E0010");
        assert_eq!(record.labels.len(), 1);
        assert_eq!(record.labels[0].file, "schema.graphql");
        assert_eq!((record.labels[0].line, record.labels[0].column), (2, 8));
    }

    #[test]
    fn test_json_report() {
        let sources = sources();
        let reporter = Reporter::new(&sources);
        let mut bag = DiagnosticBag::new();
        bag.add(unknown_foo());
        bag.add(Diagnostic::warning(codes::UNMAPPED_SCALAR, "unmapped scalar").with_location(Location::builtin(), "x"));

        let value = serde_json::to_value(reporter.json(&bag, Vec::new())).unwrap();
        assert_eq!(value["errors"], 1);
        assert_eq!(value["warnings"], 1);
        assert_eq!(value["diagnostics"][0]["severity"], "error");
        assert_eq!(value["diagnostics"][0]["labels"][0]["message"], "type `Foo` is not defined");
        assert_eq!(value["diagnostics"][1]["labels"], serde_json::json!([]));
        assert!(value.get("files").is_none());
    }

    #[test]
    fn test_miette_report_keeps_code() {
        let sources = sources();
        let reporter = Reporter::new(&sources);
        let report = reporter.miette(&unknown_foo());
        assert_eq!(report.to_string(), "unknown type");
        assert_eq!(report.code().map(|c| c.to_string()).as_deref(), Some("E0010"));
    }
}
