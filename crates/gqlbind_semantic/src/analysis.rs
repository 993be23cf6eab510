//! The front half of a generation run: parse, build, validate, bind.

use crate::binder::{self, BoundFragmentDefinition, BoundOperation};
use crate::checker;
use crate::hir::HirDocument;
use crate::lower::lower;
use crate::types::{BuildResult, TypeRegistry};
use gqlbind_core::{DiagnosticBag, Interner, SourceId};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// One input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub id: SourceId,
    pub path: String,
    pub text: String,
}

impl SourceDocument {
    /// Creates a document whose id is its position in the input list.
    pub fn new(index: usize, path: impl Into<String>, text: impl Into<String>) -> Self {
        let raw = u32::try_from(index).unwrap_or(u32::MAX - 1);
        Self {
            id: SourceId::from_raw(raw),
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Everything the generator needs from the front half.
#[derive(Debug)]
pub struct Analysis {
    /// Frozen unless `diagnostics` holds fatal entries.
    pub registry: TypeRegistry,
    /// Ordered by name.
    pub operations: Vec<BoundOperation>,
    pub fragments: BTreeMap<String, BoundFragmentDefinition>,
    /// Sorted by location.
    pub diagnostics: DiagnosticBag,
}

impl Analysis {
    /// Returns true if generation may run.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors() && self.registry.is_frozen()
    }
}

/// Parses and lowers every document, one rayon task per document.
///
/// Each task owns its interner, so only owned HIR crosses threads.
pub fn parse_documents(sources: &[SourceDocument]) -> (Vec<HirDocument>, DiagnosticBag) {
    let parsed: Vec<(HirDocument, DiagnosticBag)> = sources
        .par_iter()
        .map(|source| {
            let interner = Interner::new();
            let result = gqlbind_syntax::parse(&source.text, source.id, &interner);
            let document = lower(&result.document, source.id, &interner);
            (document, result.diagnostics)
        })
        .collect();

    let mut diagnostics = DiagnosticBag::new();
    let mut documents = Vec::with_capacity(parsed.len());
    for (document, document_diagnostics) in parsed {
        diagnostics.append(document_diagnostics);
        documents.push(document);
    }
    (documents, diagnostics)
}

/// Runs parse, registry build, validation and binding.
///
/// Syntax errors stop the run before the registry is built. Registry and
/// validation errors are collected into one batch; binding only runs on a
/// registry that could be frozen.
pub fn analyze(sources: &[SourceDocument]) -> Analysis {
    let span = tracing::debug_span!("analyze", documents = sources.len());
    let _enter = span.enter();

    let (documents, mut diagnostics) = parse_documents(sources);
    if diagnostics.has_errors() {
        tracing::debug!(errors = diagnostics.error_count(), "syntax errors");
        diagnostics.sort();
        return Analysis {
            registry: TypeRegistry::new(),
            operations: Vec::new(),
            fragments: BTreeMap::new(),
            diagnostics,
        };
    }

    let BuildResult {
        mut registry,
        diagnostics: build_diagnostics,
    } = TypeRegistry::build(&documents);
    diagnostics.append(build_diagnostics);
    diagnostics.append(checker::validate(&registry).diagnostics);

    if diagnostics.has_errors() {
        tracing::debug!(errors = diagnostics.error_count(), "schema errors");
        diagnostics.sort();
        return Analysis {
            registry,
            operations: Vec::new(),
            fragments: BTreeMap::new(),
            diagnostics,
        };
    }

    registry.freeze();
    let bound = binder::bind(&registry, &documents);
    diagnostics.append(bound.diagnostics);
    diagnostics.sort();

    Analysis {
        registry,
        operations: bound.operations,
        fragments: bound.fragments,
        diagnostics,
    }
}
