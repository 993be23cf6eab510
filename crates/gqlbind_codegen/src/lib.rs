//! Client code generation for gqlbind.
//!
//! This crate turns a checked [`Analysis`] into client code for:
//! - TypeScript
//! - Rust (serde)
//! - Kotlin (kotlinx.serialization)
//!
//! Every target gets one file per schema type, one file per operation, a
//! runtime support file and an index file. Output is a pure function of the
//! analysis and the options: the same input always yields byte-identical
//! files in the same order.
//!
//! # Example
//!
//! ```ignore
//! use gqlbind_codegen::{CodeGenerator, Language};
//!
//! let analysis = gqlbind_semantic::analyze(&sources);
//! let output = CodeGenerator::new(&analysis).generate(Language::TypeScript)?;
//! ```

mod kotlin;
mod mapping;
mod naming;
mod rust;
mod shape;
mod typescript;
mod writer;

pub use mapping::ScalarMapping;

use gqlbind_core::{diagnostics::codes, DiagnosticBag, FatalDiagnostics};
use gqlbind_semantic::hir::{deprecation, DirectiveUsage, TypeDefinition, TypeKind, TypeReference, Value};
use gqlbind_semantic::{Analysis, BoundOperation, TypeRegistry};
use kotlin::KotlinGenerator;
use mapping::ScalarTarget;
use rust::RustGenerator;
use shape::{Names, ShapePlan};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use typescript::TypeScriptGenerator;

/// First line of every generated file, behind the target's comment marker.
pub const GENERATED_HEADER: &str = "Generated by gqlbind. Do not edit.";

/// Names the runtime file declares in every target.
const RUNTIME_NAMES: [&str; 7] = [
    "JsonValue",
    "Decoder",
    "Encoder",
    "GraphQLRequest",
    "ShapeMismatchError",
    "GraphQLJson",
    "GraphQLOperations",
];

/// Target language for code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    Rust,
    Kotlin,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Rust => "rust",
            Self::Kotlin => "kotlin",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Ok(Self::TypeScript),
            "rust" | "rs" => Ok(Self::Rust),
            "kotlin" | "kt" => Ok(Self::Kotlin),
            _ => Err(CodegenError::UnknownLanguage(s.to_string())),
        }
    }
}

/// Code generation options.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenOptions {
    /// Package or module name written into generated files.
    pub package_name: String,
    /// Mappings for custom scalars, by scalar name.
    pub scalars: BTreeMap<String, ScalarMapping>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            package_name: "generated".to_string(),
            scalars: BTreeMap::new(),
        }
    }
}

/// Errors that stop generation.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error(transparent)]
    Fatal(#[from] FatalDiagnostics),

    #[error("the type registry is not frozen")]
    RegistryNotFrozen,

    #[error("invalid mapping for scalar `{name}`: {reason}")]
    InvalidScalarMapping { name: String, reason: String },

    #[error("unknown target language `{0}` (expected typescript, rust or kotlin)")]
    UnknownLanguage(String),

    #[error("`{name}` would be generated twice; rename the type or operation")]
    NameCollision { name: String },
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory, `/`-separated.
    pub path: String,
    pub contents: String,
}

/// The result of a successful generation.
#[derive(Debug, Clone)]
pub struct GeneratedOutput {
    pub files: Vec<GeneratedFile>,
    /// Warnings raised while generating.
    pub diagnostics: DiagnosticBag,
}

/// What a generated file declares. Files are ordered by kind, then name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeclarationKind {
    Scalar,
    Enum,
    InputObject,
    Interface,
    Object,
    Union,
    Operation,
}

/// A schema type or an operation that gets its own file.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Declaration<'a> {
    Type(&'a TypeDefinition),
    Operation(&'a BoundOperation),
}

impl<'a> Declaration<'a> {
    pub(crate) fn kind(&self) -> DeclarationKind {
        match self {
            Self::Type(def) => match def.kind() {
                TypeKind::Scalar => DeclarationKind::Scalar,
                TypeKind::Enum => DeclarationKind::Enum,
                TypeKind::InputObject => DeclarationKind::InputObject,
                TypeKind::Interface => DeclarationKind::Interface,
                TypeKind::Object => DeclarationKind::Object,
                TypeKind::Union => DeclarationKind::Union,
            },
            Self::Operation(_) => DeclarationKind::Operation,
        }
    }

    pub(crate) fn name(&self) -> &'a str {
        match self {
            Self::Type(def) => def.name(),
            Self::Operation(op) => &op.name,
        }
    }
}

/// Shared state every backend reads from.
#[derive(Clone, Copy)]
pub(crate) struct Context<'a> {
    pub registry: &'a TypeRegistry,
    pub options: &'a CodegenOptions,
    pub language: Language,
}

impl<'a> Context<'a> {
    /// Resolves a scalar's target representation; `None` for non-scalars.
    pub(crate) fn scalar(&self, name: &str) -> Option<ScalarTarget<'a>> {
        if self.registry.kind_of(name) != Some(TypeKind::Scalar) {
            return None;
        }
        Some(mapping::resolve(self.language, name, &self.options.scalars))
    }

    pub(crate) fn kind(&self, name: &str) -> Option<TypeKind> {
        self.registry.kind_of(name)
    }

    pub(crate) fn is_composite(&self, name: &str) -> bool {
        self.kind(name).is_some_and(TypeKind::is_composite)
    }
}

/// The `@deprecated` reason, if the element is deprecated.
pub(crate) fn deprecation_reason(directives: &[DirectiveUsage]) -> Option<String> {
    deprecation(directives).map(|usage| match usage.argument("reason") {
        Some(Value::String(reason)) => reason.clone(),
        _ => "No longer supported".to_string(),
    })
}

/// Builds a target type expression from the innermost named type outwards.
pub(crate) fn wrap_type(
    ty: &TypeReference,
    inner: String,
    list: impl Fn(String) -> String,
    nullable: impl Fn(String) -> String,
) -> String {
    let depth = ty.list_depth();
    let non_null_at = |level: usize| {
        if level == 0 {
            ty.non_null
        } else {
            ty.element_non_null[level - 1]
        }
    };

    let mut out = inner;
    if !non_null_at(depth) {
        out = nullable(out);
    }
    for level in (0..depth).rev() {
        out = list(out);
        if !non_null_at(level) {
            out = nullable(out);
        }
    }
    out
}

/// Helper trait for type conversion.
pub(crate) trait TypeConverter {
    /// The target name of a named GraphQL type.
    fn convert_named(&self, name: &str) -> String;
    fn list_of(&self, inner: String) -> String;
    fn nullable(&self, inner: String) -> String;

    fn convert_type(&self, ty: &TypeReference) -> String {
        self.wrap(ty, self.convert_named(&ty.name))
    }

    /// Applies the list and null structure of `ty` around `inner`.
    fn wrap(&self, ty: &TypeReference, inner: String) -> String {
        wrap_type(ty, inner, |t| self.list_of(t), |t| self.nullable(t))
    }
}

/// One backend per target language.
pub(crate) trait Backend {
    fn file_path(&self, declaration: &Declaration<'_>) -> String;
    fn render_type(&self, def: &TypeDefinition) -> String;
    /// `plans` holds the response types of `operation`, root first.
    fn render_operation(&self, operation: &BoundOperation, plans: &[ShapePlan<'_>]) -> String;
    fn runtime(&self) -> GeneratedFile;
    fn index(&self, declarations: &[Declaration<'_>]) -> GeneratedFile;
}

/// Main code generator.
pub struct CodeGenerator<'a> {
    analysis: &'a Analysis,
    options: CodegenOptions,
}

impl<'a> CodeGenerator<'a> {
    /// Creates a new code generator.
    pub fn new(analysis: &'a Analysis) -> Self {
        Self {
            analysis,
            options: CodegenOptions::default(),
        }
    }

    /// Creates a new code generator with options.
    pub fn with_options(analysis: &'a Analysis, options: CodegenOptions) -> Self {
        Self { analysis, options }
    }

    /// Sets code generation options.
    #[must_use]
    pub fn options(mut self, options: CodegenOptions) -> Self {
        self.options = options;
        self
    }

    /// Generates every file for `language`.
    ///
    /// Refuses to run while the analysis holds fatal diagnostics or the
    /// registry is not frozen, so partial output is never produced.
    pub fn generate(&self, language: Language) -> Result<GeneratedOutput, CodegenError> {
        if self.analysis.diagnostics.has_errors() {
            return Err(FatalDiagnostics(self.analysis.diagnostics.clone()).into());
        }
        let registry = &self.analysis.registry;
        if !registry.is_frozen() {
            return Err(CodegenError::RegistryNotFrozen);
        }
        self.check_mappings()?;

        let cx = Context {
            registry,
            options: &self.options,
            language,
        };
        let diagnostics = self.unmapped_scalar_warnings();

        let backend: Box<dyn Backend + '_> = match language {
            Language::TypeScript => Box::new(TypeScriptGenerator::new(cx)),
            Language::Rust => Box::new(RustGenerator::new(cx)),
            Language::Kotlin => Box::new(KotlinGenerator::new(cx)),
        };

        let mut declarations: Vec<Declaration<'_>> = registry
            .user_types()
            .map(Declaration::Type)
            .chain(self.analysis.operations.iter().map(Declaration::Operation))
            .collect();
        declarations.sort_by(|a, b| (a.kind(), a.name()).cmp(&(b.kind(), b.name())));

        let mut names = self.reserve_names(&declarations)?;
        let mut paths = BTreeSet::new();
        let mut files = Vec::with_capacity(declarations.len() + 2);
        for declaration in &declarations {
            let path = backend.file_path(declaration);
            if !paths.insert(path.to_ascii_lowercase()) {
                return Err(CodegenError::NameCollision { name: path });
            }
            let contents = match declaration {
                Declaration::Type(def) => backend.render_type(def),
                Declaration::Operation(op) => {
                    let plans = shape::plan(&op.name, &op.result_shape, &mut names);
                    backend.render_operation(op, &plans)
                }
            };
            files.push(GeneratedFile { path, contents });
        }
        files.push(backend.runtime());
        files.push(backend.index(&declarations));

        tracing::debug!(%language, files = files.len(), "generated files");

        Ok(GeneratedOutput { files, diagnostics })
    }

    /// Reserves every name a declaration file exports so response types
    /// never reuse one. Operations come after types, in name order.
    fn reserve_names(&self, declarations: &[Declaration<'_>]) -> Result<Names, CodegenError> {
        let mut names = Names::default();
        let mut reserve = |name: String| {
            if names.reserve(name.clone()) {
                Ok(())
            } else {
                Err(CodegenError::NameCollision { name })
            }
        };

        for name in RUNTIME_NAMES {
            reserve(name.to_string())?;
        }
        for declaration in declarations {
            let name = declaration.name();
            reserve(name.to_string())?;
            match declaration.kind() {
                DeclarationKind::Enum => reserve(format!("{name}Values"))?,
                DeclarationKind::InputObject => reserve(format!("{name}Builder"))?,
                DeclarationKind::Operation => {
                    reserve(format!("{name}Variables"))?;
                    reserve(format!("{name}Document"))?;
                }
                _ => {}
            }
        }
        Ok(names)
    }

    fn check_mappings(&self) -> Result<(), CodegenError> {
        for name in self.options.scalars.keys() {
            let reason = match self.analysis.registry.get(name) {
                None => "no such type in the schema".to_string(),
                Some(def) if def.location().is_builtin() => {
                    "built-in scalars have fixed mappings".to_string()
                }
                Some(TypeDefinition::Scalar(_)) => continue,
                Some(def) => format!("`{name}` is {}, not a scalar", def.kind()),
            };
            return Err(CodegenError::InvalidScalarMapping {
                name: name.clone(),
                reason,
            });
        }
        Ok(())
    }

    fn unmapped_scalar_warnings(&self) -> DiagnosticBag {
        let mut diagnostics = DiagnosticBag::new();
        for def in self.analysis.registry.user_types() {
            if let TypeDefinition::Scalar(scalar) = def {
                if !self.options.scalars.contains_key(&scalar.name) {
                    tracing::warn!(scalar = %scalar.name, "no mapping, using a JSON value");
                    diagnostics.warning(
                        codes::UNMAPPED_SCALAR,
                        "unmapped scalar",
                        scalar.location,
                        format!(
                            "scalar `{}` has no mapping and is generated as a JSON value",
                            scalar.name
                        ),
                    );
                }
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codegen_options_default() {
        let options = CodegenOptions::default();
        assert_eq!(options.package_name, "generated");
        assert!(options.scalars.is_empty());
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("TypeScript".parse::<Language>().unwrap(), Language::TypeScript);
        assert_eq!("kt".parse::<Language>().unwrap(), Language::Kotlin);
        assert!(matches!(
            "go".parse::<Language>(),
            Err(CodegenError::UnknownLanguage(name)) if name == "go"
        ));
    }

    #[test]
    fn test_wrap_type() {
        let ty = TypeReference::list(TypeReference::named("Int").non_null());
        let wrapped = wrap_type(&ty, "i32".to_string(), |t| format!("Vec<{t}>"), |t| format!("Option<{t}>"));
        assert_eq!(wrapped, "Option<Vec<i32>>");

        let ty = TypeReference::list(TypeReference::list(TypeReference::named("Int"))).non_null();
        let wrapped = wrap_type(&ty, "i32".to_string(), |t| format!("Vec<{t}>"), |t| format!("Option<{t}>"));
        assert_eq!(wrapped, "Vec<Option<Vec<Option<i32>>>>");
    }
}
