//! Semantic analysis for gqlbind.
//!
//! This crate provides:
//! - `hir`: the owned, language-agnostic document model
//! - `lower`: syntax tree to HIR
//! - `types`: the type registry
//! - `checker`: schema validation
//! - `binder`: operations bound against the registry
//! - `printer`: canonical SDL and request documents
//! - `analysis`: the whole front half of a run

pub mod analysis;
pub mod binder;
pub mod checker;
pub mod hir;
pub mod lower;
pub mod printer;
pub mod types;
pub mod values;

pub use analysis::{analyze, parse_documents, Analysis, SourceDocument};
pub use binder::{
    BoundFragment, BoundField, BoundOperation, BoundSelection, BoundVariable, ResultShape,
    ShapeField, ShapeVariant,
};
pub use hir::{TypeDefinition, TypeKind, TypeReference};
pub use types::{SemanticError, TypeRegistry};
