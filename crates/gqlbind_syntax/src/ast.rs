//! Syntax tree types for GraphQL documents.
//!
//! The tree mirrors the source closely: names are interned [`Text`] values,
//! every node keeps its span, and type extensions reuse the definition
//! nodes of the kind they extend.

use crate::token::DirectiveLocation;
use gqlbind_core::{Span, Text};

/// A complete document.
#[derive(Debug, Clone)]
pub struct Document {
    pub definitions: Vec<Definition>,
    pub span: Span,
}

impl Document {
    /// Returns true if the document only contains executable definitions.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.definitions
            .iter()
            .all(|d| matches!(d, Definition::Operation(_) | Definition::Fragment(_)))
    }
}

/// A top-level definition.
#[derive(Debug, Clone)]
pub enum Definition {
    Schema(SchemaDefinition),
    SchemaExtension(SchemaDefinition),
    Type(TypeDefinition),
    TypeExtension(TypeDefinition),
    Directive(DirectiveDefinitionNode),
    Operation(OperationDefinition),
    Fragment(FragmentDefinition),
}

impl Definition {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Schema(d) | Self::SchemaExtension(d) => d.span,
            Self::Type(d) | Self::TypeExtension(d) => d.span(),
            Self::Directive(d) => d.span,
            Self::Operation(d) => d.span,
            Self::Fragment(d) => d.span,
        }
    }
}

/// Schema definition or extension.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub description: Option<Description>,
    pub directives: Vec<Directive>,
    pub operations: Vec<OperationTypeDefinition>,
    pub span: Span,
}

/// Root operation type entry of a schema definition.
#[derive(Debug, Clone)]
pub struct OperationTypeDefinition {
    pub operation: OperationType,
    pub type_name: Name,
    pub span: Span,
}

/// Type of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

/// Type definitions.
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Scalar(ScalarTypeDefinition),
    Object(ObjectTypeDefinition),
    Interface(ObjectTypeDefinition),
    Union(UnionTypeDefinition),
    Enum(EnumTypeDefinition),
    Input(InputObjectTypeDefinition),
}

impl TypeDefinition {
    #[must_use]
    pub fn name(&self) -> Name {
        match self {
            Self::Scalar(d) => d.name,
            Self::Object(d) | Self::Interface(d) => d.name,
            Self::Union(d) => d.name,
            Self::Enum(d) => d.name,
            Self::Input(d) => d.name,
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Scalar(d) => d.span,
            Self::Object(d) | Self::Interface(d) => d.span,
            Self::Union(d) => d.span,
            Self::Enum(d) => d.span,
            Self::Input(d) => d.span,
        }
    }
}

/// Scalar type definition.
#[derive(Debug, Clone)]
pub struct ScalarTypeDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Object or interface type definition.
#[derive(Debug, Clone)]
pub struct ObjectTypeDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub implements: Vec<Name>,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldDefinition>,
    pub span: Span,
}

/// Union type definition.
#[derive(Debug, Clone)]
pub struct UnionTypeDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub members: Vec<Name>,
    pub span: Span,
}

/// Enum type definition.
#[derive(Debug, Clone)]
pub struct EnumTypeDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub values: Vec<EnumValueDefinition>,
    pub span: Span,
}

/// Enum value definition.
#[derive(Debug, Clone)]
pub struct EnumValueDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Input object type definition.
#[derive(Debug, Clone)]
pub struct InputObjectTypeDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub fields: Vec<InputValueDefinition>,
    pub span: Span,
}

/// Field definition.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub arguments: Vec<InputValueDefinition>,
    pub ty: Type,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Input value definition (arguments, input fields).
#[derive(Debug, Clone)]
pub struct InputValueDefinition {
    pub description: Option<Description>,
    pub name: Name,
    pub ty: Type,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Type reference as written.
#[derive(Debug, Clone)]
pub enum Type {
    /// `User`
    Named(Name),
    /// `[User]`
    List(Box<Type>, Span),
    /// `User!`
    NonNull(Box<Type>, Span),
}

impl Type {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Named(name) => name.span,
            Self::List(_, span) | Self::NonNull(_, span) => *span,
        }
    }

    /// Returns the innermost named type.
    #[must_use]
    pub fn named(&self) -> Name {
        match self {
            Self::Named(name) => *name,
            Self::List(inner, _) | Self::NonNull(inner, _) => inner.named(),
        }
    }
}

/// Directive definition.
#[derive(Debug, Clone)]
pub struct DirectiveDefinitionNode {
    pub description: Option<Description>,
    pub name: Name,
    pub arguments: Vec<InputValueDefinition>,
    pub repeatable: bool,
    pub locations: Vec<(DirectiveLocation, Span)>,
    pub span: Span,
}

/// Directive usage.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: Name,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

/// Argument.
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: Name,
    pub value: Value,
    pub span: Span,
}

/// Operation definition.
#[derive(Debug, Clone)]
pub struct OperationDefinition {
    pub operation: OperationType,
    pub name: Option<Name>,
    pub variables: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// Variable definition.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: Name,
    pub ty: Type,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Fragment definition.
#[derive(Debug, Clone)]
pub struct FragmentDefinition {
    pub name: Name,
    pub type_condition: Name,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// Selection set.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    pub selections: Vec<Selection>,
    pub span: Span,
}

/// Selection.
#[derive(Debug, Clone)]
pub enum Selection {
    Field(FieldSelection),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

/// Field selection.
#[derive(Debug, Clone)]
pub struct FieldSelection {
    pub alias: Option<Name>,
    pub name: Name,
    pub arguments: Vec<Argument>,
    pub directives: Vec<Directive>,
    pub selection_set: Option<SelectionSet>,
    pub span: Span,
}

/// Fragment spread.
#[derive(Debug, Clone)]
pub struct FragmentSpread {
    pub name: Name,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Inline fragment.
#[derive(Debug, Clone)]
pub struct InlineFragment {
    pub type_condition: Option<Name>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// Literal or variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(Name),
    Int(i64, Span),
    Float(f64, Span),
    String(String, Span),
    Boolean(bool, Span),
    Null(Span),
    Enum(Name),
    List(Vec<Value>, Span),
    Object(Vec<(Name, Value)>, Span),
}

impl Value {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Variable(name) | Self::Enum(name) => name.span,
            Self::Int(_, span)
            | Self::Float(_, span)
            | Self::String(_, span)
            | Self::Boolean(_, span)
            | Self::Null(span)
            | Self::List(_, span)
            | Self::Object(_, span) => *span,
        }
    }
}

/// Name with span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Name {
    pub value: Text,
    pub span: Span,
}

impl Name {
    #[must_use]
    pub const fn new(value: Text, span: Span) -> Self {
        Self { value, span }
    }
}

/// Description string, already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub value: String,
    pub span: Span,
}
