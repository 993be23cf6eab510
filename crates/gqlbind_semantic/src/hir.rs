//! High-level intermediate representation for gqlbind.
//!
//! The HIR is owned and immutable: it holds plain strings instead of
//! interned names so documents lowered on different threads can be merged
//! into one registry.

use gqlbind_core::{Location, SourceId};
use gqlbind_syntax::{DirectiveLocation, OperationType};
use std::fmt;

/// A possibly-nested, possibly-nullable reference to a named type.
///
/// `element_non_null[i]` is the nullability of the element at list level
/// `i + 1`, so the list depth and the per-level nullability can never
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeReference {
    pub name: String,
    pub non_null: bool,
    pub element_non_null: Vec<bool>,
}

impl TypeReference {
    /// A nullable reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            non_null: false,
            element_non_null: Vec::new(),
        }
    }

    /// Wraps `inner` in a nullable list.
    #[must_use]
    pub fn list(inner: Self) -> Self {
        let mut element_non_null = Vec::with_capacity(inner.element_non_null.len() + 1);
        element_non_null.push(inner.non_null);
        element_non_null.extend(inner.element_non_null);
        Self {
            name: inner.name,
            non_null: false,
            element_non_null,
        }
    }

    /// Marks the outermost level as non-null.
    #[must_use]
    pub fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    /// Returns the same reference with a nullable outermost level.
    #[must_use]
    pub fn nullable(&self) -> Self {
        Self {
            non_null: false,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn list_depth(&self) -> usize {
        self.element_non_null.len()
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        !self.element_non_null.is_empty()
    }

    /// Strips one list level.
    #[must_use]
    pub fn element(&self) -> Option<Self> {
        let (first, rest) = self.element_non_null.split_first()?;
        Some(Self {
            name: self.name.clone(),
            non_null: *first,
            element_non_null: rest.to_vec(),
        })
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.list_depth() {
            f.write_str("[")?;
        }
        f.write_str(&self.name)?;
        for non_null in self.element_non_null.iter().rev() {
            if *non_null {
                f.write_str("!")?;
            }
            f.write_str("]")?;
        }
        if self.non_null {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// The kind of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Object => "object",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::InputObject => "input object",
        }
    }

    /// Types allowed in argument, input field and variable positions.
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Scalar | Self::Enum | Self::InputObject)
    }

    /// Types allowed as field result types.
    #[must_use]
    pub const fn is_output(self) -> bool {
        !matches!(self, Self::InputObject)
    }

    /// Types that require a selection set.
    #[must_use]
    pub const fn is_composite(self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Union)
    }

    #[must_use]
    pub const fn is_abstract(self) -> bool {
        matches!(self, Self::Interface | Self::Union)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A name that refers to another definition, with the place it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRef {
    pub name: String,
    pub location: Location,
}

/// A value literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "${name}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => {
                // Keep a fractional part so the literal stays a Float.
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{value:.1}")
                } else {
                    write!(f, "{value}")
                }
            }
            Self::String(value) => write_quoted(f, value),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Null => f.write_str("null"),
            Self::Enum(value) => f.write_str(value),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Object(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Writes a GraphQL string literal.
pub(crate) fn write_quoted(f: &mut impl fmt::Write, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04X}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// An argument passed to a field or directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
    pub location: Location,
}

/// A directive applied to a definition or selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveUsage {
    pub name: String,
    pub arguments: Vec<Argument>,
    pub location: Location,
}

impl DirectiveUsage {
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }
}

/// Returns the `@deprecated` usage among `directives`, if any.
#[must_use]
pub fn deprecation(directives: &[DirectiveUsage]) -> Option<&DirectiveUsage> {
    directives.iter().find(|d| d.name == "deprecated")
}

/// An argument or input field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeReference,
    pub default_value: Option<Value>,
    pub directives: Vec<DirectiveUsage>,
    pub location: Location,
}

impl InputValueDefinition {
    /// A value that must be supplied: non-null and without a default.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.ty.non_null && self.default_value.is_none()
    }
}

/// A field of an object or interface.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDefinition>,
    pub ty: TypeReference,
    pub directives: Vec<DirectiveUsage>,
    pub location: Location,
}

impl FieldDefinition {
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&InputValueDefinition> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// A value of an enum type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<DirectiveUsage>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<DirectiveUsage>,
    pub location: Location,
}

/// Shared shape of object and interface types.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub implements: Vec<NamedRef>,
    pub directives: Vec<DirectiveUsage>,
    pub fields: Vec<FieldDefinition>,
    pub location: Location,
}

impl ObjectType {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn implements(&self, interface: &str) -> bool {
        self.implements.iter().any(|i| i.name == interface)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<DirectiveUsage>,
    pub members: Vec<NamedRef>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<DirectiveUsage>,
    pub values: Vec<EnumValueDefinition>,
    pub location: Location,
}

impl EnumType {
    #[must_use]
    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<DirectiveUsage>,
    pub fields: Vec<InputValueDefinition>,
    pub location: Location,
}

impl InputObjectType {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&InputValueDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A named type definition.
///
/// Extensions use the same representation: an `extend type` lowers to an
/// `Object` holding only the added fields, interfaces and directives.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(ObjectType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(t) => &t.name,
            Self::Object(t) | Self::Interface(t) => &t.name,
            Self::Union(t) => &t.name,
            Self::Enum(t) => &t.name,
            Self::InputObject(t) => &t.name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Scalar(_) => TypeKind::Scalar,
            Self::Object(_) => TypeKind::Object,
            Self::Interface(_) => TypeKind::Interface,
            Self::Union(_) => TypeKind::Union,
            Self::Enum(_) => TypeKind::Enum,
            Self::InputObject(_) => TypeKind::InputObject,
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Scalar(t) => t.description.as_deref(),
            Self::Object(t) | Self::Interface(t) => t.description.as_deref(),
            Self::Union(t) => t.description.as_deref(),
            Self::Enum(t) => t.description.as_deref(),
            Self::InputObject(t) => t.description.as_deref(),
        }
    }

    #[must_use]
    pub fn directives(&self) -> &[DirectiveUsage] {
        match self {
            Self::Scalar(t) => &t.directives,
            Self::Object(t) | Self::Interface(t) => &t.directives,
            Self::Union(t) => &t.directives,
            Self::Enum(t) => &t.directives,
            Self::InputObject(t) => &t.directives,
        }
    }

    #[must_use]
    pub fn location(&self) -> Location {
        match self {
            Self::Scalar(t) => t.location,
            Self::Object(t) | Self::Interface(t) => t.location,
            Self::Union(t) => t.location,
            Self::Enum(t) => t.location,
            Self::InputObject(t) => t.location,
        }
    }

    /// Object and interface fields; `None` for every other kind.
    #[must_use]
    pub fn fields(&self) -> Option<&[FieldDefinition]> {
        match self {
            Self::Object(t) | Self::Interface(t) => Some(&t.fields),
            _ => None,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields()?.iter().find(|f| f.name == name)
    }
}

/// A directive definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDefinition>,
    pub locations: Vec<DirectiveLocation>,
    pub repeatable: bool,
    pub location: Location,
}

impl DirectiveDefinition {
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&InputValueDefinition> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// A `schema` block or `extend schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    pub description: Option<String>,
    pub directives: Vec<DirectiveUsage>,
    pub roots: Vec<(OperationType, NamedRef)>,
    pub extension: bool,
    pub location: Location,
}

/// A variable declared by an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub ty: TypeReference,
    pub default_value: Option<Value>,
    pub directives: Vec<DirectiveUsage>,
    pub location: Location,
}

/// A field selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub directives: Vec<DirectiveUsage>,
    pub selection_set: Vec<Selection>,
    pub location: Location,
}

impl FieldSelection {
    /// The key this field occupies in the response.
    #[must_use]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    pub name: String,
    pub directives: Vec<DirectiveUsage>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: Option<NamedRef>,
    pub directives: Vec<DirectiveUsage>,
    pub selection_set: Vec<Selection>,
    pub location: Location,
}

/// A selection inside a selection set.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(FieldSelection),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

/// A query, mutation or subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDocument {
    pub operation_type: OperationType,
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub directives: Vec<DirectiveUsage>,
    pub selection_set: Vec<Selection>,
    pub location: Location,
}

/// A named fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: NamedRef,
    pub directives: Vec<DirectiveUsage>,
    pub selection_set: Vec<Selection>,
    pub location: Location,
}

/// Everything one source document contributes, split by role.
#[derive(Debug, Clone, PartialEq)]
pub struct HirDocument {
    pub source: SourceId,
    pub schemas: Vec<SchemaDefinition>,
    pub types: Vec<TypeDefinition>,
    pub extensions: Vec<TypeDefinition>,
    pub directives: Vec<DirectiveDefinition>,
    pub operations: Vec<OperationDocument>,
    pub fragments: Vec<FragmentDefinition>,
}

impl HirDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            schemas: Vec::new(),
            types: Vec::new(),
            extensions: Vec::new(),
            directives: Vec::new(),
            operations: Vec::new(),
            fragments: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_reference_display() {
        let ty = TypeReference::list(TypeReference::list(TypeReference::named("String").non_null()))
            .non_null();
        assert_eq!(ty.to_string(), "[[String!]]!");
        assert_eq!(ty.list_depth(), 2);
        assert_eq!(ty.element_non_null, vec![false, true]);
    }

    #[test]
    fn test_type_reference_element() {
        let ty = TypeReference::list(TypeReference::named("Int").non_null());
        let element = ty.element().unwrap();
        assert_eq!(element.to_string(), "Int!");
        assert!(element.element().is_none());
    }

    #[test]
    fn test_value_display() {
        let value = Value::Object(vec![
            ("name".to_string(), Value::String("a \"b\"".to_string())),
            (
                "tags".to_string(),
                Value::List(vec![Value::Enum("X".to_string()), Value::Float(2.0)]),
            ),
        ]);
        assert_eq!(value.to_string(), r#"{name: "a \"b\"", tags: [X, 2.0]}"#);
    }
}
