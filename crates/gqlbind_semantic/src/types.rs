//! The type registry.
//!
//! One registry holds every type, directive and root operation type of a
//! generation run. It is populated from any number of documents, validated,
//! and then frozen; every later stage borrows it read-only.

use crate::hir::{
    DirectiveDefinition, DirectiveUsage, EnumValueDefinition, FieldDefinition, HirDocument,
    InputValueDefinition, NamedRef, ObjectType, ScalarType, TypeDefinition, TypeKind,
    TypeReference, Value,
};
use gqlbind_core::{diagnostics::codes, Diagnostic, DiagnosticBag, Location};
use gqlbind_syntax::{DirectiveLocation, OperationType};
use std::collections::BTreeMap;

/// Scalars every registry starts with.
pub const BUILTIN_SCALARS: [&str; 5] = ["Boolean", "Float", "ID", "Int", "String"];

/// Directives every registry starts with.
pub const BUILTIN_DIRECTIVES: [&str; 4] = ["deprecated", "include", "skip", "specifiedBy"];

/// Errors raised by registry operations and semantic checks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("type `{name}` is already declared")]
    DuplicateType { name: String, location: Location },

    #[error("unknown type `{name}`")]
    UnknownType { name: String, location: Location },

    #[error("`{name}` is {found}, expected {expected}")]
    KindMismatch {
        name: String,
        expected: String,
        found: TypeKind,
        location: Location,
    },

    #[error("cannot modify `{name}`: the registry is frozen")]
    RegistryFrozen { name: String, location: Location },

    #[error("type `{type_name}` has no field `{field}`")]
    UnknownField {
        type_name: String,
        field: String,
        location: Location,
    },

    #[error("`{type_name}` does not conform to `{interface}`: field `{field}` {reason}")]
    Conformance {
        type_name: String,
        interface: String,
        field: String,
        reason: String,
        location: Location,
    },

    #[error("directive `@{name}` is not allowed on {placement}")]
    DirectiveLocation {
        name: String,
        placement: DirectiveLocation,
        location: Location,
    },

    #[error("`{owner}` declares `{name}` more than once")]
    DuplicateField {
        owner: String,
        name: String,
        location: Location,
    },

    #[error("{what} `{name}` is defined more than once")]
    DuplicateName {
        what: &'static str,
        name: String,
        location: Location,
    },
}

impl SemanticError {
    /// The diagnostic code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicateType { .. } => codes::DUPLICATE_TYPE,
            Self::UnknownType { .. } => codes::UNKNOWN_TYPE,
            Self::KindMismatch { .. } => codes::KIND_MISMATCH,
            Self::RegistryFrozen { .. } => codes::REGISTRY_FROZEN,
            Self::UnknownField { .. } => codes::UNKNOWN_FIELD,
            Self::Conformance { .. } => codes::CONFORMANCE,
            Self::DirectiveLocation { .. } => codes::DIRECTIVE_LOCATION,
            Self::DuplicateField { .. } => codes::DUPLICATE_FIELD,
            Self::DuplicateName { .. } => codes::DUPLICATE_NAME,
        }
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::DuplicateType { .. } => "duplicate type",
            Self::UnknownType { .. } => "unknown type",
            Self::KindMismatch { .. } => "kind mismatch",
            Self::RegistryFrozen { .. } => "registry frozen",
            Self::UnknownField { .. } => "unknown field",
            Self::Conformance { .. } => "interface conformance",
            Self::DirectiveLocation { .. } => "misplaced directive",
            Self::DuplicateField { .. } => "duplicate field",
            Self::DuplicateName { .. } => "duplicate name",
        }
    }

    #[must_use]
    pub const fn location(&self) -> Location {
        match self {
            Self::DuplicateType { location, .. }
            | Self::UnknownType { location, .. }
            | Self::KindMismatch { location, .. }
            | Self::RegistryFrozen { location, .. }
            | Self::UnknownField { location, .. }
            | Self::Conformance { location, .. }
            | Self::DirectiveLocation { location, .. }
            | Self::DuplicateField { location, .. }
            | Self::DuplicateName { location, .. } => *location,
        }
    }
}

impl From<SemanticError> for Diagnostic {
    fn from(error: SemanticError) -> Self {
        Diagnostic::error(error.code(), error.title()).with_location(error.location(), error.to_string())
    }
}

/// Result of building a registry from documents.
#[derive(Debug)]
pub struct BuildResult {
    pub registry: TypeRegistry,
    pub diagnostics: DiagnosticBag,
}

/// The type registry.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDefinition>,
    directives: BTreeMap<String, DirectiveDefinition>,
    roots: BTreeMap<OperationType, NamedRef>,
    schema_directives: Vec<DirectiveUsage>,
    schema_location: Option<Location>,
    frozen: bool,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry holding only the built-in scalars and directives.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            types: BTreeMap::new(),
            directives: BTreeMap::new(),
            roots: BTreeMap::new(),
            schema_directives: Vec::new(),
            schema_location: None,
            frozen: false,
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        for name in BUILTIN_SCALARS {
            self.types.insert(
                name.to_string(),
                TypeDefinition::Scalar(ScalarType {
                    name: name.to_string(),
                    description: None,
                    directives: Vec::new(),
                    location: Location::builtin(),
                }),
            );
        }

        let argument = |name: &str, ty: TypeReference, default_value: Option<Value>| {
            InputValueDefinition {
                name: name.to_string(),
                description: None,
                ty,
                default_value,
                directives: Vec::new(),
                location: Location::builtin(),
            }
        };
        let directive = |name: &str, arguments, locations| DirectiveDefinition {
            name: name.to_string(),
            description: None,
            arguments,
            locations,
            repeatable: false,
            location: Location::builtin(),
        };
        let condition = [
            DirectiveLocation::Field,
            DirectiveLocation::FragmentSpread,
            DirectiveLocation::InlineFragment,
        ];

        for def in [
            directive(
                "skip",
                vec![argument("if", TypeReference::named("Boolean").non_null(), None)],
                condition.to_vec(),
            ),
            directive(
                "include",
                vec![argument("if", TypeReference::named("Boolean").non_null(), None)],
                condition.to_vec(),
            ),
            directive(
                "deprecated",
                vec![argument(
                    "reason",
                    TypeReference::named("String"),
                    Some(Value::String("No longer supported".to_string())),
                )],
                vec![
                    DirectiveLocation::FieldDefinition,
                    DirectiveLocation::ArgumentDefinition,
                    DirectiveLocation::InputFieldDefinition,
                    DirectiveLocation::EnumValue,
                ],
            ),
            directive(
                "specifiedBy",
                vec![argument("url", TypeReference::named("String").non_null(), None)],
                vec![DirectiveLocation::Scalar],
            ),
        ] {
            self.directives.insert(def.name.clone(), def);
        }
    }

    /// Builds a registry from lowered documents.
    ///
    /// Pass 1 declares every type and directive, then merges extensions, so
    /// an extension may appear before its base in any document. Pass 2
    /// resolves every type reference. The result does not depend on the
    /// order of `documents`.
    #[must_use]
    pub fn build(documents: &[HirDocument]) -> BuildResult {
        let mut registry = Self::new();
        let mut diagnostics = DiagnosticBag::new();

        let mut declarations: Vec<&TypeDefinition> =
            documents.iter().flat_map(|d| &d.types).collect();
        declarations.sort_by(|a, b| a.name().cmp(b.name()).then(a.location().cmp(&b.location())));
        for def in declarations {
            if let Err(error) = registry.declare(def.clone()) {
                diagnostics.add(error.into());
            }
        }

        let mut directives: Vec<&DirectiveDefinition> =
            documents.iter().flat_map(|d| &d.directives).collect();
        directives.sort_by(|a, b| a.name.cmp(&b.name).then(a.location.cmp(&b.location)));
        for def in directives {
            if let Err(error) = registry.declare_directive(def.clone()) {
                diagnostics.add(error.into());
            }
        }

        registry.apply_schemas(documents, &mut diagnostics);
        registry.apply_extensions(documents, &mut diagnostics);

        tracing::debug!(
            types = registry.types.len(),
            directives = registry.directives.len(),
            "declared registry contents"
        );

        diagnostics.append(registry.check_references());

        BuildResult {
            registry,
            diagnostics,
        }
    }

    fn apply_schemas(&mut self, documents: &[HirDocument], diagnostics: &mut DiagnosticBag) {
        let mut schemas: Vec<_> = documents.iter().flat_map(|d| &d.schemas).collect();
        // Definitions before extensions, then by position.
        schemas.sort_by(|a, b| a.extension.cmp(&b.extension).then(a.location.cmp(&b.location)));

        let mut extended = Vec::new();
        for schema in schemas {
            if !schema.extension {
                if self.schema_location.is_some() {
                    diagnostics.add(
                        SemanticError::DuplicateName {
                            what: "schema definition",
                            name: "schema".to_string(),
                            location: schema.location,
                        }
                        .into(),
                    );
                    continue;
                }
                self.schema_location = Some(schema.location);
            }
            for (operation, type_name) in &schema.roots {
                if let Err(error) = self.set_root(*operation, type_name.clone()) {
                    diagnostics.add(error.into());
                }
            }
            if schema.extension {
                extended.extend(schema.directives.iter().cloned());
            } else {
                self.schema_directives.extend(schema.directives.iter().cloned());
            }
        }
        self.schema_directives.extend(sorted_directives(extended));
    }

    fn apply_extensions(&mut self, documents: &[HirDocument], diagnostics: &mut DiagnosticBag) {
        // Group by (name, kind) so every kind of extension merges as one
        // contribution; the merged lists are sorted inside `extend`.
        let mut groups: BTreeMap<(&str, TypeKind), Vec<&TypeDefinition>> = BTreeMap::new();
        for ext in documents.iter().flat_map(|d| &d.extensions) {
            groups.entry((ext.name(), ext.kind())).or_default().push(ext);
        }

        for (_, mut group) in groups {
            group.sort_by_key(|ext| ext.location());
            let mut parts = group.into_iter().cloned();
            let Some(mut merged) = parts.next() else {
                continue;
            };
            for part in parts {
                append_extension(&mut merged, part);
            }
            if let Err(error) = self.extend(merged) {
                diagnostics.add(error.into());
            }
        }
    }

    fn ensure_mutable(&self, name: &str, location: Location) -> Result<(), SemanticError> {
        if self.frozen {
            return Err(SemanticError::RegistryFrozen {
                name: name.to_string(),
                location,
            });
        }
        Ok(())
    }

    /// Inserts a new named type.
    pub fn declare(&mut self, def: TypeDefinition) -> Result<(), SemanticError> {
        self.ensure_mutable(def.name(), def.location())?;
        if self.types.contains_key(def.name()) {
            return Err(SemanticError::DuplicateType {
                name: def.name().to_string(),
                location: def.location(),
            });
        }
        self.types.insert(def.name().to_string(), def);
        Ok(())
    }

    /// Merges an extension into its previously declared base type.
    ///
    /// Added fields, values, members and directives are appended after the
    /// base declaration's own, sorted by name.
    pub fn extend(&mut self, extension: TypeDefinition) -> Result<(), SemanticError> {
        self.ensure_mutable(extension.name(), extension.location())?;
        let Some(base) = self.types.get_mut(extension.name()) else {
            return Err(SemanticError::UnknownType {
                name: extension.name().to_string(),
                location: extension.location(),
            });
        };

        match (base, extension) {
            (TypeDefinition::Scalar(base), TypeDefinition::Scalar(ext)) => {
                base.directives.extend(sorted_directives(ext.directives));
            }
            (TypeDefinition::Object(base), TypeDefinition::Object(ext))
            | (TypeDefinition::Interface(base), TypeDefinition::Interface(ext)) => {
                merge_object(base, ext);
            }
            (TypeDefinition::Union(base), TypeDefinition::Union(mut ext)) => {
                ext.members.sort_by(|a, b| a.name.cmp(&b.name));
                base.members.extend(ext.members);
                base.directives.extend(sorted_directives(ext.directives));
            }
            (TypeDefinition::Enum(base), TypeDefinition::Enum(mut ext)) => {
                ext.values.sort_by(|a: &EnumValueDefinition, b| a.name.cmp(&b.name));
                base.values.extend(ext.values);
                base.directives.extend(sorted_directives(ext.directives));
            }
            (TypeDefinition::InputObject(base), TypeDefinition::InputObject(mut ext)) => {
                ext.fields.sort_by(|a, b| a.name.cmp(&b.name));
                base.fields.extend(ext.fields);
                base.directives.extend(sorted_directives(ext.directives));
            }
            (base, ext) => {
                return Err(SemanticError::KindMismatch {
                    name: ext.name().to_string(),
                    expected: format!("an extension of {}", base.kind()),
                    found: ext.kind(),
                    location: ext.location(),
                });
            }
        }
        Ok(())
    }

    /// Inserts a directive definition.
    pub fn declare_directive(&mut self, def: DirectiveDefinition) -> Result<(), SemanticError> {
        self.ensure_mutable(&def.name, def.location)?;
        if self.directives.contains_key(&def.name) {
            return Err(SemanticError::DuplicateName {
                what: "directive",
                name: def.name,
                location: def.location,
            });
        }
        self.directives.insert(def.name.clone(), def);
        Ok(())
    }

    /// Declares the root type of an operation kind.
    pub fn set_root(&mut self, operation: OperationType, type_name: NamedRef) -> Result<(), SemanticError> {
        self.ensure_mutable(&type_name.name, type_name.location)?;
        if self.roots.contains_key(&operation) {
            return Err(SemanticError::DuplicateName {
                what: "root operation type",
                name: operation.as_str().to_string(),
                location: type_name.location,
            });
        }
        self.roots.insert(operation, type_name);
        Ok(())
    }

    /// Looks up a type, failing with `UnknownType`.
    pub fn resolve(&self, name: &str) -> Result<&TypeDefinition, SemanticError> {
        self.types.get(name).ok_or_else(|| SemanticError::UnknownType {
            name: name.to_string(),
            location: Location::builtin(),
        })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        self.types.get(name).map(TypeDefinition::kind)
    }

    /// Makes the registry read-only.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// All types, ordered by name.
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Types declared by the documents, ordered by name.
    pub fn user_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values().filter(|t| !t.location().is_builtin())
    }

    #[must_use]
    pub fn directive(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.directives.get(name)
    }

    /// All directive definitions, ordered by name.
    pub fn directives(&self) -> impl Iterator<Item = &DirectiveDefinition> {
        self.directives.values()
    }

    /// Explicitly declared roots, ordered by operation kind.
    pub fn explicit_roots(&self) -> impl Iterator<Item = (OperationType, &NamedRef)> {
        self.roots.iter().map(|(op, name)| (*op, name))
    }

    #[must_use]
    pub fn schema_directives(&self) -> &[DirectiveUsage] {
        &self.schema_directives
    }

    #[must_use]
    pub fn has_schema_definition(&self) -> bool {
        self.schema_location.is_some() || !self.roots.is_empty()
    }

    /// The root type for an operation kind.
    ///
    /// Without a `schema` block the conventional names are used when a type
    /// of that name exists.
    #[must_use]
    pub fn root_type(&self, operation: OperationType) -> Option<&str> {
        if self.has_schema_definition() {
            return self.roots.get(&operation).map(|r| r.name.as_str());
        }
        let name = match operation {
            OperationType::Query => "Query",
            OperationType::Mutation => "Mutation",
            OperationType::Subscription => "Subscription",
        };
        self.types.get_key_value(name).map(|(k, _)| k.as_str())
    }

    /// Looks up a field on an object or interface type.
    #[must_use]
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.types.get(type_name)?.field(field_name)
    }

    /// Object types a value of `name` can be at runtime, ordered by name.
    #[must_use]
    pub fn possible_types(&self, name: &str) -> Vec<&str> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => vec![object.name.as_str()],
            Some(TypeDefinition::Interface(_)) => self
                .types
                .values()
                .filter_map(|t| match t {
                    TypeDefinition::Object(object) if object.implements(name) => {
                        Some(object.name.as_str())
                    }
                    _ => None,
                })
                .collect(),
            Some(TypeDefinition::Union(union)) => {
                let mut members: Vec<&str> = union
                    .members
                    .iter()
                    .map(|m| m.name.as_str())
                    .filter(|m| self.kind_of(m) == Some(TypeKind::Object))
                    .collect();
                members.sort_unstable();
                members.dedup();
                members
            }
            _ => Vec::new(),
        }
    }

    /// Returns true if `object` is one of the possible types of `name`.
    #[must_use]
    pub fn is_possible_type(&self, name: &str, object: &str) -> bool {
        self.possible_types(name).contains(&object)
    }

    /// Pass 2: every type reference must name a declared type.
    fn check_references(&self) -> DiagnosticBag {
        let mut diagnostics = DiagnosticBag::new();
        let mut check = |name: &str, location: Location| {
            if !self.types.contains_key(name) {
                diagnostics.add(
                    SemanticError::UnknownType {
                        name: name.to_string(),
                        location,
                    }
                    .into(),
                );
            }
        };

        for def in self.types.values() {
            match def {
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => {}
                TypeDefinition::Object(object) | TypeDefinition::Interface(object) => {
                    for interface in &object.implements {
                        check(&interface.name, interface.location);
                    }
                    for field in &object.fields {
                        check(&field.ty.name, field.location);
                        for argument in &field.arguments {
                            check(&argument.ty.name, argument.location);
                        }
                    }
                }
                TypeDefinition::Union(union) => {
                    for member in &union.members {
                        check(&member.name, member.location);
                    }
                }
                TypeDefinition::InputObject(input) => {
                    for field in &input.fields {
                        check(&field.ty.name, field.location);
                    }
                }
            }
        }

        for directive in self.directives.values() {
            for argument in &directive.arguments {
                check(&argument.ty.name, argument.location);
            }
        }

        for root in self.roots.values() {
            check(&root.name, root.location);
        }

        diagnostics
    }
}

/// Repeated directives tie on name, so their printed arguments break the tie.
fn sorted_directives(mut directives: Vec<DirectiveUsage>) -> Vec<DirectiveUsage> {
    directives.sort_by_cached_key(|directive| (directive.name.clone(), argument_key(directive)));
    directives
}

fn argument_key(directive: &DirectiveUsage) -> Vec<String> {
    let mut key: Vec<String> = directive
        .arguments
        .iter()
        .map(|argument| format!("{}: {}", argument.name, argument.value))
        .collect();
    key.sort();
    key
}

fn merge_object(base: &mut ObjectType, mut ext: ObjectType) {
    ext.implements.sort_by(|a, b| a.name.cmp(&b.name));
    ext.fields.sort_by(|a, b| a.name.cmp(&b.name));
    base.implements.extend(ext.implements);
    base.fields.extend(ext.fields);
    base.directives.extend(sorted_directives(ext.directives));
}

/// Concatenates two extensions of the same kind.
fn append_extension(into: &mut TypeDefinition, part: TypeDefinition) {
    match (into, part) {
        (TypeDefinition::Scalar(a), TypeDefinition::Scalar(b)) => a.directives.extend(b.directives),
        (TypeDefinition::Object(a), TypeDefinition::Object(b))
        | (TypeDefinition::Interface(a), TypeDefinition::Interface(b)) => {
            a.implements.extend(b.implements);
            a.fields.extend(b.fields);
            a.directives.extend(b.directives);
        }
        (TypeDefinition::Union(a), TypeDefinition::Union(b)) => {
            a.members.extend(b.members);
            a.directives.extend(b.directives);
        }
        (TypeDefinition::Enum(a), TypeDefinition::Enum(b)) => {
            a.values.extend(b.values);
            a.directives.extend(b.directives);
        }
        (TypeDefinition::InputObject(a), TypeDefinition::InputObject(b)) => {
            a.fields.extend(b.fields);
            a.directives.extend(b.directives);
        }
        // Groups are keyed by kind.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{parse_documents, SourceDocument};

    fn documents(sources: &[&str]) -> Vec<HirDocument> {
        let sources: Vec<_> = sources
            .iter()
            .enumerate()
            .map(|(i, text)| SourceDocument::new(i, format!("doc{i}.graphql"), *text))
            .collect();
        let (documents, diagnostics) = parse_documents(&sources);
        assert!(!diagnostics.has_errors(), "{diagnostics:?}");
        documents
    }

    fn first_type(source: &str) -> TypeDefinition {
        documents(&[source]).remove(0).types.remove(0)
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = TypeRegistry::new();
        for name in BUILTIN_SCALARS {
            assert_eq!(registry.kind_of(name), Some(TypeKind::Scalar));
        }
        assert!(registry.directive("include").is_some());
        assert_eq!(registry.user_types().count(), 0);
    }

    #[test]
    fn test_declare_duplicate() {
        let mut registry = TypeRegistry::new();
        registry.declare(first_type("type User { id: ID }")).unwrap();
        let error = registry
            .declare(first_type("type User { name: String }"))
            .unwrap_err();
        assert_eq!(error.code(), codes::DUPLICATE_TYPE);
    }

    #[test]
    fn test_extend_unknown_type() {
        let mut registry = TypeRegistry::new();
        let ext = documents(&["extend type Ghost { id: ID }"]).remove(0).extensions.remove(0);
        assert!(matches!(
            registry.extend(ext),
            Err(SemanticError::UnknownType { name, .. }) if name == "Ghost"
        ));
    }

    #[test]
    fn test_extend_kind_mismatch() {
        let mut registry = TypeRegistry::new();
        registry.declare(first_type("scalar Date")).unwrap();
        let ext = documents(&["extend type Date { day: Int }"]).remove(0).extensions.remove(0);
        assert_eq!(registry.extend(ext).unwrap_err().code(), codes::KIND_MISMATCH);
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = TypeRegistry::new();
        assert!(registry.resolve("String").is_ok());
        assert!(matches!(
            registry.resolve("Foo"),
            Err(SemanticError::UnknownType { name, .. }) if name == "Foo"
        ));
    }

    #[test]
    fn test_frozen_registry_rejects_mutation() {
        let mut registry = TypeRegistry::new();
        registry.freeze();
        let error = registry.declare(first_type("type User { id: ID }")).unwrap_err();
        assert_eq!(error.code(), codes::REGISTRY_FROZEN);
        assert!(registry.get("User").is_none());
    }

    #[test]
    fn test_build_merges_extension_before_base() {
        let docs = documents(&[
            "extend type User { name: String }",
            "type User { id: ID! }",
        ]);
        let result = TypeRegistry::build(&docs);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let fields: Vec<_> = result.registry.get("User").unwrap().fields().unwrap().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["id", "name"]);
    }

    #[test]
    fn test_build_reports_unknown_reference_once() {
        let result = TypeRegistry::build(&documents(&["type Query { foo: Foo }"]));
        let unknown: Vec<_> = result.diagnostics.with_code(codes::UNKNOWN_TYPE).collect();
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].to_string().contains("`Foo`"));
    }

    #[test]
    fn test_root_types() {
        let result = TypeRegistry::build(&documents(&["type Query { a: Int } type Mutation { b: Int }"]));
        assert_eq!(result.registry.root_type(OperationType::Query), Some("Query"));
        assert_eq!(result.registry.root_type(OperationType::Subscription), None);

        let result = TypeRegistry::build(&documents(&[
            "schema { query: Root } type Root { a: Int } type Mutation { b: Int }",
        ]));
        assert_eq!(result.registry.root_type(OperationType::Query), Some("Root"));
        assert_eq!(result.registry.root_type(OperationType::Mutation), None);
    }

    #[test]
    fn test_possible_types() {
        let result = TypeRegistry::build(&documents(&[
            "interface Node { id: ID! } type B implements Node { id: ID! } type A implements Node { id: ID! } union U = B | A",
        ]));
        assert_eq!(result.registry.possible_types("Node"), vec!["A", "B"]);
        assert_eq!(result.registry.possible_types("U"), vec!["A", "B"]);
        assert_eq!(result.registry.possible_types("A"), vec!["A"]);
    }
}
