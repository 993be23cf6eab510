//! Schema validation.
//!
//! Runs over a fully built registry and reports every violation it finds;
//! nothing here stops at the first error.

use crate::hir::{
    DirectiveDefinition, DirectiveUsage, FieldDefinition, InputValueDefinition, ObjectType,
    TypeDefinition, TypeKind, TypeReference,
};
use crate::types::{SemanticError, TypeRegistry};
use crate::values::ValueChecker;
use gqlbind_core::{diagnostics::codes, DiagnosticBag, Location};
use gqlbind_syntax::DirectiveLocation;
use rustc_hash::FxHashSet;

/// Result of validating a registry.
pub struct CheckResult {
    pub diagnostics: DiagnosticBag,
}

impl CheckResult {
    /// Returns true if validation found no fatal problems.
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Validates a built registry.
pub struct Validator<'a> {
    registry: &'a TypeRegistry,
    diagnostics: DiagnosticBag,
}

impl<'a> Validator<'a> {
    /// Creates a new validator.
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Runs every schema rule.
    pub fn check(mut self) -> CheckResult {
        let registry = self.registry;
        for def in registry.user_types() {
            self.check_type(def);
        }
        for directive in registry.directives() {
            if !directive.location.is_builtin() {
                self.check_directive_definition(directive);
            }
        }
        self.check_roots();
        self.check_usages(registry.schema_directives(), DirectiveLocation::Schema);

        tracing::debug!(diagnostics = self.diagnostics.len(), "validated registry");
        CheckResult {
            diagnostics: self.diagnostics,
        }
    }

    fn error(&mut self, error: SemanticError) {
        self.diagnostics.add(error.into());
    }

    fn check_type(&mut self, def: &TypeDefinition) {
        self.check_reserved(def.name(), def.location());

        match def {
            TypeDefinition::Scalar(scalar) => {
                self.check_usages(&scalar.directives, DirectiveLocation::Scalar);
            }
            TypeDefinition::Object(object) => {
                self.check_usages(&object.directives, DirectiveLocation::Object);
                self.check_object(object);
            }
            TypeDefinition::Interface(interface) => {
                self.check_usages(&interface.directives, DirectiveLocation::Interface);
                self.check_object(interface);
            }
            TypeDefinition::Union(union) => {
                self.check_usages(&union.directives, DirectiveLocation::Union);
                if union.members.is_empty() {
                    self.empty(&union.name, "member", union.location);
                }
                let mut seen = FxHashSet::default();
                for member in &union.members {
                    if !seen.insert(member.name.as_str()) {
                        self.error(SemanticError::DuplicateField {
                            owner: union.name.clone(),
                            name: member.name.clone(),
                            location: member.location,
                        });
                        continue;
                    }
                    match self.registry.kind_of(&member.name) {
                        Some(TypeKind::Object) | None => {}
                        Some(found) => self.error(SemanticError::KindMismatch {
                            name: member.name.clone(),
                            expected: "an object type".to_string(),
                            found,
                            location: member.location,
                        }),
                    }
                }
            }
            TypeDefinition::Enum(enum_type) => {
                self.check_usages(&enum_type.directives, DirectiveLocation::Enum);
                if enum_type.values.is_empty() {
                    self.empty(&enum_type.name, "value", enum_type.location);
                }
                let mut seen = FxHashSet::default();
                for value in &enum_type.values {
                    self.check_reserved(&value.name, value.location);
                    if matches!(value.name.as_str(), "true" | "false" | "null") {
                        self.diagnostics.error(
                            codes::RESERVED_NAME,
                            "reserved name",
                            value.location,
                            format!("`{}` cannot be an enum value", value.name),
                        );
                    }
                    if !seen.insert(value.name.as_str()) {
                        self.error(SemanticError::DuplicateField {
                            owner: enum_type.name.clone(),
                            name: value.name.clone(),
                            location: value.location,
                        });
                    }
                    self.check_usages(&value.directives, DirectiveLocation::EnumValue);
                }
            }
            TypeDefinition::InputObject(input) => {
                self.check_usages(&input.directives, DirectiveLocation::InputObject);
                if input.fields.is_empty() {
                    self.empty(&input.name, "field", input.location);
                }
                self.check_input_values(
                    &input.name,
                    &input.fields,
                    DirectiveLocation::InputFieldDefinition,
                );
            }
        }
    }

    fn empty(&mut self, name: &str, what: &str, location: Location) {
        self.diagnostics.error(
            codes::EMPTY_DEFINITION,
            "empty definition",
            location,
            format!("`{name}` must declare at least one {what}"),
        );
    }

    fn check_reserved(&mut self, name: &str, location: Location) {
        if name.starts_with("__") {
            self.diagnostics.error(
                codes::RESERVED_NAME,
                "reserved name",
                location,
                format!("`{name}` starts with `__`, which is reserved for introspection"),
            );
        }
    }

    fn check_object(&mut self, object: &ObjectType) {
        if object.fields.is_empty() {
            self.empty(&object.name, "field", object.location);
        }

        let mut seen = FxHashSet::default();
        for field in &object.fields {
            self.check_reserved(&field.name, field.location);
            if !seen.insert(field.name.as_str()) {
                self.error(SemanticError::DuplicateField {
                    owner: object.name.clone(),
                    name: field.name.clone(),
                    location: field.location,
                });
            }
            if let Some(found) = self.registry.kind_of(&field.ty.name) {
                if !found.is_output() {
                    self.error(SemanticError::KindMismatch {
                        name: field.ty.name.clone(),
                        expected: "an output type".to_string(),
                        found,
                        location: field.location,
                    });
                }
            }
            self.check_usages(&field.directives, DirectiveLocation::FieldDefinition);
            self.check_input_values(
                &format!("{}.{}", object.name, field.name),
                &field.arguments,
                DirectiveLocation::ArgumentDefinition,
            );
        }

        let mut implemented = FxHashSet::default();
        for interface in &object.implements {
            if !implemented.insert(interface.name.as_str()) {
                self.error(SemanticError::DuplicateName {
                    what: "implemented interface",
                    name: interface.name.clone(),
                    location: interface.location,
                });
                continue;
            }
            match self.registry.get(&interface.name) {
                Some(TypeDefinition::Interface(def)) => {
                    if def.name == object.name {
                        self.diagnostics.error(
                            codes::CONFORMANCE,
                            "interface conformance",
                            interface.location,
                            format!("`{}` cannot implement itself", object.name),
                        );
                        continue;
                    }
                    self.check_conformance(object, def, interface.location);
                }
                Some(other) => self.error(SemanticError::KindMismatch {
                    name: interface.name.clone(),
                    expected: "an interface".to_string(),
                    found: other.kind(),
                    location: interface.location,
                }),
                // Reported as an unknown type while building.
                None => {}
            }
        }
    }

    /// Every field of `interface` must appear on `object` with a compatible
    /// type and the same arguments.
    fn check_conformance(&mut self, object: &ObjectType, interface: &ObjectType, at: Location) {
        let conformance = |field: &FieldDefinition, reason: String| SemanticError::Conformance {
            type_name: object.name.clone(),
            interface: interface.name.clone(),
            field: field.name.clone(),
            reason,
            location: at,
        };

        for expected in &interface.fields {
            let Some(actual) = object.field(&expected.name) else {
                self.error(conformance(expected, "is missing".to_string()));
                continue;
            };
            if !is_covariant(&actual.ty, &expected.ty) {
                self.error(conformance(
                    expected,
                    format!("has type `{}`, which is not compatible with `{}`", actual.ty, expected.ty),
                ));
            }
            for argument in &expected.arguments {
                match actual.argument(&argument.name) {
                    None => self.error(conformance(
                        expected,
                        format!("is missing argument `{}`", argument.name),
                    )),
                    Some(found) if found.ty != argument.ty => self.error(conformance(
                        expected,
                        format!(
                            "declares argument `{}` as `{}`, expected `{}`",
                            argument.name, found.ty, argument.ty
                        ),
                    )),
                    Some(_) => {}
                }
            }
            for extra in &actual.arguments {
                if expected.argument(&extra.name).is_none() && extra.is_required() {
                    self.error(conformance(
                        expected,
                        format!("adds required argument `{}`", extra.name),
                    ));
                }
            }
        }

        // Interfaces implemented by the interface must be listed too.
        for inherited in &interface.implements {
            if !object.implements(&inherited.name) && inherited.name != object.name {
                self.diagnostics.error(
                    codes::CONFORMANCE,
                    "interface conformance",
                    at,
                    format!(
                        "`{}` implements `{}` and must also implement `{}`",
                        object.name, interface.name, inherited.name
                    ),
                );
            }
        }
    }

    fn check_input_values(
        &mut self,
        owner: &str,
        values: &[InputValueDefinition],
        placement: DirectiveLocation,
    ) {
        let mut seen = FxHashSet::default();
        for value in values {
            self.check_reserved(&value.name, value.location);
            if !seen.insert(value.name.as_str()) {
                self.error(SemanticError::DuplicateField {
                    owner: owner.to_string(),
                    name: value.name.clone(),
                    location: value.location,
                });
            }
            if let Some(found) = self.registry.kind_of(&value.ty.name) {
                if !found.is_input() {
                    self.error(SemanticError::KindMismatch {
                        name: value.ty.name.clone(),
                        expected: "an input type".to_string(),
                        found,
                        location: value.location,
                    });
                    continue;
                }
            }
            self.check_usages(&value.directives, placement);
            if let Some(default) = &value.default_value {
                let mut usages = Vec::new();
                ValueChecker {
                    registry: self.registry,
                    diagnostics: &mut self.diagnostics,
                    usages: &mut usages,
                }
                .check_value(default, &value.ty, false, value.location);
            }
        }
    }

    fn check_directive_definition(&mut self, directive: &DirectiveDefinition) {
        self.check_reserved(&directive.name, directive.location);
        if directive.locations.is_empty() {
            self.empty(&format!("@{}", directive.name), "location", directive.location);
        }
        self.check_input_values(
            &format!("@{}", directive.name),
            &directive.arguments,
            DirectiveLocation::ArgumentDefinition,
        );
    }

    fn check_roots(&mut self) {
        let registry = self.registry;
        for (_, root) in registry.explicit_roots() {
            match registry.kind_of(&root.name) {
                Some(TypeKind::Object) | None => {}
                Some(found) => self.error(SemanticError::KindMismatch {
                    name: root.name.clone(),
                    expected: "an object type".to_string(),
                    found,
                    location: root.location,
                }),
            }
        }
    }

    fn check_usages(&mut self, directives: &[DirectiveUsage], placement: DirectiveLocation) {
        if directives.is_empty() {
            return;
        }
        // Schema directive arguments are constant; any variable is a
        // syntax error already.
        let mut usages = Vec::new();
        ValueChecker {
            registry: self.registry,
            diagnostics: &mut self.diagnostics,
            usages: &mut usages,
        }
        .check_directives(directives, placement);
    }
}

/// Returns true if a field of type `actual` may implement an interface field
/// of type `expected`.
///
/// The named type and the list depth must match; `actual` may add non-null
/// at any level.
#[must_use]
pub fn is_covariant(actual: &TypeReference, expected: &TypeReference) -> bool {
    if actual.name != expected.name || actual.list_depth() != expected.list_depth() {
        return false;
    }
    if expected.non_null && !actual.non_null {
        return false;
    }
    actual
        .element_non_null
        .iter()
        .zip(&expected.element_non_null)
        .all(|(actual, expected)| *actual || !*expected)
}

/// Validates a registry.
pub fn validate(registry: &TypeRegistry) -> CheckResult {
    Validator::new(registry).check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{parse_documents, SourceDocument};

    fn check_source(source: &str) -> DiagnosticBag {
        let (documents, diagnostics) = parse_documents(&[SourceDocument::new(0, "schema.graphql", source)]);
        assert!(!diagnostics.has_errors(), "{diagnostics:?}");
        let built = TypeRegistry::build(&documents);
        let mut all = built.diagnostics;
        all.append(validate(&built.registry).diagnostics);
        all
    }

    fn codes_of(bag: &DiagnosticBag) -> Vec<&str> {
        bag.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_valid_schema_has_no_diagnostics() {
        let diagnostics = check_source(
            r#"
            interface Node { id: ID! }
            type User implements Node { id: ID! name(upper: Boolean = false): String @deprecated }
            enum Role { ADMIN USER }
            input Filter { role: Role = ADMIN, limit: Int = 10 }
            union Result = User
            type Query { user(id: ID!): User, search(filter: Filter): [Result!]! }
            "#,
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_missing_interface_field_names_field() {
        let diagnostics = check_source("interface Node { id: ID! } type User implements Node { name: String }");
        let errors: Vec<_> = diagnostics.with_code(codes::CONFORMANCE).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("field `id`"));
    }

    #[test]
    fn test_covariance() {
        let named = TypeReference::named;
        assert!(is_covariant(&named("ID").non_null(), &named("ID")));
        assert!(!is_covariant(&named("ID"), &named("ID").non_null()));
        assert!(!is_covariant(&named("String"), &named("ID")));
        assert!(is_covariant(
            &TypeReference::list(named("ID").non_null()),
            &TypeReference::list(named("ID"))
        ));
        assert!(!is_covariant(&TypeReference::list(named("ID")), &named("ID")));
    }

    #[test]
    fn test_conformance_argument_mismatch() {
        let diagnostics = check_source(
            "interface Named { name(short: Boolean): String } type User implements Named { name(short: Int): String }",
        );
        assert_eq!(codes_of(&diagnostics), vec![codes::CONFORMANCE]);
    }

    #[test]
    fn test_union_member_must_be_object() {
        let diagnostics = check_source("scalar Date type A { a: Int } union U = A | Date");
        let errors: Vec<_> = diagnostics.with_code(codes::KIND_MISMATCH).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("`Date`"));
    }

    #[test]
    fn test_input_and_output_positions() {
        let diagnostics = check_source("type A { a: Int } input I { a: A } type B { b(i: I): I }");
        let names: Vec<_> = diagnostics
            .with_code(codes::KIND_MISMATCH)
            .map(|d| d.to_string())
            .collect();
        assert_eq!(names.len(), 2);
        // Types are visited in name order: `B` before `I`.
        assert!(names[0].contains("`I` is input object, expected an output type"), "{names:?}");
        assert!(names[1].contains("`A` is object, expected an input type"), "{names:?}");
    }

    #[test]
    fn test_duplicates_and_reserved_names() {
        let diagnostics = check_source("type A { a: Int a: String __b: Int } enum E { X X }");
        assert_eq!(diagnostics.with_code(codes::DUPLICATE_FIELD).count(), 2);
        assert_eq!(diagnostics.with_code(codes::RESERVED_NAME).count(), 1);
    }

    #[test]
    fn test_invalid_default_value() {
        let diagnostics = check_source(r#"enum Role { ADMIN } input I { role: Role = GUEST, n: Int! = null, s: String = "ok" }"#);
        assert_eq!(diagnostics.with_code(codes::INVALID_VALUE).count(), 2);
    }

    #[test]
    fn test_directive_usage() {
        let diagnostics = check_source(
            "type A @deprecated { a: Int @unknown b: Int @deprecated @deprecated }",
        );
        let codes = codes_of(&diagnostics);
        assert!(codes.contains(&codes::DIRECTIVE_LOCATION));
        assert!(codes.contains(&codes::UNKNOWN_DIRECTIVE));
        assert!(codes.contains(&codes::REPEATED_DIRECTIVE));
    }

    #[test]
    fn test_root_must_be_object() {
        let diagnostics = check_source("schema { query: Q } input Q { a: Int }");
        assert_eq!(codes_of(&diagnostics), vec![codes::KIND_MISMATCH]);
    }
}
