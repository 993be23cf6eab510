//! Input value checks shared by schema validation and operation binding.

use crate::hir::{Argument, DirectiveUsage, InputValueDefinition, TypeDefinition, TypeReference, Value};
use crate::types::{SemanticError, TypeRegistry};
use gqlbind_core::{diagnostics::codes, DiagnosticBag, Location};
use gqlbind_syntax::DirectiveLocation;
use rustc_hash::FxHashSet;

/// A variable referenced from an argument or input value.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableUsage {
    pub name: String,
    /// The type expected at the place the variable is used.
    pub expected: TypeReference,
    /// Whether that place has its own default value.
    pub has_location_default: bool,
    pub location: Location,
}

/// Checks values against input types, collecting diagnostics and variable
/// usages.
pub(crate) struct ValueChecker<'a> {
    pub registry: &'a TypeRegistry,
    pub diagnostics: &'a mut DiagnosticBag,
    pub usages: &'a mut Vec<VariableUsage>,
}

impl ValueChecker<'_> {
    fn invalid(&mut self, location: Location, message: String) {
        self.diagnostics
            .error(codes::INVALID_VALUE, "invalid value", location, message);
    }

    /// Checks one value against the type expected at `location`.
    pub fn check_value(
        &mut self,
        value: &Value,
        expected: &TypeReference,
        has_location_default: bool,
        location: Location,
    ) {
        match value {
            Value::Variable(name) => {
                self.usages.push(VariableUsage {
                    name: name.clone(),
                    expected: expected.clone(),
                    has_location_default,
                    location,
                });
                return;
            }
            Value::Null => {
                if expected.non_null {
                    self.invalid(location, format!("null is not allowed for `{expected}`"));
                }
                return;
            }
            _ => {}
        }

        if let Some(element) = expected.element() {
            // A single item coerces to a one-element list. Items of a list
            // literal do not: an item of a nested list must be a list.
            match value {
                Value::List(items) => {
                    for item in items {
                        let nested = matches!(item, Value::List(_) | Value::Null | Value::Variable(_));
                        if element.is_list() && !nested {
                            self.invalid(location, format!("expected `{element}`, found {item}"));
                            continue;
                        }
                        self.check_value(item, &element, false, location);
                    }
                }
                other => self.check_value(other, &element, false, location),
            }
            return;
        }

        match self.registry.get(&expected.name) {
            Some(TypeDefinition::Scalar(scalar)) => {
                if !scalar_accepts(&scalar.name, value) {
                    self.invalid(location, format!("expected `{expected}`, found {value}"));
                }
            }
            Some(TypeDefinition::Enum(enum_type)) => match value {
                Value::Enum(name) if enum_type.has_value(name) => {}
                Value::Enum(name) => self.invalid(
                    location,
                    format!("`{name}` is not a value of enum `{}`", enum_type.name),
                ),
                other => self.invalid(location, format!("expected `{expected}`, found {other}")),
            },
            Some(TypeDefinition::InputObject(input)) => {
                let Value::Object(fields) = value else {
                    self.invalid(location, format!("expected `{expected}`, found {value}"));
                    return;
                };
                let mut seen = FxHashSet::default();
                for (name, field_value) in fields {
                    if !seen.insert(name.as_str()) {
                        self.invalid(location, format!("field `{name}` is given more than once"));
                        continue;
                    }
                    match input.field(name) {
                        Some(def) => self.check_value(
                            field_value,
                            &def.ty,
                            def.default_value.is_some(),
                            location,
                        ),
                        None => self.invalid(
                            location,
                            format!("`{}` has no field `{name}`", input.name),
                        ),
                    }
                }
                for def in input.fields.iter().filter(|f| f.is_required()) {
                    if !seen.contains(def.name.as_str()) {
                        self.invalid(
                            location,
                            format!("missing required field `{}` of `{}`", def.name, input.name),
                        );
                    }
                }
            }
            // Unknown names and output types are reported by the reference
            // and position checks.
            _ => {}
        }
    }

    /// Checks provided arguments against their definitions.
    pub fn check_arguments(
        &mut self,
        owner: &str,
        definitions: &[InputValueDefinition],
        arguments: &[Argument],
        location: Location,
    ) {
        let mut seen = FxHashSet::default();
        for argument in arguments {
            if !seen.insert(argument.name.as_str()) {
                self.diagnostics.add(
                    SemanticError::DuplicateName {
                        what: "argument",
                        name: argument.name.clone(),
                        location: argument.location,
                    }
                    .into(),
                );
                continue;
            }
            match definitions.iter().find(|d| d.name == argument.name) {
                Some(def) => self.check_value(
                    &argument.value,
                    &def.ty,
                    def.default_value.is_some(),
                    argument.location,
                ),
                None => self.diagnostics.error(
                    codes::UNKNOWN_ARGUMENT,
                    "unknown argument",
                    argument.location,
                    format!("`{owner}` has no argument `{}`", argument.name),
                ),
            }
        }

        for def in definitions.iter().filter(|d| d.is_required()) {
            if !seen.contains(def.name.as_str()) {
                self.diagnostics.error(
                    codes::MISSING_ARGUMENT,
                    "missing argument",
                    location,
                    format!("`{owner}` requires argument `{}: {}`", def.name, def.ty),
                );
            }
        }
    }

    /// Checks directive usages placed at `placement`.
    pub fn check_directives(&mut self, directives: &[DirectiveUsage], placement: DirectiveLocation) {
        let mut seen = FxHashSet::default();
        for usage in directives {
            let Some(def) = self.registry.directive(&usage.name) else {
                self.diagnostics.error(
                    codes::UNKNOWN_DIRECTIVE,
                    "unknown directive",
                    usage.location,
                    format!("directive `@{}` is not defined", usage.name),
                );
                continue;
            };
            if !def.locations.contains(&placement) {
                self.diagnostics.add(
                    SemanticError::DirectiveLocation {
                        name: usage.name.clone(),
                        placement,
                        location: usage.location,
                    }
                    .into(),
                );
            }
            if !seen.insert(usage.name.as_str()) && !def.repeatable {
                self.diagnostics.error(
                    codes::REPEATED_DIRECTIVE,
                    "repeated directive",
                    usage.location,
                    format!("directive `@{}` is not repeatable", usage.name),
                );
            }
            self.check_arguments(
                &format!("@{}", usage.name),
                &def.arguments,
                &usage.arguments,
                usage.location,
            );
        }
    }
}

/// Literal coercion for the built-in scalars. Custom scalars accept any
/// literal.
fn scalar_accepts(scalar: &str, value: &Value) -> bool {
    match scalar {
        "Int" => matches!(value, Value::Int(v) if i32::try_from(*v).is_ok()),
        "Float" => matches!(value, Value::Int(_) | Value::Float(_)),
        "String" => matches!(value, Value::String(_)),
        "Boolean" => matches!(value, Value::Boolean(_)),
        "ID" => matches!(value, Value::String(_) | Value::Int(_)),
        _ => true,
    }
}

/// Returns true if a variable of type `variable` may be used where
/// `expected` is expected.
///
/// A nullable variable may flow into a non-null position when either side
/// provides a non-null default.
#[must_use]
pub fn is_variable_usage_allowed(
    variable: &TypeReference,
    variable_has_default: bool,
    expected: &TypeReference,
    has_location_default: bool,
) -> bool {
    if expected.non_null && !variable.non_null {
        if !(variable_has_default || has_location_default) {
            return false;
        }
        return are_types_compatible(variable, &expected.nullable());
    }
    are_types_compatible(variable, expected)
}

fn are_types_compatible(variable: &TypeReference, expected: &TypeReference) -> bool {
    if expected.non_null {
        if !variable.non_null {
            return false;
        }
        return are_types_compatible(&variable.nullable(), &expected.nullable());
    }
    if variable.non_null {
        return are_types_compatible(&variable.nullable(), expected);
    }
    match (variable.element(), expected.element()) {
        (Some(variable), Some(expected)) => are_types_compatible(&variable, &expected),
        (None, None) => variable.name == expected.name,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> TypeReference {
        TypeReference::named(name)
    }

    #[test]
    fn test_variable_usage_non_null_rules() {
        let id = named("ID");
        let id_nn = named("ID").non_null();
        assert!(is_variable_usage_allowed(&id_nn, false, &id_nn, false));
        assert!(is_variable_usage_allowed(&id_nn, false, &id, false));
        assert!(!is_variable_usage_allowed(&id, false, &id_nn, false));
        assert!(is_variable_usage_allowed(&id, true, &id_nn, false));
        assert!(is_variable_usage_allowed(&id, false, &id_nn, true));
    }

    #[test]
    fn test_variable_usage_lists() {
        let list = TypeReference::list(named("Int").non_null());
        let loose = TypeReference::list(named("Int"));
        assert!(is_variable_usage_allowed(&list, false, &loose, false));
        assert!(!is_variable_usage_allowed(&loose, false, &list, false));
        assert!(!is_variable_usage_allowed(&named("Int"), false, &loose, false));
        assert!(!is_variable_usage_allowed(&named("String"), false, &named("ID"), false));
    }

    #[test]
    fn test_scalar_literals() {
        assert!(scalar_accepts("Float", &Value::Int(1)));
        assert!(!scalar_accepts("Int", &Value::Int(i64::from(i32::MAX) + 1)));
        assert!(scalar_accepts("ID", &Value::Int(7)));
        assert!(!scalar_accepts("Boolean", &Value::String("true".to_string())));
        assert!(scalar_accepts("DateTime", &Value::String("2024".to_string())));
    }
}
