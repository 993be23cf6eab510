//! Canonical printing of schemas and request documents.
//!
//! Schema output lists user directive definitions, the schema block and
//! every user type in name order, so two registries built from the same
//! documents in any order print identically.

use crate::binder::{BoundFragmentDefinition, BoundOperation, BoundSelection};
use crate::hir::{
    write_quoted, Argument, DirectiveDefinition, DirectiveUsage, FieldDefinition,
    InputValueDefinition, ObjectType, TypeDefinition,
};
use crate::types::TypeRegistry;
use std::collections::BTreeMap;

/// Prints the user-declared part of a registry as SDL.
#[must_use]
pub fn print_schema(registry: &TypeRegistry) -> String {
    let mut printer = Printer::new();
    printer.format_schema(registry);
    printer.finish()
}

/// Prints the request document of an operation, followed by every fragment
/// it uses in name order.
#[must_use]
pub fn print_operation(
    operation: &BoundOperation,
    fragments: &BTreeMap<String, BoundFragmentDefinition>,
) -> String {
    let mut printer = Printer::new();
    printer.format_operation(operation);
    for name in &operation.fragments {
        if let Some(fragment) = fragments.get(name) {
            printer.blank_line();
            printer.format_fragment(fragment);
        }
    }
    printer.finish()
}

struct Printer {
    output: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    fn finish(mut self) -> String {
        if !self.output.ends_with('\n') {
            self.output.push('\n');
        }
        self.output
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }

    fn blank_line(&mut self) {
        if !self.output.is_empty() {
            self.output.push_str("\n\n");
        }
    }

    fn format_schema(&mut self, registry: &TypeRegistry) {
        for directive in registry.directives().filter(|d| !d.location.is_builtin()) {
            self.blank_line();
            self.format_directive_definition(directive);
        }

        if registry.has_schema_definition() {
            self.blank_line();
            self.output.push_str("schema");
            self.format_directives(registry.schema_directives());
            self.output.push_str(" {\n");
            self.indent += 1;
            for (operation, root) in registry.explicit_roots() {
                self.push_indent();
                self.output.push_str(operation.as_str());
                self.output.push_str(": ");
                self.output.push_str(&root.name);
                self.output.push('\n');
            }
            self.indent -= 1;
            self.output.push('}');
        }

        for def in registry.user_types() {
            self.blank_line();
            self.format_type_definition(def);
        }
    }

    fn format_description(&mut self, description: Option<&str>) {
        let Some(description) = description else {
            return;
        };
        if description.contains('\n') {
            self.output.push_str("\"\"\"\n");
            for line in description.lines() {
                if !line.is_empty() {
                    self.push_indent();
                    self.output.push_str(&line.replace("\"\"\"", "\\\"\"\""));
                }
                self.output.push('\n');
            }
            self.push_indent();
            self.output.push_str("\"\"\"");
        } else {
            // Writing into a String cannot fail.
            let _ = write_quoted(&mut self.output, description);
        }
        self.output.push('\n');
        self.push_indent();
    }

    fn format_type_definition(&mut self, def: &TypeDefinition) {
        self.format_description(def.description());
        match def {
            TypeDefinition::Scalar(scalar) => {
                self.output.push_str("scalar ");
                self.output.push_str(&scalar.name);
                self.format_directives(&scalar.directives);
            }
            TypeDefinition::Object(object) => self.format_object("type", object),
            TypeDefinition::Interface(interface) => self.format_object("interface", interface),
            TypeDefinition::Union(union) => {
                self.output.push_str("union ");
                self.output.push_str(&union.name);
                self.format_directives(&union.directives);
                for (i, member) in union.members.iter().enumerate() {
                    self.output.push_str(if i == 0 { " = " } else { " | " });
                    self.output.push_str(&member.name);
                }
            }
            TypeDefinition::Enum(enum_type) => {
                self.output.push_str("enum ");
                self.output.push_str(&enum_type.name);
                self.format_directives(&enum_type.directives);
                self.output.push_str(" {\n");
                self.indent += 1;
                for value in &enum_type.values {
                    self.push_indent();
                    self.format_description(value.description.as_deref());
                    self.output.push_str(&value.name);
                    self.format_directives(&value.directives);
                    self.output.push('\n');
                }
                self.indent -= 1;
                self.output.push('}');
            }
            TypeDefinition::InputObject(input) => {
                self.output.push_str("input ");
                self.output.push_str(&input.name);
                self.format_directives(&input.directives);
                self.output.push_str(" {\n");
                self.indent += 1;
                for field in &input.fields {
                    self.push_indent();
                    self.format_description(field.description.as_deref());
                    self.format_input_value(field);
                    self.output.push('\n');
                }
                self.indent -= 1;
                self.output.push('}');
            }
        }
    }

    fn format_object(&mut self, keyword: &str, object: &ObjectType) {
        self.output.push_str(keyword);
        self.output.push(' ');
        self.output.push_str(&object.name);
        for (i, interface) in object.implements.iter().enumerate() {
            self.output.push_str(if i == 0 { " implements " } else { " & " });
            self.output.push_str(&interface.name);
        }
        self.format_directives(&object.directives);
        self.output.push_str(" {\n");
        self.indent += 1;
        for field in &object.fields {
            self.format_field_definition(field);
        }
        self.indent -= 1;
        self.output.push('}');
    }

    fn format_field_definition(&mut self, field: &FieldDefinition) {
        self.push_indent();
        self.format_description(field.description.as_deref());
        self.output.push_str(&field.name);
        self.format_argument_definitions(&field.arguments);
        self.output.push_str(": ");
        self.output.push_str(&field.ty.to_string());
        self.format_directives(&field.directives);
        self.output.push('\n');
    }

    fn format_argument_definitions(&mut self, arguments: &[InputValueDefinition]) {
        if arguments.is_empty() {
            return;
        }
        self.output.push('(');
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.format_input_value(argument);
        }
        self.output.push(')');
    }

    fn format_input_value(&mut self, value: &InputValueDefinition) {
        self.output.push_str(&value.name);
        self.output.push_str(": ");
        self.output.push_str(&value.ty.to_string());
        if let Some(default) = &value.default_value {
            self.output.push_str(" = ");
            self.output.push_str(&default.to_string());
        }
        self.format_directives(&value.directives);
    }

    fn format_directive_definition(&mut self, directive: &DirectiveDefinition) {
        self.format_description(directive.description.as_deref());
        self.output.push_str("directive @");
        self.output.push_str(&directive.name);
        self.format_argument_definitions(&directive.arguments);
        if directive.repeatable {
            self.output.push_str(" repeatable");
        }
        for (i, location) in directive.locations.iter().enumerate() {
            self.output.push_str(if i == 0 { " on " } else { " | " });
            self.output.push_str(location.as_str());
        }
    }

    fn format_directives(&mut self, directives: &[DirectiveUsage]) {
        for directive in directives {
            self.output.push_str(" @");
            self.output.push_str(&directive.name);
            self.format_arguments(&directive.arguments);
        }
    }

    fn format_arguments(&mut self, arguments: &[Argument]) {
        if arguments.is_empty() {
            return;
        }
        self.output.push('(');
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(&argument.name);
            self.output.push_str(": ");
            self.output.push_str(&argument.value.to_string());
        }
        self.output.push(')');
    }

    fn format_operation(&mut self, operation: &BoundOperation) {
        self.output.push_str(operation.operation_type.as_str());
        self.output.push(' ');
        self.output.push_str(&operation.name);
        if !operation.variables.is_empty() {
            self.output.push('(');
            for (i, variable) in operation.variables.iter().enumerate() {
                if i > 0 {
                    self.output.push_str(", ");
                }
                self.output.push('$');
                self.output.push_str(&variable.name);
                self.output.push_str(": ");
                self.output.push_str(&variable.ty.to_string());
                if let Some(default) = &variable.default_value {
                    self.output.push_str(" = ");
                    self.output.push_str(&default.to_string());
                }
            }
            self.output.push(')');
        }
        self.format_directives(&operation.directives);
        self.format_selection_set(&operation.selections);
    }

    fn format_fragment(&mut self, fragment: &BoundFragmentDefinition) {
        self.output.push_str("fragment ");
        self.output.push_str(&fragment.name);
        self.output.push_str(" on ");
        self.output.push_str(&fragment.type_condition);
        self.format_directives(&fragment.directives);
        self.format_selection_set(&fragment.selections);
    }

    fn format_selection_set(&mut self, selections: &[BoundSelection]) {
        self.output.push_str(" {\n");
        self.indent += 1;
        for selection in selections {
            self.push_indent();
            self.format_selection(selection);
            self.output.push('\n');
        }
        self.indent -= 1;
        self.push_indent();
        self.output.push('}');
    }

    fn format_selection(&mut self, selection: &BoundSelection) {
        match selection {
            BoundSelection::Field(field) => {
                if let Some(alias) = &field.alias {
                    self.output.push_str(alias);
                    self.output.push_str(": ");
                }
                self.output.push_str(&field.field_name);
                self.format_arguments(&field.arguments);
                self.format_directives(&field.directives);
                if !field.selections.is_empty() {
                    self.format_selection_set(&field.selections);
                }
            }
            BoundSelection::Fragment(fragment) => {
                self.output.push_str("...");
                if let Some(name) = &fragment.fragment_name {
                    self.output.push_str(name);
                    self.format_directives(&fragment.directives);
                    return;
                }
                if let Some(condition) = &fragment.type_condition {
                    self.output.push_str(" on ");
                    self.output.push_str(condition);
                }
                self.format_directives(&fragment.directives);
                self.format_selection_set(&fragment.selections);
            }
        }
    }
}
