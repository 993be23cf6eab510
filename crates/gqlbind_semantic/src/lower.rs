//! Lowering from the syntax tree to the HIR.
//!
//! A single recursive fold: every syntax node maps to a fresh, owned HIR
//! node, names are resolved out of the interner and spans become
//! [`Location`]s in the document's source.

use crate::hir;
use gqlbind_core::{Interner, Location, SourceId, Span};
use gqlbind_syntax as ast;

/// Lowers a parsed document.
#[must_use]
pub fn lower(document: &ast::Document, source: SourceId, interner: &Interner) -> hir::HirDocument {
    let cx = Lower { source, interner };
    let mut out = hir::HirDocument::new(source);

    for definition in &document.definitions {
        match definition {
            ast::Definition::Schema(schema) => out.schemas.push(cx.schema(schema, false)),
            ast::Definition::SchemaExtension(schema) => out.schemas.push(cx.schema(schema, true)),
            ast::Definition::Type(def) => out.types.push(cx.type_definition(def)),
            ast::Definition::TypeExtension(def) => out.extensions.push(cx.type_definition(def)),
            ast::Definition::Directive(def) => out.directives.push(cx.directive_definition(def)),
            ast::Definition::Operation(op) => out.operations.push(cx.operation(op)),
            ast::Definition::Fragment(fragment) => out.fragments.push(cx.fragment(fragment)),
        }
    }

    out
}

struct Lower<'a> {
    source: SourceId,
    interner: &'a Interner,
}

impl Lower<'_> {
    fn location(&self, span: Span) -> Location {
        Location::new(self.source, span)
    }

    fn name(&self, name: &ast::Name) -> String {
        self.interner.get(name.value)
    }

    fn named_ref(&self, name: &ast::Name) -> hir::NamedRef {
        hir::NamedRef {
            name: self.name(name),
            location: self.location(name.span),
        }
    }

    fn description(description: Option<&ast::Description>) -> Option<String> {
        description.map(|d| d.value.clone())
    }

    fn schema(&self, schema: &ast::SchemaDefinition, extension: bool) -> hir::SchemaDefinition {
        hir::SchemaDefinition {
            description: Self::description(schema.description.as_ref()),
            directives: self.directives(&schema.directives),
            roots: schema
                .operations
                .iter()
                .map(|op| (op.operation, self.named_ref(&op.type_name)))
                .collect(),
            extension,
            location: self.location(schema.span),
        }
    }

    fn type_definition(&self, def: &ast::TypeDefinition) -> hir::TypeDefinition {
        match def {
            ast::TypeDefinition::Scalar(t) => hir::TypeDefinition::Scalar(hir::ScalarType {
                name: self.name(&t.name),
                description: Self::description(t.description.as_ref()),
                directives: self.directives(&t.directives),
                location: self.location(t.span),
            }),
            ast::TypeDefinition::Object(t) => hir::TypeDefinition::Object(self.object(t)),
            ast::TypeDefinition::Interface(t) => hir::TypeDefinition::Interface(self.object(t)),
            ast::TypeDefinition::Union(t) => hir::TypeDefinition::Union(hir::UnionType {
                name: self.name(&t.name),
                description: Self::description(t.description.as_ref()),
                directives: self.directives(&t.directives),
                members: t.members.iter().map(|m| self.named_ref(m)).collect(),
                location: self.location(t.span),
            }),
            ast::TypeDefinition::Enum(t) => hir::TypeDefinition::Enum(hir::EnumType {
                name: self.name(&t.name),
                description: Self::description(t.description.as_ref()),
                directives: self.directives(&t.directives),
                values: t
                    .values
                    .iter()
                    .map(|v| hir::EnumValueDefinition {
                        name: self.name(&v.name),
                        description: Self::description(v.description.as_ref()),
                        directives: self.directives(&v.directives),
                        location: self.location(v.span),
                    })
                    .collect(),
                location: self.location(t.span),
            }),
            ast::TypeDefinition::Input(t) => hir::TypeDefinition::InputObject(hir::InputObjectType {
                name: self.name(&t.name),
                description: Self::description(t.description.as_ref()),
                directives: self.directives(&t.directives),
                fields: self.input_values(&t.fields),
                location: self.location(t.span),
            }),
        }
    }

    fn object(&self, t: &ast::ObjectTypeDefinition) -> hir::ObjectType {
        hir::ObjectType {
            name: self.name(&t.name),
            description: Self::description(t.description.as_ref()),
            implements: t.implements.iter().map(|i| self.named_ref(i)).collect(),
            directives: self.directives(&t.directives),
            fields: t
                .fields
                .iter()
                .map(|f| hir::FieldDefinition {
                    name: self.name(&f.name),
                    description: Self::description(f.description.as_ref()),
                    arguments: self.input_values(&f.arguments),
                    ty: self.type_reference(&f.ty),
                    directives: self.directives(&f.directives),
                    location: self.location(f.span),
                })
                .collect(),
            location: self.location(t.span),
        }
    }

    fn input_values(&self, values: &[ast::InputValueDefinition]) -> Vec<hir::InputValueDefinition> {
        values
            .iter()
            .map(|v| hir::InputValueDefinition {
                name: self.name(&v.name),
                description: Self::description(v.description.as_ref()),
                ty: self.type_reference(&v.ty),
                default_value: v.default_value.as_ref().map(|d| self.value(d)),
                directives: self.directives(&v.directives),
                location: self.location(v.span),
            })
            .collect()
    }

    fn directive_definition(&self, def: &ast::DirectiveDefinitionNode) -> hir::DirectiveDefinition {
        hir::DirectiveDefinition {
            name: self.name(&def.name),
            description: Self::description(def.description.as_ref()),
            arguments: self.input_values(&def.arguments),
            locations: def.locations.iter().map(|(l, _)| *l).collect(),
            repeatable: def.repeatable,
            location: self.location(def.span),
        }
    }

    fn type_reference(&self, ty: &ast::Type) -> hir::TypeReference {
        match ty {
            ast::Type::Named(name) => hir::TypeReference::named(self.name(name)),
            ast::Type::List(inner, _) => hir::TypeReference::list(self.type_reference(inner)),
            ast::Type::NonNull(inner, _) => self.type_reference(inner).non_null(),
        }
    }

    fn value(&self, value: &ast::Value) -> hir::Value {
        match value {
            ast::Value::Variable(name) => hir::Value::Variable(self.name(name)),
            ast::Value::Int(v, _) => hir::Value::Int(*v),
            ast::Value::Float(v, _) => hir::Value::Float(*v),
            ast::Value::String(v, _) => hir::Value::String(v.clone()),
            ast::Value::Boolean(v, _) => hir::Value::Boolean(*v),
            ast::Value::Null(_) => hir::Value::Null,
            ast::Value::Enum(name) => hir::Value::Enum(self.name(name)),
            ast::Value::List(values, _) => {
                hir::Value::List(values.iter().map(|v| self.value(v)).collect())
            }
            ast::Value::Object(fields, _) => hir::Value::Object(
                fields
                    .iter()
                    .map(|(name, v)| (self.name(name), self.value(v)))
                    .collect(),
            ),
        }
    }

    fn arguments(&self, arguments: &[ast::Argument]) -> Vec<hir::Argument> {
        arguments
            .iter()
            .map(|a| hir::Argument {
                name: self.name(&a.name),
                value: self.value(&a.value),
                location: self.location(a.span),
            })
            .collect()
    }

    fn directives(&self, directives: &[ast::Directive]) -> Vec<hir::DirectiveUsage> {
        directives
            .iter()
            .map(|d| hir::DirectiveUsage {
                name: self.name(&d.name),
                arguments: self.arguments(&d.arguments),
                location: self.location(d.span),
            })
            .collect()
    }

    fn operation(&self, op: &ast::OperationDefinition) -> hir::OperationDocument {
        hir::OperationDocument {
            operation_type: op.operation,
            name: op.name.as_ref().map(|n| self.name(n)),
            variables: op
                .variables
                .iter()
                .map(|v| hir::VariableDefinition {
                    name: self.name(&v.name),
                    ty: self.type_reference(&v.ty),
                    default_value: v.default_value.as_ref().map(|d| self.value(d)),
                    directives: self.directives(&v.directives),
                    location: self.location(v.span),
                })
                .collect(),
            directives: self.directives(&op.directives),
            selection_set: self.selection_set(&op.selection_set),
            location: self.location(op.span),
        }
    }

    fn fragment(&self, fragment: &ast::FragmentDefinition) -> hir::FragmentDefinition {
        hir::FragmentDefinition {
            name: self.name(&fragment.name),
            type_condition: self.named_ref(&fragment.type_condition),
            directives: self.directives(&fragment.directives),
            selection_set: self.selection_set(&fragment.selection_set),
            location: self.location(fragment.span),
        }
    }

    fn selection_set(&self, set: &ast::SelectionSet) -> Vec<hir::Selection> {
        set.selections.iter().map(|s| self.selection(s)).collect()
    }

    fn selection(&self, selection: &ast::Selection) -> hir::Selection {
        match selection {
            ast::Selection::Field(field) => hir::Selection::Field(hir::FieldSelection {
                alias: field.alias.as_ref().map(|a| self.name(a)),
                name: self.name(&field.name),
                arguments: self.arguments(&field.arguments),
                directives: self.directives(&field.directives),
                selection_set: field
                    .selection_set
                    .as_ref()
                    .map(|s| self.selection_set(s))
                    .unwrap_or_default(),
                location: self.location(field.span),
            }),
            ast::Selection::FragmentSpread(spread) => {
                hir::Selection::FragmentSpread(hir::FragmentSpread {
                    name: self.name(&spread.name),
                    directives: self.directives(&spread.directives),
                    location: self.location(spread.span),
                })
            }
            ast::Selection::InlineFragment(inline) => {
                hir::Selection::InlineFragment(hir::InlineFragment {
                    type_condition: inline.type_condition.as_ref().map(|t| self.named_ref(t)),
                    directives: self.directives(&inline.directives),
                    selection_set: self.selection_set(&inline.selection_set),
                    location: self.location(inline.span),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_source(source: &str) -> hir::HirDocument {
        let interner = Interner::new();
        let parsed = gqlbind_syntax::parse(source, SourceId::from_raw(0), &interner);
        assert!(!parsed.diagnostics.has_errors());
        lower(&parsed.document, SourceId::from_raw(0), &interner)
    }

    #[test]
    fn test_lower_splits_definitions_by_role() {
        let doc = lower_source(
            "type User { id: ID! } extend type User { name: String } query Q { me { id } } fragment F on User { id }",
        );
        assert_eq!(doc.types.len(), 1);
        assert_eq!(doc.extensions.len(), 1);
        assert_eq!(doc.operations.len(), 1);
        assert_eq!(doc.fragments.len(), 1);
    }

    #[test]
    fn test_lower_type_reference() {
        let doc = lower_source("type T { f: [[Int!]]! }");
        let field = doc.types[0].field("f").unwrap();
        assert_eq!(field.ty.name, "Int");
        assert!(field.ty.non_null);
        assert_eq!(field.ty.element_non_null, vec![false, true]);
    }

    #[test]
    fn test_lower_values() {
        let doc = lower_source(r#"input I { a: [String] = ["x", "y"] b: Role = ADMIN }"#);
        let hir::TypeDefinition::InputObject(input) = &doc.types[0] else {
            panic!("expected input object");
        };
        assert_eq!(
            input.fields[0].default_value,
            Some(hir::Value::List(vec![
                hir::Value::String("x".to_string()),
                hir::Value::String("y".to_string()),
            ]))
        );
        assert_eq!(
            input.fields[1].default_value,
            Some(hir::Value::Enum("ADMIN".to_string()))
        );
    }
}
