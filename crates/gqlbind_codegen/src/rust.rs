//! Rust backend.
//!
//! Generated code derives serde's traits; decoding goes through
//! `serde_json::from_value` and every deserialization failure surfaces as a
//! `ShapeMismatchError`. Abstract types become enums internally tagged by
//! `__typename`.

use crate::mapping::ScalarTarget;
use crate::naming::{pascal_case, rust_ident, screaming_snake_case, snake_case};
use crate::shape::{FieldPlan, ObjectPlan, ShapePlan, UnionPlan};
use crate::writer::CodeWriter;
use crate::{
    deprecation_reason, Backend, Context, Declaration, GeneratedFile, TypeConverter,
    GENERATED_HEADER,
};
use gqlbind_semantic::binder::TYPENAME;
use gqlbind_semantic::hir::{
    EnumType, FieldDefinition, InputObjectType, ObjectType, ScalarType, TypeDefinition,
    TypeKind, TypeReference,
};
use gqlbind_semantic::BoundOperation;

const DERIVE_RECORD: &str = "#[derive(Debug, Clone, Serialize, Deserialize)]";

pub(crate) struct RustGenerator<'a> {
    cx: Context<'a>,
}

impl TypeConverter for RustGenerator<'_> {
    fn convert_named(&self, name: &str) -> String {
        match self.cx.scalar(name) {
            Some(ScalarTarget::Builtin(native)) => native.to_string(),
            _ => rust_ident(name),
        }
    }

    fn list_of(&self, inner: String) -> String {
        format!("Vec<{inner}>")
    }

    fn nullable(&self, inner: String) -> String {
        format!("Option<{inner}>")
    }
}

fn field_ident(name: &str) -> String {
    if name == TYPENAME {
        "typename".to_string()
    } else {
        rust_ident(&snake_case(name))
    }
}

fn module_ident(name: &str) -> String {
    rust_ident(&snake_case(name))
}

/// A `serde(rename)` attribute when the Rust name differs from the wire name.
fn rename(w: &mut CodeWriter, ident: &str, wire: &str) {
    if ident.trim_start_matches("r#") != wire {
        w.line(format!("#[serde(rename = \"{wire}\")]"));
    }
}

fn doc(w: &mut CodeWriter, description: Option<&str>, deprecated: Option<String>) {
    if let Some(text) = description {
        w.doc("/// ", text);
    }
    if let Some(reason) = deprecated {
        if description.is_some() {
            w.line("///");
        }
        w.line(format!("/// Deprecated: {reason}"));
    }
}

/// A raw string literal that can hold `text` unchanged.
fn raw_string(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    let mut after_quote = false;
    for c in text.chars() {
        if c == '"' {
            after_quote = true;
            run = 0;
        } else if c == '#' && after_quote {
            run += 1;
            longest = longest.max(run);
        } else {
            after_quote = false;
            run = 0;
        }
    }
    let hashes = "#".repeat(longest + 1);
    format!("r{hashes}\"{text}\"{hashes}")
}

impl<'a> RustGenerator<'a> {
    pub(crate) fn new(cx: Context<'a>) -> Self {
        Self { cx }
    }

    /// Schema record fields box non-list composite values so recursive
    /// types have a finite size.
    fn record_type(&self, ty: &TypeReference) -> String {
        let named = self.convert_named(&ty.name);
        let boxed = !ty.is_list()
            && matches!(
                self.cx.kind(&ty.name),
                Some(TypeKind::Object | TypeKind::Interface | TypeKind::Union | TypeKind::InputObject)
            );
        if boxed {
            self.wrap(ty, format!("Box<{named}>"))
        } else {
            self.wrap(ty, named)
        }
    }

    fn header(w: &mut CodeWriter, super_path: &str) {
        w.line(format!("//! {GENERATED_HEADER}"));
        w.blank();
        w.line("#[allow(unused_imports)]");
        w.line(format!("use {super_path}*;"));
        w.line("use serde::{Deserialize, Serialize};");
        w.blank();
    }

    fn render_scalar(&self, scalar: &ScalarType, w: &mut CodeWriter) {
        let name = rust_ident(&scalar.name);
        w.line(format!("//! {GENERATED_HEADER}"));
        w.blank();
        match self.cx.scalar(&scalar.name) {
            Some(ScalarTarget::Mapped(mapping)) => {
                if let Some(import) = &mapping.import {
                    w.line(format!("use {import};"));
                    w.blank();
                }
                doc(w, scalar.description.as_deref(), None);
                let target = &mapping.target_type;
                if !mapping.has_hooks() {
                    w.line(format!("pub type {name} = {target};"));
                    return;
                }

                w.line("#[derive(Debug, Clone)]");
                w.line(format!("pub struct {name}(pub {target});"));
                w.blank();
                w.block(format!("impl serde::Serialize for {name} {{"), "}", |w| {
                    w.line("fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {");
                    w.indent();
                    match &mapping.serializer {
                        Some(serializer) => w.line(format!("{serializer}(&self.0, serializer)")),
                        None => w.line("serde::Serialize::serialize(&self.0, serializer)"),
                    }
                    w.dedent();
                    w.line("}");
                });
                w.blank();
                w.block(format!("impl<'de> serde::Deserialize<'de> for {name} {{"), "}", |w| {
                    w.line("fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {");
                    w.indent();
                    match &mapping.deserializer {
                        Some(deserializer) => w.line(format!("{deserializer}(deserializer).map(Self)")),
                        None => w.line(format!(
                            "<{target} as serde::Deserialize>::deserialize(deserializer).map(Self)"
                        )),
                    }
                    w.dedent();
                    w.line("}");
                });
            }
            _ => {
                doc(w, scalar.description.as_deref(), None);
                w.line(format!("pub type {name} = serde_json::Value;"));
            }
        }
    }

    fn render_enum(def: &EnumType, w: &mut CodeWriter) {
        doc(w, def.description.as_deref(), None);
        w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]");
        w.block(format!("pub enum {} {{", rust_ident(&def.name)), "}", |w| {
            for value in &def.values {
                doc(w, value.description.as_deref(), deprecation_reason(&value.directives));
                let ident = rust_ident(&pascal_case(&value.name));
                rename(w, &ident, &value.name);
                w.line(format!("{ident},"));
            }
        });
    }

    fn record_fields(&self, fields: &[FieldDefinition], w: &mut CodeWriter) {
        for field in fields {
            doc(w, field.description.as_deref(), deprecation_reason(&field.directives));
            let ident = field_ident(&field.name);
            rename(w, &ident, &field.name);
            w.line(format!("pub {ident}: {},", self.record_type(&field.ty)));
        }
    }

    fn render_object(&self, object: &ObjectType, w: &mut CodeWriter) {
        doc(w, object.description.as_deref(), None);
        w.line(DERIVE_RECORD);
        w.block(format!("pub struct {} {{", rust_ident(&object.name)), "}", |w| {
            self.record_fields(&object.fields, w);
        });
    }

    /// Interfaces and unions become an enum over their possible types.
    fn render_abstract(&self, def: &TypeDefinition, w: &mut CodeWriter) {
        let name = rust_ident(def.name());
        let possible = self.cx.registry.possible_types(def.name());
        doc(w, def.description(), None);
        w.line(DERIVE_RECORD);
        if possible.is_empty() {
            match def.fields() {
                Some(fields) => w.block(format!("pub struct {name} {{"), "}", |w| {
                    self.record_fields(fields, w);
                }),
                None => w.line(format!("pub enum {name} {{}}")),
            }
            return;
        }
        w.line(format!("#[serde(tag = \"{TYPENAME}\")]"));
        w.block(format!("pub enum {name} {{"), "}", |w| {
            for member in &possible {
                let ident = rust_ident(member);
                rename(w, &ident, member);
                w.line(format!("{ident}({ident}),"));
            }
        });
    }

    fn render_input(&self, input: &InputObjectType, w: &mut CodeWriter) {
        let name = rust_ident(&input.name);
        doc(w, input.description.as_deref(), None);
        w.line(DERIVE_RECORD);
        w.block(format!("pub struct {name} {{"), "}", |w| {
            for field in &input.fields {
                doc(w, field.description.as_deref(), deprecation_reason(&field.directives));
                let ident = field_ident(&field.name);
                rename(w, &ident, &field.name);
                if field.is_required() {
                    w.line(format!("pub {ident}: {},", self.record_type(&field.ty)));
                } else {
                    w.line("#[serde(default, skip_serializing_if = \"Option::is_none\")]");
                    w.line(format!("pub {ident}: {},", self.optional_type(&field.ty)));
                }
            }
        });
        w.blank();

        let required: Vec<_> = input.fields.iter().filter(|f| f.is_required()).collect();
        w.block(format!("impl {name} {{"), "}", |w| {
            let params: Vec<String> = required
                .iter()
                .map(|f| format!("{}: {}", field_ident(&f.name), self.record_type(&f.ty)))
                .collect();
            w.line("/// Starts a value from the required fields; optional fields are unset.");
            w.line("#[must_use]");
            w.block(format!("pub fn new({}) -> Self {{", params.join(", ")), "}", |w| {
                w.block("Self {", "}", |w| {
                    for field in &input.fields {
                        let ident = field_ident(&field.name);
                        if field.is_required() {
                            w.line(format!("{ident},"));
                        } else {
                            w.line(format!("{ident}: None,"));
                        }
                    }
                });
            });
            for field in input.fields.iter().filter(|f| !f.is_required()) {
                w.blank();
                let ident = field_ident(&field.name);
                let value = self.record_type(&field.ty.clone().non_null());
                w.line("#[must_use]");
                w.block(
                    format!("pub fn with_{}(mut self, value: {value}) -> Self {{", snake_case(&field.name)),
                    "}",
                    |w| {
                        w.line(format!("self.{ident} = Some(value);"));
                        w.line("self");
                    },
                );
            }
        });
    }

    /// An optional value: omitted when `None`.
    fn optional_type(&self, ty: &TypeReference) -> String {
        if ty.non_null {
            format!("Option<{}>", self.record_type(ty))
        } else {
            self.record_type(ty)
        }
    }

    fn plan_field_type(&self, field: &FieldPlan<'_>) -> String {
        match &field.nested {
            Some(nested) => self.wrap(&field.field.ty, nested.clone()),
            None => self.convert_type(&field.field.ty),
        }
    }

    fn render_object_plan(&self, plan: &ObjectPlan<'_>, w: &mut CodeWriter) {
        w.line(DERIVE_RECORD);
        let fields: Vec<_> = plan
            .fields
            .iter()
            .filter(|f| plan.typename.is_none() || !f.is_discriminator())
            .collect();
        if fields.is_empty() {
            w.line(format!("pub struct {} {{}}", plan.name));
            return;
        }
        w.block(format!("pub struct {} {{", plan.name), "}", |w| {
            for field in fields {
                let key = &field.field.response_key;
                let ident = field_ident(key);
                rename(w, &ident, key);
                w.line(format!("pub {ident}: {},", self.plan_field_type(field)));
            }
        });
    }

    fn render_union_plan(plan: &UnionPlan<'_>, w: &mut CodeWriter) {
        w.line(DERIVE_RECORD);
        w.line(format!("#[serde(tag = \"{TYPENAME}\")]"));
        w.block(format!("pub enum {} {{", plan.name), "}", |w| {
            for (typename, variant) in &plan.variants {
                let ident = rust_ident(typename);
                rename(w, &ident, typename);
                w.line(format!("{ident}({variant}),"));
            }
        });
    }
}

impl Backend for RustGenerator<'_> {
    fn file_path(&self, declaration: &Declaration<'_>) -> String {
        match declaration {
            Declaration::Type(def) => format!("types/{}.rs", snake_case(def.name())),
            Declaration::Operation(op) => format!("operations/{}.rs", snake_case(&op.name)),
        }
    }

    fn render_type(&self, def: &TypeDefinition) -> String {
        let mut w = CodeWriter::new("    ");
        match def {
            TypeDefinition::Scalar(scalar) => self.render_scalar(scalar, &mut w),
            TypeDefinition::Enum(enum_type) => {
                Self::header(&mut w, "super::");
                Self::render_enum(enum_type, &mut w);
            }
            TypeDefinition::Object(object) => {
                Self::header(&mut w, "super::");
                self.render_object(object, &mut w);
            }
            TypeDefinition::Interface(_) | TypeDefinition::Union(_) => {
                Self::header(&mut w, "super::");
                self.render_abstract(def, &mut w);
            }
            TypeDefinition::InputObject(input) => {
                Self::header(&mut w, "super::");
                self.render_input(input, &mut w);
            }
        }
        w.finish()
    }

    fn render_operation(&self, operation: &BoundOperation, plans: &[ShapePlan<'_>]) -> String {
        let name = &operation.name;
        let snake = snake_case(name);
        let document = format!("{}_DOCUMENT", screaming_snake_case(name));
        let variables = format!("{name}Variables");
        let root = plans[0].name();

        let mut w = CodeWriter::new("    ");
        w.line(format!("//! {GENERATED_HEADER}"));
        w.blank();
        w.line("use super::super::runtime::{GraphQLRequest, ShapeMismatchError};");
        w.line("#[allow(unused_imports)]");
        w.line("use super::super::types::*;");
        w.line("use serde::{Deserialize, Serialize};");
        w.blank();

        w.line(format!("pub const {document}: &str = {};", raw_string(&operation.document)));
        w.blank();

        w.line("#[derive(Debug, Clone, Serialize)]");
        if operation.variables.is_empty() {
            w.line(format!("pub struct {variables} {{}}"));
        } else {
            w.block(format!("pub struct {variables} {{"), "}", |w| {
                for variable in &operation.variables {
                    let ident = field_ident(&variable.name);
                    rename(w, &ident, &variable.name);
                    if variable.ty.non_null && variable.default_value.is_none() {
                        w.line(format!("pub {ident}: {},", self.record_type(&variable.ty)));
                    } else {
                        w.line("#[serde(skip_serializing_if = \"Option::is_none\")]");
                        w.line(format!("pub {ident}: {},", self.optional_type(&variable.ty)));
                    }
                }
            });
        }
        w.blank();

        for plan in plans {
            match plan {
                ShapePlan::Object(object) => self.render_object_plan(object, &mut w),
                ShapePlan::Union(union) => Self::render_union_plan(union, &mut w),
            }
            w.blank();
        }

        w.block(
            format!("pub fn {snake}_request(variables: {variables}) -> GraphQLRequest<{variables}> {{"),
            "}",
            |w| w.line(format!("GraphQLRequest::new(\"{name}\", {document}, variables)")),
        );
        w.blank();
        w.line(format!("/// Decodes the `data` member of a `{name}` response."));
        w.block(
            format!("pub fn decode_{snake}(data: serde_json::Value) -> Result<{root}, ShapeMismatchError> {{"),
            "}",
            |w| w.line("serde_json::from_value(data).map_err(ShapeMismatchError::from)"),
        );
        w.finish()
    }

    fn runtime(&self) -> GeneratedFile {
        GeneratedFile {
            path: "runtime.rs".to_string(),
            contents: format!("//! {GENERATED_HEADER}\n\n{RUNTIME_SOURCE}"),
        }
    }

    fn index(&self, declarations: &[Declaration<'_>]) -> GeneratedFile {
        let mut w = CodeWriter::new("    ");
        w.line(format!("//! {GENERATED_HEADER}"));
        w.line("//!");
        w.line(format!("//! Client for the `{}` schema.", self.cx.options.package_name));
        w.blank();
        w.line("pub mod runtime;");
        w.blank();

        let types: Vec<&str> = declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Type(_)))
            .map(Declaration::name)
            .collect();
        let operations: Vec<&str> = declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Operation(_)))
            .map(Declaration::name)
            .collect();

        w.block("pub mod types {", "}", |w| {
            for name in &types {
                w.line(format!("pub mod {};", module_ident(name)));
            }
            if !types.is_empty() {
                w.blank();
            }
            for name in &types {
                w.line(format!("pub use self::{}::{};", module_ident(name), rust_ident(name)));
            }
        });
        w.blank();
        w.block("pub mod operations {", "}", |w| {
            for name in &operations {
                w.line(format!("pub mod {};", module_ident(name)));
            }
        });

        GeneratedFile {
            path: "mod.rs".to_string(),
            contents: w.finish(),
        }
    }
}

const RUNTIME_SOURCE: &str = r#"use serde::Serialize;
use std::fmt;

/// A request body ready to be serialized and posted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest<V> {
    pub operation_name: &'static str,
    pub query: &'static str,
    pub variables: V,
}

impl<V> GraphQLRequest<V> {
    pub fn new(operation_name: &'static str, query: &'static str, variables: V) -> Self {
        Self {
            operation_name,
            query,
            variables,
        }
    }
}

/// A response that does not match the selection it was decoded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatchError {
    message: String,
}

impl ShapeMismatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ShapeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response does not match the selection: {}", self.message)
    }
}

impl std::error::Error for ShapeMismatchError {}

impl From<serde_json::Error> for ShapeMismatchError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_string_hashes() {
        assert_eq!(raw_string("query A { a }"), "r#\"query A { a }\"#");
        assert_eq!(raw_string("a(s: \"#x\")"), "r##\"a(s: \"#x\")\"##");
    }

    #[test]
    fn test_field_ident() {
        assert_eq!(field_ident("bestFriend"), "best_friend");
        assert_eq!(field_ident("type"), "r#type");
        assert_eq!(field_ident("__typename"), "typename");
    }
}
