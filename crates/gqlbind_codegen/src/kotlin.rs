//! Kotlin backend (kotlinx.serialization).

use crate::mapping::ScalarTarget;
use crate::naming::kotlin_ident;
use crate::shape::{FieldPlan, ObjectPlan, ShapePlan, UnionPlan};
use crate::writer::CodeWriter;
use crate::{
    deprecation_reason, Backend, Context, Declaration, GeneratedFile, TypeConverter,
    GENERATED_HEADER,
};
use gqlbind_semantic::binder::TYPENAME;
use gqlbind_semantic::hir::{
    EnumType, FieldDefinition, InputObjectType, ObjectType, ScalarType, TypeDefinition,
    TypeReference,
};
use gqlbind_semantic::BoundOperation;
use std::collections::BTreeSet;

const SERIALIZABLE: &str = "kotlinx.serialization.Serializable";
const SERIAL_NAME: &str = "kotlinx.serialization.SerialName";
const JSON_ELEMENT: &str = "kotlinx.serialization.json.JsonElement";

pub(crate) struct KotlinGenerator<'a> {
    cx: Context<'a>,
}

impl TypeConverter for KotlinGenerator<'_> {
    fn convert_named(&self, name: &str) -> String {
        match self.cx.scalar(name) {
            Some(ScalarTarget::Builtin(native)) => native.to_string(),
            _ => name.to_string(),
        }
    }

    fn list_of(&self, inner: String) -> String {
        format!("List<{inner}>")
    }

    fn nullable(&self, inner: String) -> String {
        format!("{inner}?")
    }
}

fn property_ident(name: &str) -> String {
    if name == TYPENAME {
        "typename".to_string()
    } else {
        kotlin_ident(name)
    }
}

fn kdoc(w: &mut CodeWriter, description: Option<&str>) {
    match description {
        None => {}
        Some(text) if !text.contains('\n') => w.line(format!("/** {text} */")),
        Some(text) => {
            w.line("/**");
            w.doc(" * ", text);
            w.line(" */");
        }
    }
}

/// A Kotlin string literal; `$` is escaped so templates never expand.
fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// One constructor parameter.
struct Property {
    ident: String,
    wire: String,
    ty: String,
    overrides: bool,
    description: Option<String>,
    deprecated: Option<String>,
}

impl Property {
    fn render(&self, w: &mut CodeWriter, imports: &mut BTreeSet<&'static str>, terminator: &str) {
        kdoc(w, self.description.as_deref());
        if let Some(reason) = &self.deprecated {
            w.line(format!("@Deprecated({})", string_literal(reason)));
        }
        let mut line = String::new();
        if self.ident.trim_matches('`') != self.wire {
            imports.insert(SERIAL_NAME);
            line.push_str(&format!("@SerialName(\"{}\") ", self.wire));
        }
        if self.overrides {
            line.push_str("override ");
        }
        line.push_str(&format!("val {}: {}", self.ident, self.ty));
        if self.ty.ends_with('?') && terminator == "," {
            line.push_str(" = null");
        }
        line.push_str(terminator);
        w.line(line);
    }
}

impl<'a> KotlinGenerator<'a> {
    pub(crate) fn new(cx: Context<'a>) -> Self {
        Self { cx }
    }

    fn assemble(&self, imports: &BTreeSet<&'static str>, extra: &BTreeSet<String>, body: String) -> String {
        let mut w = CodeWriter::new("    ");
        w.line(format!("// {GENERATED_HEADER}"));
        w.line(format!("package {}", self.cx.options.package_name));
        if !imports.is_empty() || !extra.is_empty() {
            w.blank();
            let all: BTreeSet<&str> = imports.iter().copied().chain(extra.iter().map(String::as_str)).collect();
            for import in all {
                w.line(format!("import {import}"));
            }
        }
        w.blank();
        w.raw(&body);
        w.finish()
    }

    fn optional_type(&self, ty: &TypeReference) -> String {
        if ty.non_null {
            format!("{}?", self.convert_type(ty))
        } else {
            self.convert_type(ty)
        }
    }

    fn field_properties(&self, fields: &[FieldDefinition], inherited: &BTreeSet<&str>) -> Vec<Property> {
        fields
            .iter()
            .map(|field| Property {
                ident: property_ident(&field.name),
                wire: field.name.clone(),
                ty: self.convert_type(&field.ty),
                overrides: inherited.contains(field.name.as_str()),
                description: field.description.clone(),
                deprecated: deprecation_reason(&field.directives),
            })
            .collect()
    }

    /// Field names declared by the interfaces `object` implements.
    fn interface_fields(&self, object: &ObjectType) -> BTreeSet<&'a str> {
        let registry = self.cx.registry;
        object
            .implements
            .iter()
            .filter_map(|interface| registry.get(&interface.name)?.fields())
            .flatten()
            .map(|field| field.name.as_str())
            .collect()
    }

    /// Interfaces and unions an object belongs to, in name order.
    fn supertypes(&self, object: &ObjectType) -> Vec<String> {
        let mut supertypes: BTreeSet<String> =
            object.implements.iter().map(|i| i.name.clone()).collect();
        for def in self.cx.registry.user_types() {
            if let TypeDefinition::Union(union) = def {
                if union.members.iter().any(|m| m.name == object.name) {
                    supertypes.insert(union.name.clone());
                }
            }
        }
        supertypes.into_iter().collect()
    }

    fn render_scalar(&self, scalar: &ScalarType, imports: &mut BTreeSet<&'static str>, extra: &mut BTreeSet<String>, w: &mut CodeWriter) {
        kdoc(w, scalar.description.as_deref());
        let name = &scalar.name;
        match self.cx.scalar(name) {
            Some(ScalarTarget::Mapped(mapping)) => {
                if let Some(import) = &mapping.import {
                    extra.insert(import.clone());
                }
                match mapping.serializer.as_ref().or(mapping.deserializer.as_ref()) {
                    Some(serializer) => {
                        imports.insert(SERIALIZABLE);
                        w.line(format!(
                            "typealias {name} = @Serializable(with = {serializer}::class) {}",
                            mapping.target_type
                        ));
                    }
                    None => w.line(format!("typealias {name} = {}", mapping.target_type)),
                }
            }
            _ => {
                imports.insert(JSON_ELEMENT);
                w.line(format!("typealias {name} = JsonElement"));
            }
        }
    }

    fn render_enum(def: &EnumType, imports: &mut BTreeSet<&'static str>, w: &mut CodeWriter) {
        imports.insert(SERIALIZABLE);
        kdoc(w, def.description.as_deref());
        w.line("@Serializable");
        w.block(format!("enum class {} {{", def.name), "}", |w| {
            for value in &def.values {
                kdoc(w, value.description.as_deref());
                if let Some(reason) = deprecation_reason(&value.directives) {
                    w.line(format!("@Deprecated({})", string_literal(&reason)));
                }
                w.line(format!("{},", kotlin_ident(&value.name)));
            }
        });
    }

    fn render_object(&self, object: &ObjectType, imports: &mut BTreeSet<&'static str>, w: &mut CodeWriter) {
        imports.insert(SERIALIZABLE);
        imports.insert(SERIAL_NAME);
        kdoc(w, object.description.as_deref());
        w.line("@Serializable");
        w.line(format!("@SerialName(\"{}\")", object.name));
        w.line(format!("data class {}(", object.name));
        w.indent();
        let inherited = self.interface_fields(object);
        for property in self.field_properties(&object.fields, &inherited) {
            property.render(w, imports, ",");
        }
        w.dedent();
        let supertypes = self.supertypes(object);
        if supertypes.is_empty() {
            w.line(")");
        } else {
            w.line(format!(") : {}", supertypes.join(", ")));
        }
    }

    fn render_interface(&self, interface: &ObjectType, imports: &mut BTreeSet<&'static str>, w: &mut CodeWriter) {
        imports.insert(SERIALIZABLE);
        kdoc(w, interface.description.as_deref());
        w.line("@Serializable");
        let mut open = format!("sealed interface {}", interface.name);
        if !interface.implements.is_empty() {
            let parents: Vec<&str> = interface.implements.iter().map(|i| i.name.as_str()).collect();
            open.push_str(&format!(" : {}", parents.join(", ")));
        }
        open.push_str(" {");
        let inherited = self.interface_fields(interface);
        w.block(open, "}", |w| {
            for property in self.field_properties(&interface.fields, &inherited) {
                property.render(w, imports, "");
            }
        });
    }

    fn render_input(&self, input: &InputObjectType, imports: &mut BTreeSet<&'static str>, w: &mut CodeWriter) {
        imports.insert(SERIALIZABLE);
        let name = &input.name;
        kdoc(w, input.description.as_deref());
        w.line("@Serializable");
        w.line(format!("data class {name}("));
        w.indent();
        for field in &input.fields {
            let ty = if field.is_required() {
                self.convert_type(&field.ty)
            } else {
                self.optional_type(&field.ty)
            };
            let property = Property {
                ident: kotlin_ident(&field.name),
                wire: field.name.clone(),
                ty,
                overrides: false,
                description: field.description.clone(),
                deprecated: deprecation_reason(&field.directives),
            };
            property.render(w, imports, ",");
        }
        w.dedent();
        w.line(") {");
        w.indent();

        let required: Vec<_> = input.fields.iter().filter(|f| f.is_required()).collect();
        let params: Vec<String> = required
            .iter()
            .map(|f| format!("private val {}: {}", kotlin_ident(&f.name), self.convert_type(&f.ty)))
            .collect();
        w.line("/** Collects the optional fields of a value; required fields are constructor parameters. */");
        w.block(format!("class Builder({}) {{", params.join(", ")), "}", |w| {
            let optional: Vec<_> = input.fields.iter().filter(|f| !f.is_required()).collect();
            for field in &optional {
                w.line(format!(
                    "private var {}: {} = null",
                    kotlin_ident(&field.name),
                    self.optional_type(&field.ty)
                ));
            }
            for field in &optional {
                let ident = kotlin_ident(&field.name);
                w.blank();
                w.line(format!(
                    "fun {ident}(value: {}): Builder = apply {{ this.{ident} = value }}",
                    self.optional_type(&field.ty)
                ));
            }
            w.blank();
            w.line(format!("fun build(): {name} = {name}("));
            w.indent();
            for field in &input.fields {
                let ident = kotlin_ident(&field.name);
                w.line(format!("{ident} = {ident},"));
            }
            w.dedent();
            w.line(")");
        });
        w.dedent();
        w.line("}");
    }

    fn plan_property(&self, field: &FieldPlan<'_>) -> Property {
        let ty = match &field.nested {
            Some(nested) => self.wrap(&field.field.ty, nested.clone()),
            None => self.convert_type(&field.field.ty),
        };
        Property {
            ident: property_ident(&field.field.response_key),
            wire: field.field.response_key.clone(),
            ty,
            overrides: field.inherited,
            description: None,
            deprecated: None,
        }
    }

    fn render_object_plan(&self, plan: &ObjectPlan<'_>, imports: &mut BTreeSet<&'static str>, w: &mut CodeWriter) {
        let properties: Vec<Property> = plan
            .fields
            .iter()
            .filter(|f| plan.typename.is_none() || !f.is_discriminator())
            .map(|f| self.plan_property(f))
            .collect();
        w.line("@Serializable");
        if let Some(typename) = plan.typename {
            imports.insert(SERIAL_NAME);
            w.line(format!("@SerialName(\"{typename}\")"));
        }
        let supertype = plan.parent.as_ref().map(|p| format!(" : {p}")).unwrap_or_default();
        if properties.is_empty() {
            let keyword = if plan.typename.is_some() { "object" } else { "class" };
            w.line(format!("{keyword} {}{supertype}", plan.name));
            return;
        }
        w.line(format!("data class {}(", plan.name));
        w.indent();
        for property in &properties {
            property.render(w, imports, ",");
        }
        w.dedent();
        w.line(format!("){supertype}"));
    }

    fn render_union_plan(&self, plan: &UnionPlan<'_>, imports: &mut BTreeSet<&'static str>, w: &mut CodeWriter) {
        let properties: Vec<Property> = plan
            .common
            .iter()
            .filter(|f| !f.is_discriminator())
            .map(|f| self.plan_property(f))
            .collect();
        w.line("@Serializable");
        if properties.is_empty() {
            w.line(format!("sealed interface {}", plan.name));
            return;
        }
        w.block(format!("sealed interface {} {{", plan.name), "}", |w| {
            for property in &properties {
                property.render(w, imports, "");
            }
        });
    }
}

impl Backend for KotlinGenerator<'_> {
    fn file_path(&self, declaration: &Declaration<'_>) -> String {
        match declaration {
            Declaration::Type(def) => format!("types/{}.kt", def.name()),
            Declaration::Operation(op) => format!("operations/{}.kt", op.name),
        }
    }

    fn render_type(&self, def: &TypeDefinition) -> String {
        let mut imports = BTreeSet::new();
        let mut extra = BTreeSet::new();
        let mut w = CodeWriter::new("    ");
        match def {
            TypeDefinition::Scalar(scalar) => self.render_scalar(scalar, &mut imports, &mut extra, &mut w),
            TypeDefinition::Enum(enum_type) => Self::render_enum(enum_type, &mut imports, &mut w),
            TypeDefinition::Object(object) => self.render_object(object, &mut imports, &mut w),
            TypeDefinition::Interface(interface) => self.render_interface(interface, &mut imports, &mut w),
            TypeDefinition::Union(union) => {
                imports.insert(SERIALIZABLE);
                kdoc(&mut w, union.description.as_deref());
                w.line("@Serializable");
                w.line(format!("sealed interface {}", union.name));
            }
            TypeDefinition::InputObject(input) => self.render_input(input, &mut imports, &mut w),
        }
        self.assemble(&imports, &extra, w.finish())
    }

    fn render_operation(&self, operation: &BoundOperation, plans: &[ShapePlan<'_>]) -> String {
        let name = &operation.name;
        let variables = format!("{name}Variables");
        let root = plans[0].name();
        let mut imports: BTreeSet<&'static str> = [SERIALIZABLE, JSON_ELEMENT].into_iter().collect();
        let mut w = CodeWriter::new("    ");

        w.block(format!("object {name} {{"), "}", |w| {
            w.line(format!("const val OPERATION_NAME: String = \"{name}\""));
            w.line(format!("const val DOCUMENT: String = {}", string_literal(&operation.document)));
            w.blank();
            if operation.variables.is_empty() {
                w.line(format!(
                    "fun request(variables: {variables} = {variables}()): GraphQLRequest<{variables}> ="
                ));
            } else {
                w.line(format!("fun request(variables: {variables}): GraphQLRequest<{variables}> ="));
            }
            w.indent();
            w.line("GraphQLRequest(OPERATION_NAME, DOCUMENT, variables)");
            w.dedent();
            w.blank();
            w.line(format!("/** Decodes the `data` member of a `{name}` response. */"));
            w.line(format!(
                "fun decode(data: JsonElement): {root} = decodeShape({root}.serializer(), data)"
            ));
        });
        w.blank();

        w.line("@Serializable");
        if operation.variables.is_empty() {
            w.line(format!("class {variables}"));
        } else {
            w.line(format!("data class {variables}("));
            w.indent();
            for variable in &operation.variables {
                let required = variable.ty.non_null && variable.default_value.is_none();
                let property = Property {
                    ident: kotlin_ident(&variable.name),
                    wire: variable.name.clone(),
                    ty: if required {
                        self.convert_type(&variable.ty)
                    } else {
                        self.optional_type(&variable.ty)
                    },
                    overrides: false,
                    description: None,
                    deprecated: None,
                };
                property.render(&mut w, &mut imports, ",");
            }
            w.dedent();
            w.line(")");
        }

        for plan in plans {
            w.blank();
            match plan {
                ShapePlan::Object(object) => self.render_object_plan(object, &mut imports, &mut w),
                ShapePlan::Union(union) => self.render_union_plan(union, &mut imports, &mut w),
            }
        }

        self.assemble(&imports, &BTreeSet::new(), w.finish())
    }

    fn runtime(&self) -> GeneratedFile {
        let imports = [
            "kotlinx.serialization.DeserializationStrategy",
            "kotlinx.serialization.ExperimentalSerializationApi",
            "kotlinx.serialization.KSerializer",
            SERIALIZABLE,
            "kotlinx.serialization.json.Json",
            JSON_ELEMENT,
        ]
        .into_iter()
        .collect();
        GeneratedFile {
            path: "GraphQLRuntime.kt".to_string(),
            contents: self.assemble(&imports, &BTreeSet::new(), RUNTIME_SOURCE.to_string()),
        }
    }

    fn index(&self, declarations: &[Declaration<'_>]) -> GeneratedFile {
        let mut w = CodeWriter::new("    ");
        w.line("/** Every operation of the schema, by name. */");
        w.block("object GraphQLOperations {", "}", |w| {
            w.line("val documents: Map<String, String> = mapOf(");
            w.indent();
            for declaration in declarations {
                if let Declaration::Operation(op) = declaration {
                    w.line(format!("\"{0}\" to {0}.DOCUMENT,", op.name));
                }
            }
            w.dedent();
            w.line(")");
        });
        GeneratedFile {
            path: "GraphQLOperations.kt".to_string(),
            contents: self.assemble(&BTreeSet::new(), &BTreeSet::new(), w.finish()),
        }
    }
}

const RUNTIME_SOURCE: &str = r#"/** A request body ready to be serialized and posted. */
@Serializable
data class GraphQLRequest<V>(
    val operationName: String,
    val query: String,
    val variables: V,
)

/** Thrown when a response does not match the selection it was decoded for. */
class ShapeMismatchError(message: String, cause: Throwable? = null) : Exception(message, cause)

/** Json configuration shared by every generated operation. */
@OptIn(ExperimentalSerializationApi::class)
val GraphQLJson: Json = Json {
    classDiscriminator = "__typename"
    explicitNulls = false
}

fun <V> encodeRequest(request: GraphQLRequest<V>, variables: KSerializer<V>): JsonElement =
    GraphQLJson.encodeToJsonElement(GraphQLRequest.serializer(variables), request)

fun <T> decodeShape(deserializer: DeserializationStrategy<T>, data: JsonElement): T =
    try {
        GraphQLJson.decodeFromJsonElement(deserializer, data)
    } catch (error: IllegalArgumentException) {
        throw ShapeMismatchError(error.message ?: "response does not match the selection", error)
    }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escapes_templates() {
        assert_eq!(
            string_literal("query A($id: ID!) {\n  a(s: \"x\")\n}\n"),
            "\"query A(\\$id: ID!) {\\n  a(s: \\\"x\\\")\\n}\\n\""
        );
    }
}
