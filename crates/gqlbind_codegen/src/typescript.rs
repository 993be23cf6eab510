//! TypeScript backend.
//!
//! Types are plain interfaces and string-literal unions. Responses are
//! checked by generated decoder functions built from the runtime
//! combinators in `runtime.ts`, which throw `ShapeMismatchError` on any
//! value that does not fit the selection.

use crate::mapping::ScalarTarget;
use crate::naming::camel_case;
use crate::shape::{FieldPlan, ObjectPlan, ShapePlan, UnionPlan};
use crate::writer::CodeWriter;
use crate::{
    deprecation_reason, wrap_type, Backend, Context, Declaration, GeneratedFile, TypeConverter,
    GENERATED_HEADER,
};
use gqlbind_semantic::binder::TYPENAME;
use gqlbind_semantic::hir::{
    EnumType, InputObjectType, ObjectType, ScalarType, TypeDefinition, TypeKind, TypeReference,
};
use gqlbind_semantic::BoundOperation;
use std::collections::{BTreeMap, BTreeSet};

const RUNTIME: &str = "../runtime";

/// Where the file being rendered lives.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Folder {
    Types,
    Operations,
}

/// Named imports grouped by module specifier.
#[derive(Default)]
struct Imports {
    modules: BTreeMap<String, BTreeSet<String>>,
}

impl Imports {
    fn add(&mut self, module: impl Into<String>, name: impl Into<String>) {
        self.modules.entry(module.into()).or_default().insert(name.into());
    }

    fn runtime(&mut self, name: &str) {
        self.add(RUNTIME, name);
    }

    fn render(&self, w: &mut CodeWriter) {
        for (module, names) in &self.modules {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            w.line(format!("import {{ {} }} from \"{module}\";", names.join(", ")));
        }
    }
}

pub(crate) struct TypeScriptGenerator<'a> {
    cx: Context<'a>,
}

impl TypeConverter for TypeScriptGenerator<'_> {
    fn convert_named(&self, name: &str) -> String {
        match self.cx.scalar(name) {
            Some(ScalarTarget::Builtin(native)) => native.to_string(),
            _ => name.to_string(),
        }
    }

    fn list_of(&self, inner: String) -> String {
        if inner.contains(' ') {
            format!("Array<{inner}>")
        } else {
            format!("{inner}[]")
        }
    }

    fn nullable(&self, inner: String) -> String {
        format!("{inner} | null")
    }
}

impl<'a> TypeScriptGenerator<'a> {
    pub(crate) fn new(cx: Context<'a>) -> Self {
        Self { cx }
    }

    fn module_of(folder: Folder, name: &str) -> String {
        match folder {
            Folder::Types => format!("./{name}"),
            Folder::Operations => format!("../types/{name}"),
        }
    }

    fn is_builtin(&self, name: &str) -> bool {
        matches!(self.cx.scalar(name), Some(ScalarTarget::Builtin(_)))
    }

    /// Converts `ty`, importing its named type when it lives in another file.
    fn type_ref(&self, ty: &TypeReference, imports: &mut Imports, folder: Folder, current: &str) -> String {
        if !self.is_builtin(&ty.name) && ty.name != current {
            imports.add(Self::module_of(folder, &ty.name), format!("type {}", ty.name));
        }
        self.convert_type(ty)
    }

    fn leaf_decoder(&self, name: &str, imports: &mut Imports, folder: Folder) -> String {
        let builtin = match name {
            "String" | "ID" => Some("expectString"),
            "Int" => Some("expectInt"),
            "Float" => Some("expectFloat"),
            "Boolean" => Some("expectBoolean"),
            _ => None,
        };
        match builtin {
            Some(function) if self.is_builtin(name) => {
                imports.runtime(function);
                function.to_string()
            }
            _ => {
                let function = format!("decode{name}");
                imports.add(Self::module_of(folder, name), function.clone());
                function
            }
        }
    }

    /// Wraps a leaf decoder with the list and null structure of `ty`.
    fn decoder(ty: &TypeReference, leaf: String, imports: &mut Imports) -> String {
        if ty.is_list() {
            imports.runtime("list");
        }
        if !ty.non_null || ty.element_non_null.contains(&false) {
            imports.runtime("nullable");
        }
        wrap_type(ty, leaf, |t| format!("list({t})"), |t| format!("nullable({t})"))
    }

    /// The encoder for a named input type, or `None` when values pass through.
    fn leaf_encoder(&self, name: &str, imports: &mut Imports, folder: Folder, current: &str) -> Option<String> {
        let needs_encoder = match self.cx.kind(name) {
            Some(TypeKind::Scalar) => !self.is_builtin(name),
            Some(TypeKind::InputObject) => true,
            _ => false,
        };
        if !needs_encoder {
            return None;
        }
        let function = format!("encode{name}");
        if name != current {
            imports.add(Self::module_of(folder, name), function.clone());
        }
        Some(function)
    }

    fn encode_expr(
        &self,
        ty: &TypeReference,
        value: &str,
        optional: bool,
        imports: &mut Imports,
        folder: Folder,
        current: &str,
    ) -> String {
        let Some(leaf) = self.leaf_encoder(&ty.name, imports, folder, current) else {
            return value.to_string();
        };
        if ty.is_list() {
            imports.runtime("encodeList");
        }
        if !ty.non_null || ty.element_non_null.contains(&false) {
            imports.runtime("encodeNullable");
        }
        let encoder = wrap_type(
            ty,
            leaf,
            |t| format!("encodeList({t})"),
            |t| format!("encodeNullable({t})"),
        );
        if optional {
            format!("{value} === undefined ? undefined : {encoder}({value})")
        } else {
            format!("{encoder}({value})")
        }
    }

    fn jsdoc(w: &mut CodeWriter, description: Option<&str>, deprecated: Option<String>) {
        match (description, &deprecated) {
            (None, None) => {}
            (Some(text), None) if !text.contains('\n') => w.line(format!("/** {text} */")),
            _ => {
                w.line("/**");
                if let Some(text) = description {
                    w.doc(" * ", text);
                }
                if let Some(reason) = deprecated {
                    w.line(format!(" * @deprecated {reason}"));
                }
                w.line(" */");
            }
        }
    }

    fn assemble(imports: &Imports, body: String) -> String {
        let mut w = CodeWriter::new("  ");
        w.line(format!("// {GENERATED_HEADER}"));
        if !imports.modules.is_empty() {
            w.blank();
            imports.render(&mut w);
        }
        w.blank();
        w.raw(&body);
        w.finish()
    }

    fn render_scalar(&self, scalar: &ScalarType, imports: &mut Imports, w: &mut CodeWriter) {
        let name = &scalar.name;
        imports.runtime("type Decoder");
        imports.runtime("type Encoder");
        imports.runtime("expectPresent");
        Self::jsdoc(w, scalar.description.as_deref(), None);
        match self.cx.scalar(name) {
            Some(ScalarTarget::Mapped(mapping)) => {
                if let Some(module) = &mapping.import {
                    if is_identifier(&mapping.target_type) {
                        imports.add(module.as_str(), format!("type {}", mapping.target_type));
                    }
                    for hook in mapping.serializer.iter().chain(&mapping.deserializer) {
                        imports.add(module.as_str(), hook.as_str());
                    }
                }
                w.line(format!("export type {name} = {};", mapping.target_type));
                w.blank();
                match &mapping.deserializer {
                    Some(deserializer) => w.line(format!(
                        "export const decode{name}: Decoder<{name}> = (value, path) => {deserializer}(expectPresent(value, path));"
                    )),
                    None => w.line(format!(
                        "export const decode{name}: Decoder<{name}> = (value, path) => expectPresent(value, path) as unknown as {name};"
                    )),
                }
                match &mapping.serializer {
                    Some(serializer) => w.line(format!(
                        "export const encode{name}: Encoder<{name}> = (value) => {serializer}(value);"
                    )),
                    None => {
                        imports.runtime("type JsonValue");
                        w.line(format!(
                            "export const encode{name}: Encoder<{name}> = (value) => value as unknown as JsonValue;"
                        ));
                    }
                }
            }
            _ => {
                imports.runtime("type JsonValue");
                w.line(format!("export type {name} = JsonValue;"));
                w.blank();
                w.line(format!("export const decode{name}: Decoder<{name}> = expectPresent;"));
                w.line(format!("export const encode{name}: Encoder<{name}> = (value) => value;"));
            }
        }
    }

    fn render_object(&self, object: &ObjectType, imports: &mut Imports, w: &mut CodeWriter) {
        Self::jsdoc(w, object.description.as_deref(), None);
        w.block(format!("export interface {} {{", object.name), "}", |w| {
            w.line(format!("__typename: \"{}\";", object.name));
            for field in &object.fields {
                Self::jsdoc(w, field.description.as_deref(), deprecation_reason(&field.directives));
                let ty = self.type_ref(&field.ty, imports, Folder::Types, &object.name);
                w.line(format!("{}: {ty};", field.name));
            }
        });
    }

    /// Interfaces and unions become a union of their possible object types.
    fn render_abstract(&self, def: &TypeDefinition, imports: &mut Imports, w: &mut CodeWriter) {
        let name = def.name();
        let possible = self.cx.registry.possible_types(name);
        Self::jsdoc(w, def.description(), None);
        if possible.is_empty() {
            match def.fields() {
                Some(fields) => w.block(format!("export interface {name} {{"), "}", |w| {
                    for field in fields {
                        let ty = self.type_ref(&field.ty, imports, Folder::Types, name);
                        w.line(format!("{}: {ty};", field.name));
                    }
                }),
                None => w.line(format!("export type {name} = never;")),
            }
            return;
        }
        for member in &possible {
            imports.add(Self::module_of(Folder::Types, member), format!("type {member}"));
        }
        w.line(format!("export type {name} = {};", possible.join(" | ")));
    }

    fn render_input(&self, input: &InputObjectType, imports: &mut Imports, w: &mut CodeWriter) {
        let name = &input.name;
        Self::jsdoc(w, input.description.as_deref(), None);
        w.block(format!("export interface {name} {{"), "}", |w| {
            for field in &input.fields {
                Self::jsdoc(w, field.description.as_deref(), deprecation_reason(&field.directives));
                let ty = self.type_ref(&field.ty, imports, Folder::Types, name);
                if field.is_required() {
                    w.line(format!("{}: {ty};", field.name));
                } else {
                    w.line(format!("{}?: {ty};", field.name));
                }
            }
        });
        w.blank();

        let required: Vec<_> = input.fields.iter().filter(|f| f.is_required()).collect();
        let optional: Vec<_> = input.fields.iter().filter(|f| !f.is_required()).collect();
        w.block(format!("export class {name}Builder {{"), "}", |w| {
            w.line(format!("private readonly fields: Partial<{name}>;"));
            w.blank();
            let params: Vec<String> = required
                .iter()
                .map(|f| format!("{}: {}", f.name, self.convert_type(&f.ty)))
                .collect();
            let names: Vec<&str> = required.iter().map(|f| f.name.as_str()).collect();
            w.block(format!("constructor({}) {{", params.join(", ")), "}", |w| {
                if names.is_empty() {
                    w.line("this.fields = {};");
                } else {
                    w.line(format!("this.fields = {{ {} }};", names.join(", ")));
                }
            });
            for field in &optional {
                w.blank();
                let ty = self.convert_type(&field.ty);
                w.block(format!("{}(value: {ty}): this {{", field.name), "}", |w| {
                    w.line(format!("this.fields.{} = value;", field.name));
                    w.line("return this;");
                });
            }
            w.blank();
            w.block(format!("build(): {name} {{"), "}", |w| {
                w.line(format!("return {{ ...this.fields }} as {name};"));
            });
        });
        w.blank();

        imports.runtime("type JsonValue");
        imports.runtime("compact");
        w.block(format!("export function encode{name}(value: {name}): JsonValue {{"), "}", |w| {
            w.line("return compact({");
            w.indent();
            for field in &input.fields {
                let access = format!("value.{}", field.name);
                let expr = self.encode_expr(&field.ty, &access, !field.is_required(), imports, Folder::Types, name);
                w.line(format!("{}: {expr},", field.name));
            }
            w.dedent();
            w.line("});");
        });
    }

    fn render_enum_type(def: &EnumType, imports: &mut Imports, w: &mut CodeWriter) {
        let name = &def.name;
        let values: Vec<String> = def.values.iter().map(|v| format!("\"{}\"", v.name)).collect();
        imports.runtime("type Decoder");
        imports.runtime("expectOneOf");
        Self::jsdoc(w, def.description.as_deref(), None);
        w.line(format!("export const {name}Values = [{}] as const;", values.join(", ")));
        w.blank();
        w.line(format!("export type {name} = (typeof {name}Values)[number];"));
        w.blank();
        w.line(format!("export const decode{name}: Decoder<{name}> = expectOneOf({name}Values);"));
    }

    fn field_type(&self, field: &FieldPlan<'_>, imports: &mut Imports) -> String {
        match &field.nested {
            Some(nested) => self.wrap(&field.field.ty, nested.clone()),
            None if field.field.field_name == TYPENAME => {
                self.wrap(&field.field.ty, "string".to_string())
            }
            None => self.type_ref(&field.field.ty, imports, Folder::Operations, ""),
        }
    }

    fn field_decoder(&self, field: &FieldPlan<'_>, imports: &mut Imports) -> String {
        let leaf = match &field.nested {
            Some(nested) => format!("decode{nested}"),
            None if field.field.field_name == TYPENAME => {
                imports.runtime("expectString");
                "expectString".to_string()
            }
            None => self.leaf_decoder(&field.field.ty.name, imports, Folder::Operations),
        };
        Self::decoder(&field.field.ty, leaf, imports)
    }

    fn render_object_plan(&self, plan: &ObjectPlan<'_>, imports: &mut Imports, w: &mut CodeWriter) {
        w.block(format!("export interface {} {{", plan.name), "}", |w| {
            for field in &plan.fields {
                let key = &field.field.response_key;
                match plan.typename {
                    Some(typename) if field.is_discriminator() => {
                        w.line(format!("{key}: \"{typename}\";"));
                    }
                    _ => {
                        let ty = self.field_type(field, imports);
                        w.line(format!("{key}: {ty};"));
                    }
                }
            }
        });
        w.blank();

        imports.runtime("expectObject");
        w.block(
            format!("export function decode{0}(value: unknown, path: string): {0} {{", plan.name),
            "}",
            |w| {
                w.line("const object = expectObject(value, path);");
                w.line("return {");
                w.indent();
                for field in &plan.fields {
                    let key = &field.field.response_key;
                    match plan.typename {
                        Some(typename) if field.is_discriminator() => {
                            w.line(format!("{key}: \"{typename}\","));
                        }
                        _ => {
                            imports.runtime("field");
                            let decoder = self.field_decoder(field, imports);
                            w.line(format!("{key}: field(object, \"{key}\", path, {decoder}),"));
                        }
                    }
                }
                w.dedent();
                w.line("};");
            },
        );
    }

    fn render_union_plan(plan: &UnionPlan<'_>, imports: &mut Imports, w: &mut CodeWriter) {
        let members: Vec<&str> = plan.variants.iter().map(|(_, name)| name.as_str()).collect();
        w.line(format!("export type {} = {};", plan.name, members.join(" | ")));
        w.blank();

        imports.runtime("expectObject");
        imports.runtime("typenameOf");
        imports.runtime("ShapeMismatchError");
        let expected: Vec<&str> = plan.variants.iter().map(|(typename, _)| *typename).collect();
        w.block(
            format!("export function decode{0}(value: unknown, path: string): {0} {{", plan.name),
            "}",
            |w| {
                w.line("const object = expectObject(value, path);");
                w.line("const typename = typenameOf(object, path);");
                w.block("switch (typename) {", "}", |w| {
                    for (typename, variant) in &plan.variants {
                        w.line(format!("case \"{typename}\":"));
                        w.indent();
                        w.line(format!("return decode{variant}(object, path);"));
                        w.dedent();
                    }
                    w.line("default:");
                    w.indent();
                    w.line(format!(
                        "throw new ShapeMismatchError(`${{path}}.__typename`, \"one of {}\", typename);",
                        expected.join(", ")
                    ));
                    w.dedent();
                });
            },
        );
    }
}

impl Backend for TypeScriptGenerator<'_> {
    fn file_path(&self, declaration: &Declaration<'_>) -> String {
        match declaration {
            Declaration::Type(def) => format!("types/{}.ts", def.name()),
            Declaration::Operation(op) => format!("operations/{}.ts", op.name),
        }
    }

    fn render_type(&self, def: &TypeDefinition) -> String {
        let mut imports = Imports::default();
        let mut w = CodeWriter::new("  ");
        match def {
            TypeDefinition::Scalar(scalar) => self.render_scalar(scalar, &mut imports, &mut w),
            TypeDefinition::Enum(enum_type) => Self::render_enum_type(enum_type, &mut imports, &mut w),
            TypeDefinition::Object(object) => self.render_object(object, &mut imports, &mut w),
            TypeDefinition::Interface(_) | TypeDefinition::Union(_) => {
                self.render_abstract(def, &mut imports, &mut w);
            }
            TypeDefinition::InputObject(input) => self.render_input(input, &mut imports, &mut w),
        }
        Self::assemble(&imports, w.finish())
    }

    fn render_operation(&self, operation: &BoundOperation, plans: &[ShapePlan<'_>]) -> String {
        let name = &operation.name;
        let mut imports = Imports::default();
        let mut w = CodeWriter::new("  ");

        w.line(format!("export const {name}Document = `{}`;", template_literal(&operation.document)));
        w.blank();

        if operation.variables.is_empty() {
            w.line(format!("export type {name}Variables = Record<string, never>;"));
        } else {
            w.block(format!("export interface {name}Variables {{"), "}", |w| {
                for variable in &operation.variables {
                    let ty = self.type_ref(&variable.ty, &mut imports, Folder::Operations, "");
                    if variable.ty.non_null && variable.default_value.is_none() {
                        w.line(format!("{}: {ty};", variable.name));
                    } else {
                        w.line(format!("{}?: {ty};", variable.name));
                    }
                }
            });
        }
        w.blank();

        let root = plans[0].name();
        for plan in plans {
            match plan {
                ShapePlan::Object(object) => self.render_object_plan(object, &mut imports, &mut w),
                ShapePlan::Union(union) => Self::render_union_plan(union, &mut imports, &mut w),
            }
            w.blank();
        }

        imports.runtime("type GraphQLRequest");
        let request = format!("{}Request", camel_case(name));
        let signature = if operation.variables.is_empty() {
            format!("export function {request}(): GraphQLRequest {{")
        } else {
            format!("export function {request}(variables: {name}Variables): GraphQLRequest {{")
        };
        w.block(signature, "}", |w| {
            w.line("return {");
            w.indent();
            w.line(format!("operationName: \"{name}\","));
            w.line(format!("query: {name}Document,"));
            if operation.variables.is_empty() {
                w.line("variables: {},");
            } else {
                imports.runtime("compact");
                w.line("variables: compact({");
                w.indent();
                for variable in &operation.variables {
                    let access = format!("variables.{}", variable.name);
                    let optional = !variable.ty.non_null || variable.default_value.is_some();
                    let expr = self.encode_expr(&variable.ty, &access, optional, &mut imports, Folder::Operations, "");
                    w.line(format!("{}: {expr},", variable.name));
                }
                w.dedent();
                w.line("}),");
            }
            w.dedent();
            w.line("};");
        });
        w.blank();

        w.block(format!("export function decode{name}(data: unknown): {root} {{"), "}", |w| {
            w.line(format!("return decode{root}(data, \"data\");"));
        });

        Self::assemble(&imports, w.finish())
    }

    fn runtime(&self) -> GeneratedFile {
        GeneratedFile {
            path: "runtime.ts".to_string(),
            contents: format!("// {GENERATED_HEADER}\n\n{RUNTIME_SOURCE}"),
        }
    }

    fn index(&self, declarations: &[Declaration<'_>]) -> GeneratedFile {
        let mut w = CodeWriter::new("  ");
        w.line(format!("// {GENERATED_HEADER}"));
        w.blank();
        w.line("export * from \"./runtime\";");
        for declaration in declarations {
            let path = self.file_path(declaration);
            let module = path.trim_end_matches(".ts");
            w.line(format!("export * from \"./{module}\";"));
        }
        GeneratedFile {
            path: "index.ts".to_string(),
            contents: w.finish(),
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Escapes text for a template literal body.
fn template_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}

const RUNTIME_SOURCE: &str = r#"export type JsonValue =
  | null
  | boolean
  | number
  | string
  | JsonValue[]
  | { [key: string]: JsonValue };

export type Decoder<T> = (value: unknown, path: string) => T;
export type Encoder<T> = (value: T) => JsonValue;

export interface GraphQLRequest {
  operationName: string;
  query: string;
  variables: { [key: string]: JsonValue };
}

/** Thrown when a response does not match the selection it was decoded for. */
export class ShapeMismatchError extends Error {
  readonly path: string;

  constructor(path: string, expected: string, found: unknown) {
    super(`${path}: expected ${expected}, found ${describe(found)}`);
    this.name = "ShapeMismatchError";
    this.path = path;
  }
}

function describe(value: unknown): string {
  if (value === null) return "null";
  if (value === undefined) return "nothing";
  if (Array.isArray(value)) return "a list";
  return `a ${typeof value}`;
}

export function expectString(value: unknown, path: string): string {
  if (typeof value !== "string") throw new ShapeMismatchError(path, "a string", value);
  return value;
}

export function expectInt(value: unknown, path: string): number {
  if (typeof value !== "number" || !Number.isInteger(value)) {
    throw new ShapeMismatchError(path, "an integer", value);
  }
  return value;
}

export function expectFloat(value: unknown, path: string): number {
  if (typeof value !== "number") throw new ShapeMismatchError(path, "a number", value);
  return value;
}

export function expectBoolean(value: unknown, path: string): boolean {
  if (typeof value !== "boolean") throw new ShapeMismatchError(path, "a boolean", value);
  return value;
}

export function expectPresent(value: unknown, path: string): JsonValue {
  if (value === null || value === undefined) throw new ShapeMismatchError(path, "a value", value);
  return value as JsonValue;
}

export function expectObject(value: unknown, path: string): Record<string, unknown> {
  if (typeof value !== "object" || value === null || Array.isArray(value)) {
    throw new ShapeMismatchError(path, "an object", value);
  }
  return value as Record<string, unknown>;
}

export function expectOneOf<T extends string>(values: readonly T[]): Decoder<T> {
  return (value, path) => {
    if (typeof value !== "string" || !(values as readonly string[]).includes(value)) {
      throw new ShapeMismatchError(path, `one of ${values.join(", ")}`, value);
    }
    return value as T;
  };
}

export function nullable<T>(decode: Decoder<T>): Decoder<T | null> {
  return (value, path) => (value === null || value === undefined ? null : decode(value, path));
}

export function list<T>(decode: Decoder<T>): Decoder<T[]> {
  return (value, path) => {
    if (!Array.isArray(value)) throw new ShapeMismatchError(path, "a list", value);
    return value.map((item, index) => decode(item, `${path}[${index}]`));
  };
}

export function field<T>(
  object: Record<string, unknown>,
  key: string,
  path: string,
  decode: Decoder<T>,
): T {
  return decode(object[key], `${path}.${key}`);
}

export function typenameOf(object: Record<string, unknown>, path: string): string {
  return expectString(object["__typename"], `${path}.__typename`);
}

export function encodeNullable<T>(encode: Encoder<T>): Encoder<T | null | undefined> {
  return (value) => (value === null || value === undefined ? null : encode(value));
}

export function encodeList<T>(encode: Encoder<T>): Encoder<readonly T[]> {
  return (value) => value.map(encode);
}

/** Drops keys whose value is undefined. */
export function compact(fields: {
  [key: string]: JsonValue | undefined;
}): { [key: string]: JsonValue } {
  const out: { [key: string]: JsonValue } = {};
  for (const [key, value] of Object.entries(fields)) {
    if (value !== undefined) out[key] = value;
  }
  return out;
}
"#;
