use gqlbind_codegen::{CodeGenerator, CodegenError, CodegenOptions, GeneratedOutput, Language, ScalarMapping};
use gqlbind_core::diagnostics::codes;
use gqlbind_semantic::{analyze, Analysis, SourceDocument};

const SCHEMA: &str = "type Query { user(id: ID!): User } type User { id: ID! name: String }";
const GET_USER: &str = "query GetUser($id: ID!) { user(id: $id) { id name } }";

fn run(sources: &[&str]) -> Analysis {
    let documents: Vec<_> = sources
        .iter()
        .enumerate()
        .map(|(i, text)| SourceDocument::new(i, format!("doc{i}.graphql"), *text))
        .collect();
    let analysis = analyze(&documents);
    assert!(analysis.is_ok(), "{:?}", analysis.diagnostics);
    analysis
}

fn generate(analysis: &Analysis, language: Language) -> GeneratedOutput {
    CodeGenerator::new(analysis).generate(language).unwrap()
}

fn file<'a>(output: &'a GeneratedOutput, path: &str) -> &'a str {
    output
        .files
        .iter()
        .find(|f| f.path == path)
        .map(|f| f.contents.as_str())
        .unwrap_or_else(|| panic!("no file {path}"))
}

fn paths(output: &GeneratedOutput) -> Vec<&str> {
    output.files.iter().map(|f| f.path.as_str()).collect()
}

#[test]
fn typescript_get_user() {
    let analysis = run(&[SCHEMA, GET_USER]);
    let output = generate(&analysis, Language::TypeScript);

    assert_eq!(
        paths(&output),
        vec!["types/Query.ts", "types/User.ts", "operations/GetUser.ts", "runtime.ts", "index.ts"]
    );

    let operation = file(&output, "operations/GetUser.ts");
    assert!(operation.contains(
        "export const GetUserDocument = `query GetUser($id: ID!) {\n  user(id: $id) {\n    id\n    name\n  }\n}\n`;"
    ));
    assert!(operation.contains("export interface GetUserVariables {\n  id: string;\n}"));
    assert!(operation.contains("export interface GetUserResult {\n  user: GetUserUser | null;\n}"));
    assert!(operation.contains("export interface GetUserUser {\n  id: string;\n  name: string | null;\n}"));
    assert!(operation.contains("user: field(object, \"user\", path, nullable(decodeGetUserUser)),"));
    assert!(operation.contains("name: field(object, \"name\", path, nullable(expectString)),"));
    assert!(operation.contains("export function getUserRequest(variables: GetUserVariables): GraphQLRequest {"));
    assert!(operation.contains("export function decodeGetUser(data: unknown): GetUserResult {"));

    assert!(file(&output, "runtime.ts").contains("export class ShapeMismatchError extends Error"));
    assert!(file(&output, "index.ts").contains("export * from \"./operations/GetUser\";"));
}

#[test]
fn rust_get_user() {
    let analysis = run(&[SCHEMA, GET_USER]);
    let output = generate(&analysis, Language::Rust);

    assert_eq!(
        paths(&output),
        vec!["types/query.rs", "types/user.rs", "operations/get_user.rs", "runtime.rs", "mod.rs"]
    );

    let operation = file(&output, "operations/get_user.rs");
    assert!(operation.contains("pub const GET_USER_DOCUMENT: &str = r#\"query GetUser($id: ID!) {"));
    assert!(operation.contains("pub struct GetUserVariables {\n    pub id: String,\n}"));
    assert!(operation.contains("pub struct GetUserResult {\n    pub user: Option<GetUserUser>,\n}"));
    assert!(operation.contains("pub struct GetUserUser {\n    pub id: String,\n    pub name: Option<String>,\n}"));
    assert!(operation.contains(
        "pub fn decode_get_user(data: serde_json::Value) -> Result<GetUserResult, ShapeMismatchError> {"
    ));

    assert!(file(&output, "runtime.rs").contains("pub struct ShapeMismatchError"));
    let index = file(&output, "mod.rs");
    assert!(index.contains("pub mod user;"));
    assert!(index.contains("pub use self::user::User;"));
    assert!(index.contains("pub mod get_user;"));
}

#[test]
fn kotlin_get_user() {
    let analysis = run(&[SCHEMA, GET_USER]);
    let options = CodegenOptions {
        package_name: "com.example.api".to_string(),
        ..CodegenOptions::default()
    };
    let output = CodeGenerator::with_options(&analysis, options)
        .generate(Language::Kotlin)
        .unwrap();

    let operation = file(&output, "operations/GetUser.kt");
    assert!(operation.starts_with("// Generated by gqlbind. Do not edit.\npackage com.example.api\n"));
    assert!(operation.contains("const val DOCUMENT: String = \"query GetUser(\\$id: ID!) {\\n"));
    assert!(operation.contains("data class GetUserVariables(\n    val id: String,\n)"));
    assert!(operation.contains("data class GetUserUser(\n    val id: String,\n    val name: String? = null,\n)"));
    assert!(operation.contains("fun decode(data: JsonElement): GetUserResult"));

    let user = file(&output, "types/User.kt");
    assert!(user.contains("@SerialName(\"User\")\ndata class User("));
    assert!(file(&output, "GraphQLRuntime.kt").contains("class ShapeMismatchError"));
    assert!(file(&output, "GraphQLOperations.kt").contains("\"GetUser\" to GetUser.DOCUMENT,"));
}

#[test]
fn generation_is_deterministic() {
    let analysis = run(&[
        "type Query { node(id: ID!): Node search: [SearchResult!]! }
         interface Node { id: ID! }
         type User implements Node { id: ID! name: String role: Role }
         type Post implements Node { id: ID! title: String! }
         union SearchResult = User | Post
         enum Role { ADMIN USER }",
        "query Find($id: ID!) { node(id: $id) { id ... on User { name role } } }
         query SearchAll { search { ... on Post { title } } }",
    ]);
    for language in [Language::TypeScript, Language::Rust, Language::Kotlin] {
        let first = generate(&analysis, language);
        let second = generate(&analysis, language);
        assert_eq!(first.files, second.files, "{language}");
    }
}

#[test]
fn abstract_selections_become_tagged_unions() {
    let analysis = run(&[
        "type Query { node(id: ID!): Node }
         interface Node { id: ID! }
         type User implements Node { id: ID! name: String }
         type Post implements Node { id: ID! title: String! }",
        "query Find($id: ID!) { node(id: $id) { id ... on User { name } } }",
    ]);

    let typescript = generate(&analysis, Language::TypeScript);
    let operation = file(&typescript, "operations/Find.ts");
    assert!(operation.contains("export type FindNode = FindNodePost | FindNodeUser;"));
    assert!(operation.contains("export interface FindNodePost {\n  __typename: \"Post\";\n  id: string;\n}"));
    assert!(operation.contains("case \"User\":\n      return decodeFindNodeUser(object, path);"));
    assert!(operation.contains("\"one of Post, User\""));

    let rust = generate(&analysis, Language::Rust);
    let operation = file(&rust, "operations/find.rs");
    assert!(operation.contains("#[serde(tag = \"__typename\")]\npub enum FindNode {\n    Post(FindNodePost),\n    User(FindNodeUser),\n}"));
    assert!(operation.contains("pub struct FindNodeUser {\n    pub id: String,\n    pub name: Option<String>,\n}"));

    let kotlin = generate(&analysis, Language::Kotlin);
    let operation = file(&kotlin, "operations/Find.kt");
    assert!(operation.contains("sealed interface FindNode {\n    val id: String\n}"));
    assert!(operation.contains(
        "@SerialName(\"User\")\ndata class FindNodeUser(\n    override val id: String,\n    val name: String? = null,\n) : FindNode"
    ));
}

#[test]
fn schema_types_follow_kind_rules() {
    let analysis = run(&[
        "type Query { users(filter: UserFilter): [User!]! }
         type User { id: ID! role: Role! best: User }
         enum Role { ADMIN SUPER_USER }
         input UserFilter { role: Role! name: String limit: Int! = 10 }",
    ]);

    let typescript = generate(&analysis, Language::TypeScript);
    insta::assert_snapshot!(file(&typescript, "types/Role.ts"), @r###"
    // Generated by gqlbind. Do not edit.

    import { expectOneOf, type Decoder } from "../runtime";

    export const RoleValues = ["ADMIN", "SUPER_USER"] as const;

    export type Role = (typeof RoleValues)[number];

    export const decodeRole: Decoder<Role> = expectOneOf(RoleValues);
    "###);
    let filter = file(&typescript, "types/UserFilter.ts");
    assert!(filter.contains("export interface UserFilter {\n  role: Role;\n  name?: string | null;\n  limit?: number;\n}"));
    assert!(filter.contains("constructor(role: Role) {"));
    assert!(filter.contains("limit(value: number): this {"));

    let rust = generate(&analysis, Language::Rust);
    let role = file(&rust, "types/role.rs");
    assert!(role.contains("    #[serde(rename = \"SUPER_USER\")]\n    SuperUser,"));
    let user = file(&rust, "types/user.rs");
    assert!(user.contains("pub best: Option<Box<User>>,"));
    let filter = file(&rust, "types/user_filter.rs");
    assert!(filter.contains("pub fn new(role: Role) -> Self {"));
    assert!(filter.contains("pub fn with_limit(mut self, value: i32) -> Self {"));
    assert!(filter.contains("pub limit: Option<i32>,"));

    let kotlin = generate(&analysis, Language::Kotlin);
    let filter = file(&kotlin, "types/UserFilter.kt");
    assert!(filter.contains("class Builder(private val role: Role) {"));
    assert!(filter.contains("fun limit(value: Int?): Builder = apply { this.limit = value }"));
}

#[test]
fn unmapped_scalar_is_json_with_warning() {
    let analysis = run(&["scalar DateTime scalar Url type Query { at: DateTime url: Url }"]);
    let mut options = CodegenOptions::default();
    options
        .scalars
        .insert("Url".to_string(), ScalarMapping::new("URL"));

    let output = CodeGenerator::with_options(&analysis, options)
        .generate(Language::TypeScript)
        .unwrap();
    let warnings: Vec<_> = output.diagnostics.with_code(codes::UNMAPPED_SCALAR).collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().contains("`DateTime`"));

    assert!(file(&output, "types/DateTime.ts").contains("export type DateTime = JsonValue;"));
    assert!(file(&output, "types/Url.ts").contains("export type Url = URL;"));
}

#[test]
fn scalar_hooks_are_used() {
    let analysis = run(&["scalar DateTime type Query { at: DateTime! }"]);
    let mut options = CodegenOptions::default();
    options.scalars.insert(
        "DateTime".to_string(),
        ScalarMapping::new("chrono::DateTime<chrono::Utc>")
            .with_hooks("crate::time::serialize", "crate::time::deserialize"),
    );
    let output = CodeGenerator::with_options(&analysis, options)
        .generate(Language::Rust)
        .unwrap();
    assert!(output.diagnostics.is_empty());

    let scalar = file(&output, "types/date_time.rs");
    assert!(scalar.contains("pub struct DateTime(pub chrono::DateTime<chrono::Utc>);"));
    assert!(scalar.contains("crate::time::serialize(&self.0, serializer)"));
    assert!(scalar.contains("crate::time::deserialize(deserializer).map(Self)"));
}

#[test]
fn refuses_fatal_diagnostics() {
    let documents = [SourceDocument::new(0, "a.graphql", "type Query { a: Missing }")];
    let analysis = analyze(&documents);
    let error = CodeGenerator::new(&analysis)
        .generate(Language::TypeScript)
        .unwrap_err();
    match error {
        CodegenError::Fatal(fatal) => assert!(fatal.0.has_errors()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejects_mapping_for_non_scalar() {
    let analysis = run(&["type Query { a: Int }"]);
    let mut options = CodegenOptions::default();
    options.scalars.insert("Query".to_string(), ScalarMapping::new("X"));
    options.scalars.insert("Int".to_string(), ScalarMapping::new("bigint"));
    let error = CodeGenerator::with_options(&analysis, options)
        .generate(Language::TypeScript)
        .unwrap_err();
    assert!(matches!(error, CodegenError::InvalidScalarMapping { ref name, .. } if name == "Int"));
}

/// Top-level names each TypeScript file exports.
fn exported_names(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("export ")?;
            let rest = ["interface ", "type ", "const ", "function ", "class "]
                .iter()
                .find_map(|keyword| rest.strip_prefix(keyword))?;
            rest.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).next()
        })
        .collect()
}

#[test]
fn typescript_exports_are_unique_across_index() {
    let analysis = run(&[
        "type Query { search: [SearchResult!]! result: Payload node: User }
         union SearchResult = User | Post
         type User { id: ID! name: String }
         type Post { title: String! }
         type Payload { ok: Boolean! }
         enum Role { ADMIN USER }",
        "query Search { search { ... on User { id } ... on Post { title } } }",
        "query Save { result { ok } }",
        "query Node { node { id } }",
    ]);
    let output = generate(&analysis, Language::TypeScript);

    let mut seen = std::collections::BTreeSet::new();
    for generated in output.files.iter().filter(|f| f.path != "index.ts") {
        for name in exported_names(&generated.contents) {
            assert!(seen.insert(name), "`{name}` exported twice ({})", generated.path);
        }
    }

    let search = file(&output, "operations/Search.ts");
    assert!(search.contains("export function decodeSearch(data: unknown): SearchResult2 {"));
    let save = file(&output, "operations/Save.ts");
    assert!(save.contains("export interface SaveResult {\n  result: SaveResult2 | null;\n}"));
    let node = file(&output, "operations/Node.ts");
    assert!(node.contains("export function decodeNode(data: unknown): NodeResult {"));
}

#[test]
fn rust_and_kotlin_avoid_schema_type_names() {
    let analysis = run(&[
        "type Query { search: [SearchResult!]! } union SearchResult = User | Post
         type User { id: ID! } type Post { title: String! }",
        "query Search { search { ... on User { id } ... on Post { title } } }",
    ]);

    let rust = generate(&analysis, Language::Rust);
    let operation = file(&rust, "operations/search.rs");
    assert!(operation.contains("pub struct SearchResult2 {"));
    assert!(!operation.contains("pub struct SearchResult {"));

    let kotlin = generate(&analysis, Language::Kotlin);
    let operation = file(&kotlin, "operations/Search.kt");
    assert!(operation.contains("data class SearchResult2("));
}

#[test]
fn operation_named_like_a_type_is_rejected() {
    let analysis = run(&[SCHEMA, "query User { user(id: 1) { id } }"]);
    let error = CodeGenerator::new(&analysis).generate(Language::TypeScript).unwrap_err();
    assert!(matches!(error, CodegenError::NameCollision { name } if name == "User"));

    let analysis = run(&["type Query { role: Role } enum Role { A } type RoleValues { x: Int }"]);
    let error = CodeGenerator::new(&analysis).generate(Language::Rust).unwrap_err();
    assert!(matches!(error, CodegenError::NameCollision { name } if name == "RoleValues"));
}

#[test]
fn operations_differing_only_in_case_are_rejected() {
    let analysis = run(&[SCHEMA, GET_USER, "query getUser { user(id: 2) { id } }"]);
    let error = CodeGenerator::new(&analysis).generate(Language::TypeScript).unwrap_err();
    assert!(matches!(error, CodegenError::NameCollision { .. }));
}
