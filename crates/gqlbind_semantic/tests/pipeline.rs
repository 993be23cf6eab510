use gqlbind_core::diagnostics::codes;
use gqlbind_semantic::printer::print_schema;
use gqlbind_semantic::{analyze, Analysis, SourceDocument, TypeKind};

fn run(sources: &[&str]) -> Analysis {
    let documents: Vec<_> = sources
        .iter()
        .enumerate()
        .map(|(i, text)| SourceDocument::new(i, format!("doc{i}.graphql"), *text))
        .collect();
    analyze(&documents)
}

const PARTS: [&str; 4] = [
    "type Query { user(id: ID!): User }",
    "type User implements Node { id: ID! }",
    "extend type User { name: String email: String }",
    "interface Node { id: ID! } extend type User { age: Int }",
];

#[test]
fn registry_is_independent_of_document_order() {
    let forward = run(&PARTS);
    let reversed: Vec<&str> = PARTS.iter().rev().copied().collect();
    let backward = run(&reversed);
    let shuffled = run(&[PARTS[2], PARTS[0], PARTS[3], PARTS[1]]);

    assert!(forward.is_ok(), "{:?}", forward.diagnostics);
    let expected = print_schema(&forward.registry);
    assert_eq!(print_schema(&backward.registry), expected);
    assert_eq!(print_schema(&shuffled.registry), expected);
}

#[test]
fn extension_fields_follow_base_fields_sorted_by_name() {
    let analysis = run(&PARTS);
    let user = analysis.registry.get("User").unwrap();
    let fields: Vec<_> = user.fields().unwrap().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["id", "age", "email", "name"]);
}

#[test]
fn missing_interface_field_is_one_conformance_error() {
    let analysis = run(&["interface Node { id: ID! } type User implements Node { name: String } type Query { u: User }"]);
    let errors: Vec<_> = analysis.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::CONFORMANCE);
    assert!(errors[0].to_string().contains("`id`"));
}

#[test]
fn unknown_type_blocks_freeze() {
    let analysis = run(&["type Query { foo: Foo }"]);
    let errors: Vec<_> = analysis.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::UNKNOWN_TYPE);
    assert!(errors[0].to_string().contains("`Foo`"));
    assert!(!analysis.registry.is_frozen());
}

#[test]
fn union_of_scalar_is_kind_mismatch() {
    let analysis = run(&["type A { a: Int } scalar B union Result = A | B type Query { r: Result }"]);
    let errors: Vec<_> = analysis.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::KIND_MISMATCH);
    assert_eq!(analysis.registry.kind_of("B"), Some(TypeKind::Scalar));
}

#[test]
fn get_user_end_to_end() {
    let analysis = run(&[
        "type Query { user(id: ID!): User } type User { id: ID! name: String }",
        "query GetUser($id: ID!) { user(id: $id) { id name } }",
    ]);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert!(analysis.registry.is_frozen());

    let op = &analysis.operations[0];
    assert_eq!(op.name, "GetUser");
    assert_eq!(op.variable("id").unwrap().ty.to_string(), "ID!");
    let user = op.result_shape.field("user").unwrap();
    assert!(!user.ty.non_null);
    let shape = user.shape.as_ref().unwrap();
    assert!(shape.field("id").unwrap().ty.non_null);
    assert!(!shape.field("name").unwrap().ty.non_null);
    assert_eq!(
        op.document,
        "query GetUser($id: ID!) {\n  user(id: $id) {\n    id\n    name\n  }\n}\n"
    );
}

#[test]
fn extension_before_base_in_separate_documents() {
    let analysis = run(&[
        "extend enum Role { GUEST }",
        "enum Role { ADMIN USER } type Query { role: Role }",
    ]);
    assert!(analysis.is_ok(), "{:?}", analysis.diagnostics);
    let Some(gqlbind_semantic::TypeDefinition::Enum(role)) = analysis.registry.get("Role") else {
        panic!("Role is not an enum");
    };
    let values: Vec<_> = role.values.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(values, vec!["ADMIN", "USER", "GUEST"]);
}

#[test]
fn repeated_directives_from_extensions_are_order_independent() {
    let base = "directive @tag(name: String!) repeatable on OBJECT | ENUM | SCHEMA
                type Query { user: User } type User { id: ID! } enum Role { ADMIN }";
    let first = "extend type User @tag(name: \"b\") extend enum Role @tag(name: \"x\")
                 extend schema @tag(name: \"s2\")";
    let second = "extend type User @tag(name: \"a\") @tag(name: \"c\") extend enum Role @tag(name: \"w\")
                  extend schema @tag(name: \"s1\")";

    let forward = run(&[base, first, second]);
    let backward = run(&[base, second, first]);
    assert!(forward.is_ok(), "{:?}", forward.diagnostics);
    assert!(backward.is_ok(), "{:?}", backward.diagnostics);

    let printed = print_schema(&forward.registry);
    assert_eq!(print_schema(&backward.registry), printed);

    let user = forward.registry.get("User").unwrap();
    let tags: Vec<String> = user.directives().iter().map(|d| d.arguments[0].value.to_string()).collect();
    assert_eq!(tags, vec!["\"a\"", "\"b\"", "\"c\""]);
}

#[test]
fn list_items_do_not_coerce_into_nested_lists() {
    let schema = "type Query { grid(cells: [[Int]]): Int }";
    let accepted = run(&[schema, "query A { grid(cells: [[1], [2, 3]]) } query B { grid(cells: 1) }"]);
    assert!(accepted.is_ok(), "{:?}", accepted.diagnostics);

    let rejected = run(&[schema, "query C { grid(cells: [1, 2]) }"]);
    let errors: Vec<_> = rejected.diagnostics.errors().collect();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.code == codes::INVALID_VALUE));
}
