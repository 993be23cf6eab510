use clap::Parser;
use gqlbind_cli::{run, Cli, CliError};
use std::path::Path;

const SCHEMA: &str = "type Query { user(id: ID!): User }\ntype User { id: ID! name: String }\n";
const GET_USER: &str = "query GetUser($id: ID!) { user(id: $id) { id name } }\n";

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

fn run_args(args: &[&str]) -> Result<i32, CliError> {
    let mut argv = vec!["gqlbind", "--quiet"];
    argv.extend_from_slice(args);
    run(Cli::parse_from(argv))
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn generate_writes_files() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.graphql");
    let operations = dir.path().join("operations");
    let out = dir.path().join("out");
    write(&schema, SCHEMA);
    write(&operations.join("get_user.graphql"), GET_USER);

    let code = run_args(&[
        "generate",
        "--target",
        "rust",
        "--output",
        arg(&out),
        arg(&schema),
        arg(&operations),
    ])
    .unwrap();
    assert_eq!(code, 0);

    let operation = std::fs::read_to_string(out.join("operations").join("get_user.rs")).unwrap();
    assert!(operation.contains("pub struct GetUserVariables"));
    assert!(out.join("mod.rs").is_file());
    assert!(out.join("runtime.rs").is_file());
}

#[test]
fn config_file_drives_generation() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("schema.graphql"), SCHEMA);
    write(&dir.path().join("ops/get_user.graphql"), GET_USER);
    let config = dir.path().join("gqlbind.json");
    write(
        &config,
        r#"{
            "schema": "schema.graphql",
            "operations": ["ops"],
            "target": "kotlin",
            "package": "com.example.api",
            "output": "generated"
        }"#,
    );

    let code = run_args(&["--config", arg(&config), "generate"]).unwrap();
    assert_eq!(code, 0);

    let user = std::fs::read_to_string(dir.path().join("generated/types/User.kt")).unwrap();
    assert!(user.contains("package com.example.api"));
}

#[test]
fn fatal_diagnostics_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.graphql");
    let out = dir.path().join("out");
    write(&schema, "type Query { foo: Foo }\n");

    let code = run_args(&["generate", "-o", arg(&out), arg(&schema)]).unwrap();
    assert_eq!(code, 1);
    assert!(!out.exists());
}

#[test]
fn check_reports_errors_through_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.graphql");
    let bad = dir.path().join("bad.graphql");
    write(&good, SCHEMA);
    write(&bad, "interface Node { id: ID! } type Query { n: Node } type Thing implements Node { name: String }\n");

    assert_eq!(run_args(&["check", arg(&good)]).unwrap(), 0);
    assert_eq!(run_args(&["check", "--format", "json", arg(&bad)]).unwrap(), 1);
}

#[test]
fn strict_check_fails_on_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.graphql");
    let operation = dir.path().join("op.graphql");
    write(&schema, SCHEMA);
    write(&operation, "query Unused($id: ID!, $extra: Int) { user(id: $id) { id } }\n");

    assert_eq!(run_args(&["check", arg(&schema), arg(&operation)]).unwrap(), 0);
    assert_eq!(run_args(&["check", "--strict", arg(&schema), arg(&operation)]).unwrap(), 1);
}

#[test]
fn generate_requires_output() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.graphql");
    write(&schema, SCHEMA);

    let error = run_args(&["generate", arg(&schema)]).unwrap_err();
    assert!(matches!(error, CliError::NoOutput));
    assert_eq!(run_args(&["generate", "--dry-run", arg(&schema)]).unwrap(), 0);
}

#[test]
fn missing_input_is_an_error() {
    let error = run_args(&["check", "does/not/exist.graphql"]).unwrap_err();
    assert!(matches!(error, CliError::MissingInput(_)));
}

#[test]
fn config_globs_select_documents() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("schema/query.graphqls"), "type Query { user(id: ID!): User }\n");
    write(&dir.path().join("schema/user.graphqls"), "type User { id: ID! name: String }\n");
    write(&dir.path().join("ops/get_user.graphql"), GET_USER);
    write(&dir.path().join("ops/broken.txt"), "not graphql");
    let config = dir.path().join("gqlbind.json");
    write(
        &config,
        r#"{ "schema": "schema/*.graphqls", "operations": "ops/**/*.graphql", "output": "out" }"#,
    );

    assert_eq!(run_args(&["--config", arg(&config), "generate"]).unwrap(), 0);
    assert!(dir.path().join("out/operations/GetUser.ts").is_file());
}

#[test]
fn regenerating_removes_dropped_operations() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.graphql");
    let operation = dir.path().join("ops/get_user.graphql");
    let out = dir.path().join("out");
    write(&schema, SCHEMA);
    write(&operation, GET_USER);

    let args = ["generate", "-o", arg(&out), arg(&schema), arg(operation.parent().unwrap())];
    assert_eq!(run_args(&args).unwrap(), 0);
    assert!(out.join("operations/GetUser.ts").is_file());

    std::fs::remove_file(&operation).unwrap();
    assert_eq!(run_args(&args).unwrap(), 0);
    assert!(!out.join("operations/GetUser.ts").exists());
    assert!(!std::fs::read_to_string(out.join("index.ts")).unwrap().contains("GetUser"));
}
