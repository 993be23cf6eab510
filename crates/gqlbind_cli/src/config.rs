//! `gqlbind.json` and the documents it points at.
//!
//! ```json
//! {
//!   "schema": "schema.graphql",
//!   "operations": ["operations/"],
//!   "target": "kotlin",
//!   "package": "com.example.api",
//!   "output": "src/generated",
//!   "scalars": { "DateTime": { "type": "Instant", "import": "kotlinx.datetime.Instant" } }
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file.
//! An input is a file, a directory searched recursively for `.graphql`,
//! `.graphqls` and `.gql` files, or a glob such as `schema/**/*.graphqls`.
//! Symlinked directories are not followed.

use crate::CliError;
use gqlbind_codegen::{CodegenOptions, Language, ScalarMapping};
use gqlbind_semantic::SourceDocument;
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE: &str = "gqlbind.json";

/// What a directory input matches below itself.
const DOCUMENT_GLOB: &str = "**/*.{graphql,graphqls,gql}";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(deserialize_with = "one_or_many")]
    pub schema: Vec<PathBuf>,
    #[serde(deserialize_with = "one_or_many")]
    pub operations: Vec<PathBuf>,
    pub target: Option<Language>,
    pub package: Option<String>,
    pub output: Option<PathBuf>,
    pub scalars: BTreeMap<String, ScalarMapping>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// Replaces both `schema` and `operations` when non-empty.
    pub inputs: Vec<PathBuf>,
    pub target: Option<Language>,
    pub package: Option<String>,
    pub output: Option<PathBuf>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Paths {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    Ok(match Paths::deserialize(deserializer)? {
        Paths::One(path) => vec![path],
        Paths::Many(paths) => paths,
    })
}

impl Config {
    /// Parses a config from JSON text.
    pub fn from_json(path: &Path, text: &str) -> Result<Self, CliError> {
        serde_json::from_str(text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads a config file and resolves its paths against its directory.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(path, &text)?;
        let base = path.parent().unwrap_or(Path::new(""));
        Ok(config.rebase(base))
    }

    /// Loads `explicit`, or `gqlbind.json` in the working directory if present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "loading config");
            return Self::load(path);
        }
        let default = Path::new(CONFIG_FILE);
        if default.is_file() {
            tracing::debug!(path = CONFIG_FILE, "loading config");
            return Self::load(default);
        }
        Ok(Self::default())
    }

    fn rebase(mut self, base: &Path) -> Self {
        let join = |path: &mut PathBuf| *path = base.join(&*path);
        self.schema.iter_mut().for_each(join);
        self.operations.iter_mut().for_each(join);
        self.output.iter_mut().for_each(join);
        self
    }

    #[must_use]
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if !overrides.inputs.is_empty() {
            self.schema = overrides.inputs;
            self.operations.clear();
        }
        if overrides.target.is_some() {
            self.target = overrides.target;
        }
        if overrides.package.is_some() {
            self.package = overrides.package;
        }
        if overrides.output.is_some() {
            self.output = overrides.output;
        }
        self
    }

    /// Every input path, schema first.
    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        self.schema.iter().chain(&self.operations).map(PathBuf::as_path)
    }

    pub fn language(&self) -> Language {
        self.target.unwrap_or(Language::TypeScript)
    }

    pub fn codegen_options(&self) -> CodegenOptions {
        let mut options = CodegenOptions::default();
        if let Some(package) = &self.package {
            options.package_name.clone_from(package);
        }
        options.scalars.clone_from(&self.scalars);
        options
    }
}

fn has_glob_chars(text: &str) -> bool {
    text.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
}

fn matcher(pattern: &str) -> Result<GlobMatcher, CliError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| CliError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Splits a glob into the directory to walk and the pattern below it.
fn split_pattern(path: &Path) -> (PathBuf, String) {
    let mut root = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !has_glob_chars(&text) {
            root.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }
    (root, rest.join("/"))
}

/// Adds the files below `root` whose relative path matches `glob` and
/// returns how many matched.
fn walk(root: &Path, glob: &GlobMatcher, files: &mut BTreeSet<PathBuf>) -> Result<usize, CliError> {
    let start = if root.as_os_str().is_empty() { Path::new(".") } else { root };
    if !start.is_dir() {
        return Ok(0);
    }

    let walker = WalkBuilder::new(start)
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .build();
    let mut matched = 0;
    for entry in walker {
        let entry = entry.map_err(|source| CliError::Walk {
            path: start.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(start) else {
            continue;
        };
        if path.is_file() && glob.is_match(relative) {
            files.insert(root.join(relative));
            matched += 1;
        }
    }
    Ok(matched)
}

/// Expands `paths` into the sorted, de-duplicated set of document files.
/// A glob that matches nothing is an error, like a missing file.
pub fn expand<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<BTreeSet<PathBuf>, CliError> {
    let documents = matcher(DOCUMENT_GLOB)?;
    let mut files = BTreeSet::new();
    for path in paths {
        if path.is_file() {
            files.insert(path.to_path_buf());
        } else if path.is_dir() {
            walk(path, &documents, &mut files)?;
        } else if has_glob_chars(&path.to_string_lossy()) {
            let (root, pattern) = split_pattern(path);
            if walk(&root, &matcher(&pattern)?, &mut files)? == 0 {
                return Err(CliError::MissingInput(path.to_path_buf()));
            }
        } else {
            return Err(CliError::MissingInput(path.to_path_buf()));
        }
    }
    Ok(files)
}

/// Reads every input document. Source ids follow sorted path order, so
/// diagnostics and output do not depend on argument order.
pub fn load_sources(config: &Config) -> Result<Vec<SourceDocument>, CliError> {
    let files = expand(config.inputs())?;
    if files.is_empty() {
        return Err(CliError::NoInputs);
    }

    files
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(SourceDocument::new(index, path.display().to_string(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, text: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_parse_config() {
        let config = Config::from_json(
            Path::new("gqlbind.json"),
            r#"{
                "schema": "schema.graphql",
                "operations": ["a.graphql", "b.graphql"],
                "target": "kotlin",
                "package": "com.example",
                "scalars": { "DateTime": { "type": "Instant", "import": "kotlinx.datetime.Instant" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.schema, vec![PathBuf::from("schema.graphql")]);
        assert_eq!(config.operations.len(), 2);
        assert_eq!(config.language(), Language::Kotlin);
        let options = config.codegen_options();
        assert_eq!(options.package_name, "com.example");
        assert_eq!(
            options.scalars["DateTime"],
            ScalarMapping::new("Instant").with_import("kotlinx.datetime.Instant")
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let error = Config::from_json(Path::new("gqlbind.json"), r#"{ "schemas": [] }"#).unwrap_err();
        assert!(matches!(error, CliError::Config { .. }));
    }

    #[test]
    fn test_load_rebases_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        touch(&path, r#"{ "schema": "schema.graphql", "output": "out" }"#);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.schema, vec![dir.path().join("schema.graphql")]);
        assert_eq!(config.output, Some(dir.path().join("out")));
    }

    #[test]
    fn test_overrides_win() {
        let config = Config {
            schema: vec![PathBuf::from("a.graphql")],
            operations: vec![PathBuf::from("ops")],
            target: Some(Language::Rust),
            ..Config::default()
        };
        let config = config.apply(Overrides {
            inputs: vec![PathBuf::from("b.graphql")],
            target: Some(Language::Kotlin),
            ..Overrides::default()
        });
        assert_eq!(config.inputs().collect::<Vec<_>>(), vec![Path::new("b.graphql")]);
        assert_eq!(config.language(), Language::Kotlin);
    }

    #[test]
    fn test_sources_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("ops/b.graphql"), "query B { b }");
        touch(&dir.path().join("ops/nested/a.gql"), "query A { a }");
        touch(&dir.path().join("ops/notes.md"), "ignored");
        touch(&dir.path().join("schema.graphql"), "type Query { a: Int b: Int }");

        let config = Config {
            schema: vec![dir.path().join("schema.graphql")],
            operations: vec![dir.path().join("ops"), dir.path().join("ops/b.graphql")],
            ..Config::default()
        };
        let sources = load_sources(&config).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|s| Path::new(&s.path).strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("ops/b.graphql"),
                PathBuf::from("ops/nested/a.gql"),
                PathBuf::from("schema.graphql"),
            ]
        );
        assert_eq!(sources[2].id.as_raw(), 2);
    }

    #[test]
    fn test_glob_inputs() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("schema/user.graphqls"), "type User { id: ID! }");
        touch(&dir.path().join("schema/nested/query.graphqls"), "type Query { user: User }");
        touch(&dir.path().join("schema/draft.graphql"), "type Draft { id: ID! }");
        touch(&dir.path().join("ops/a.gql"), "query A { user { id } }");
        touch(&dir.path().join("ops/b.graphql"), "query B { user { id } }");
        touch(&dir.path().join("ops/deep/c.graphql"), "query C { user { id } }");

        let files = expand([
            dir.path().join("schema/**/*.graphqls").as_path(),
            dir.path().join("ops/*.{gql,graphql}").as_path(),
        ])
        .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("ops/a.gql"),
                PathBuf::from("ops/b.graphql"),
                PathBuf::from("schema/nested/query.graphqls"),
                PathBuf::from("schema/user.graphqls"),
            ]
        );

        let unmatched = dir.path().join("schema/*.json");
        assert!(matches!(expand([unmatched.as_path()]), Err(CliError::MissingInput(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("ops/a.graphql"), "query A { a }");
        std::os::unix::fs::symlink(dir.path().join("ops"), dir.path().join("ops/loop")).unwrap();

        let files = expand([dir.path().join("ops").as_path()]).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec![dir.path().join("ops/a.graphql")]);
    }

    #[test]
    fn test_missing_input() {
        let config = Config {
            schema: vec![PathBuf::from("does/not/exist.graphql")],
            ..Config::default()
        };
        assert!(matches!(load_sources(&config), Err(CliError::MissingInput(_))));
        assert!(matches!(load_sources(&Config::default()), Err(CliError::NoInputs)));
    }
}
