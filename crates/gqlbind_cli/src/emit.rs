//! Writes generated files under the output directory.

use crate::CliError;
use gqlbind_codegen::{GeneratedOutput, GENERATED_HEADER};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
    /// Files from an earlier run that the current output no longer has.
    pub removed: Vec<PathBuf>,
}

fn target_path(dir: &Path, relative: &str) -> PathBuf {
    relative.split('/').fold(dir.to_path_buf(), |path, part| path.join(part))
}

/// Whether the first line of `path` carries the generated-file header.
fn is_generated(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).is_ok() && first.contains(GENERATED_HEADER)
}

/// Deletes generated files below `dir` that are not in `keep`. Files
/// without the header are never touched.
fn prune(dir: &Path, keep: &BTreeSet<PathBuf>) -> Result<Vec<PathBuf>, CliError> {
    let mut removed = Vec::new();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .build();
    for entry in walker {
        let entry = entry.map_err(|source| CliError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        if !is_file || keep.contains(path) || !is_generated(path) {
            continue;
        }
        std::fs::remove_file(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "removed stale file");
        removed.push(path.to_path_buf());
    }
    removed.sort();
    Ok(removed)
}

/// Writes every file of `output` below `dir`, creating directories as
/// needed. Files whose contents already match are left untouched, and
/// generated files left over from an earlier run are removed.
pub fn write_output(dir: &Path, output: &GeneratedOutput) -> Result<EmitSummary, CliError> {
    let mut summary = EmitSummary::default();
    let keep: BTreeSet<PathBuf> = output.files.iter().map(|f| target_path(dir, &f.path)).collect();
    if dir.is_dir() {
        summary.removed = prune(dir, &keep)?;
    }

    for file in &output.files {
        let path = target_path(dir, &file.path);
        let io = |source| CliError::Io {
            path: path.clone(),
            source,
        };

        if std::fs::read_to_string(&path).is_ok_and(|existing| existing == file.contents) {
            summary.unchanged += 1;
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(&path, &file.contents).map_err(io)?;
        tracing::debug!(path = %path.display(), "wrote");
        summary.written.push(path);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlbind_codegen::GeneratedFile;
    use gqlbind_core::DiagnosticBag;

    fn output() -> GeneratedOutput {
        GeneratedOutput {
            files: vec![
                GeneratedFile {
                    path: "types/User.ts".to_string(),
                    contents: "export interface User {}\n".to_string(),
                },
                GeneratedFile {
                    path: "index.ts".to_string(),
                    contents: "export * from \"./types/User\";\n".to_string(),
                },
            ],
            diagnostics: DiagnosticBag::new(),
        }
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let summary = write_output(dir.path(), &output()).unwrap();

        assert_eq!(summary.written.len(), 2);
        let user = std::fs::read_to_string(dir.path().join("types").join("User.ts")).unwrap();
        assert_eq!(user, "export interface User {}\n");
    }

    #[test]
    fn test_unchanged_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_output(dir.path(), &output()).unwrap();

        let mut changed = output();
        changed.files[1].contents.push_str("export * from \"./types/Post\";\n");
        let summary = write_output(dir.path(), &changed).unwrap();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.written, vec![dir.path().join("index.ts")]);
        assert!(summary.removed.is_empty());
    }

    #[test]
    fn test_stale_generated_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut previous = output();
        previous.files.push(GeneratedFile {
            path: "operations/GetUser.ts".to_string(),
            contents: format!("// {GENERATED_HEADER}\nexport const GetUserDocument = ``;\n"),
        });
        write_output(dir.path(), &previous).unwrap();
        let handwritten = dir.path().join("operations").join("client.ts");
        std::fs::write(&handwritten, "export const client = 1;\n").unwrap();

        let summary = write_output(dir.path(), &output()).unwrap();
        assert_eq!(summary.removed, vec![dir.path().join("operations").join("GetUser.ts")]);
        assert!(handwritten.is_file());
        assert!(dir.path().join("index.ts").is_file());
    }
}
