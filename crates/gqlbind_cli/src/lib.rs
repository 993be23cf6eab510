//! Command-line interface for gqlbind.
//!
//! # Usage
//!
//! ```bash
//! # Validate schema and operation documents
//! gqlbind check schema.graphql operations/
//!
//! # Generate a Kotlin client from gqlbind.json
//! gqlbind generate --target kotlin --output src/generated
//!
//! # Print the merged schema
//! gqlbind print-schema schema/
//! ```

pub mod config;
pub mod emit;
pub mod report;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use config::{load_sources, Config, Overrides, CONFIG_FILE};
use gqlbind_codegen::{CodeGenerator, CodegenError, Language};
use gqlbind_core::DiagnosticBag;
use gqlbind_semantic::{analyze, printer::print_schema, Analysis, SourceDocument};
use report::{OutputFormat, Reporter};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot access `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file `{}`", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("input `{}` does not exist or matches no files", .0.display())]
    MissingInput(PathBuf),
    #[error("invalid glob `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("cannot walk `{}`", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
    #[error("no GraphQL documents found; pass paths or set `schema` in {CONFIG_FILE}")]
    NoInputs,
    #[error("no output directory; pass `--output` or set `output` in {CONFIG_FILE}")]
    NoOutput,
    #[error("cannot write JSON report")]
    Json(#[source] serde_json::Error),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

#[derive(Parser, Debug)]
#[command(name = "gqlbind")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to ./gqlbind.json when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Diagnostic output format
    #[arg(long, value_enum, global = true, default_value = "human")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    #[value(alias = "ts")]
    Typescript,
    #[value(alias = "rs")]
    Rust,
    #[value(alias = "kt")]
    Kotlin,
}

impl From<Target> for Language {
    fn from(target: Target) -> Self {
        match target {
            Target::Typescript => Self::TypeScript,
            Target::Rust => Self::Rust,
            Target::Kotlin => Self::Kotlin,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate schema and operation documents
    Check {
        /// Files or directories; replaces the config's inputs
        paths: Vec<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Generate client code
    Generate {
        /// Files or directories; replaces the config's inputs
        paths: Vec<PathBuf>,

        /// Target language
        #[arg(short, long, value_enum)]
        target: Option<Target>,

        /// Package or module name for generated files
        #[arg(short, long)]
        package: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// List the files that would be generated without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the merged schema as canonical SDL
    PrintSchema {
        /// Files or directories; replaces the config's inputs
        paths: Vec<PathBuf>,
    },

    /// Print version information
    Version,
}

/// Options shared by every command.
struct Session {
    format: OutputFormat,
    quiet: bool,
}

impl Session {
    fn report(
        &self,
        sources: &[SourceDocument],
        diagnostics: &DiagnosticBag,
        files: Vec<String>,
    ) -> Result<(), CliError> {
        let reporter = Reporter::new(sources);
        match self.format {
            OutputFormat::Human => reporter.print_human(diagnostics, self.quiet),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&reporter.json(diagnostics, files))
                    .map_err(CliError::Json)?;
                println!("{json}");
            }
        }
        Ok(())
    }

    fn success(&self, message: &str) {
        if self.format == OutputFormat::Human && !self.quiet {
            println!("{} {message}", "Success:".green().bold());
        }
    }
}

/// Runs a command and returns the process exit code.
pub fn run(cli: Cli) -> Result<i32, CliError> {
    let session = Session {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Check { paths, strict } => {
            let config = Config::discover(cli.config.as_deref())?.apply(Overrides {
                inputs: paths,
                ..Overrides::default()
            });
            check(&session, &config, strict)
        }
        Commands::Generate {
            paths,
            target,
            package,
            output,
            dry_run,
        } => {
            let config = Config::discover(cli.config.as_deref())?.apply(Overrides {
                inputs: paths,
                target: target.map(Language::from),
                package,
                output,
            });
            generate(&session, &config, dry_run)
        }
        Commands::PrintSchema { paths } => {
            let config = Config::discover(cli.config.as_deref())?.apply(Overrides {
                inputs: paths,
                ..Overrides::default()
            });
            print(&session, &config)
        }
        Commands::Version => {
            println!("gqlbind {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

fn load(config: &Config) -> Result<(Vec<SourceDocument>, Analysis), CliError> {
    let sources = load_sources(config)?;
    tracing::debug!(documents = sources.len(), "loaded");
    let analysis = analyze(&sources);
    Ok((sources, analysis))
}

fn check(session: &Session, config: &Config, strict: bool) -> Result<i32, CliError> {
    let (sources, analysis) = load(config)?;
    session.report(&sources, &analysis.diagnostics, Vec::new())?;

    let warned = analysis.diagnostics.warnings().next().is_some();
    if analysis.diagnostics.has_errors() || (strict && warned) {
        return Ok(1);
    }
    session.success(&format!("{} document(s) checked", sources.len()));
    Ok(0)
}

fn generate(session: &Session, config: &Config, dry_run: bool) -> Result<i32, CliError> {
    let output_dir = match (&config.output, dry_run) {
        (Some(dir), _) => Some(dir.clone()),
        (None, true) => None,
        (None, false) => return Err(CliError::NoOutput),
    };

    let (sources, analysis) = load(config)?;
    if !analysis.is_ok() {
        session.report(&sources, &analysis.diagnostics, Vec::new())?;
        return Ok(1);
    }

    let language = config.language();
    let generated = CodeGenerator::with_options(&analysis, config.codegen_options()).generate(language)?;
    let mut diagnostics = analysis.diagnostics.clone();
    diagnostics.append(generated.diagnostics.clone());

    let files: Vec<String> = generated.files.iter().map(|f| f.path.clone()).collect();
    match output_dir.filter(|_| !dry_run) {
        Some(dir) => {
            let summary = emit::write_output(&dir, &generated)?;
            tracing::info!(
                target_language = %language,
                written = summary.written.len(),
                unchanged = summary.unchanged,
                removed = summary.removed.len(),
                "generated"
            );
            session.report(&sources, &diagnostics, files)?;
            session.success(&format!(
                "{} file(s) written to {} ({} unchanged, {} removed)",
                summary.written.len(),
                dir.display(),
                summary.unchanged,
                summary.removed.len()
            ));
        }
        None => {
            if session.format == OutputFormat::Human {
                for file in &files {
                    println!("{file}");
                }
            }
            session.report(&sources, &diagnostics, files)?;
        }
    }
    Ok(0)
}

fn print(session: &Session, config: &Config) -> Result<i32, CliError> {
    let (sources, analysis) = load(config)?;
    if !analysis.is_ok() {
        session.report(&sources, &analysis.diagnostics, Vec::new())?;
        return Ok(1);
    }
    print!("{}", print_schema(&analysis.registry));
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::parse_from([
            "gqlbind", "generate", "--target", "kt", "-p", "com.example", "-o", "out", "schema.graphql",
        ]);
        let Commands::Generate {
            paths,
            target,
            package,
            output,
            dry_run,
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(paths, vec![PathBuf::from("schema.graphql")]);
        assert_eq!(target.map(Language::from), Some(Language::Kotlin));
        assert_eq!(package.as_deref(), Some("com.example"));
        assert_eq!(output, Some(PathBuf::from("out")));
        assert!(!dry_run);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["gqlbind", "check", "--format", "json", "-q", "a.graphql"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
    }
}
