//! Main entry point for the gqlbind CLI.

use clap::Parser;
use colored::Colorize;
use gqlbind_cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // GQLBIND_LOG wins over RUST_LOG; `-v` only changes the default.
    let default = if cli.verbose { "gqlbind=debug" } else { "gqlbind=info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("GQLBIND_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match gqlbind_cli::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{} {error}", "Error:".red().bold());
            let mut source = std::error::Error::source(&error);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            std::process::exit(2);
        }
    }
}
