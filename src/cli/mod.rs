//! Command-line interface for build-electron
//!
//! A single command: build the main and preload bundles once, or with
//! `--dev` keep watching them.

mod build;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

pub use build::BuildSession;

/// Build the main and preload bundles of an Electron app
#[derive(Parser, Debug)]
#[command(name = "build-electron")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file [default: <project root>/build-electron.config.js]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Watch sources and rebuild on change (development mode)
    #[arg(short, long)]
    pub dev: bool,

    /// Directory relative config paths are resolved against
    #[arg(long, env = "BUILD_ELECTRON_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        BuildSession::from_cli(self)?.run().await
    }
}

/// Print the build-electron banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "build-electron".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from(["build-electron", "-c", "electron.toml", "-d"]);

        assert_eq!(cli.config, Some(PathBuf::from("electron.toml")));
        assert!(cli.dev);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["build-electron"]);

        assert_eq!(cli.config, None);
        assert!(!cli.dev);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
