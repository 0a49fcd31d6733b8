//! One build-electron invocation

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use super::Cli;
use crate::config::{Config, Mode};
use crate::engine::WebpackEngine;
use crate::orchestrator::Orchestrator;
use crate::paths::PathResolver;
use crate::target::TargetKind;
use crate::utils::format_duration;

/// Resolved command line: where the project is and how to build it
#[derive(Debug, Clone)]
pub struct BuildSession {
    pub resolver: PathResolver,
    pub config_path: PathBuf,
    pub mode: Mode,
}

impl BuildSession {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read the current directory")?;
        let root = match &cli.project_root {
            Some(root) => PathResolver::new(cwd).resolve(root),
            None => cwd,
        };
        let resolver = PathResolver::new(root);

        let config_path = match &cli.config {
            Some(path) => resolver.resolve(path),
            None => Config::default_path(resolver.root()),
        };

        Ok(Self {
            resolver,
            config_path,
            mode: Mode::from_dev_flag(cli.dev),
        })
    }

    pub async fn run(self) -> Result<()> {
        let start = Instant::now();

        info!("Loading configuration from {}", self.config_path.display());
        // JS configs are evaluated by a node subprocess
        let config = {
            let (path, resolver) = (self.config_path.clone(), self.resolver.clone());
            tokio::task::spawn_blocking(move || Config::load(path, &resolver))
                .await
                .context("config loading task panicked")??
        };

        let targets: Vec<&str> = TargetKind::ALL
            .iter()
            .filter(|&&kind| config.entry(kind).is_some())
            .map(TargetKind::name)
            .collect();

        let engine = Arc::new(WebpackEngine::new(self.resolver.root()));
        let orchestrator = Orchestrator::new(config, self.resolver, self.mode, engine)?;

        eprintln!(
            "{} Building {} into {} ({} mode)...",
            "→".blue(),
            targets.join(" + ").cyan(),
            orchestrator.out_dir().display().to_string().cyan(),
            self.mode
        );

        if !self.mode.is_watch() {
            orchestrator.execute().await?;
            eprintln!(
                "\n{} Done in {}\n",
                "✓".green().bold(),
                format_duration(start.elapsed())
            );
            return Ok(());
        }

        eprintln!(
            "  {} Waiting for {} before signalling readiness",
            "•".dimmed(),
            orchestrator.sentinel().path().display().to_string().dimmed()
        );
        eprintln!("  {} Press {} to stop\n", "•".dimmed(), "Ctrl+C".yellow());

        tokio::select! {
            result = orchestrator.execute() => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{} Stopping watchers", "→".blue());
                Ok(())
            }
        }
    }
}
