//! build-electron - bundle the main and preload code of an Electron app
//!
//! Reads `build-electron.config.*` from the project root, builds the main
//! process and preload bundles with webpack, and with `--dev` keeps both
//! watching. In watch mode `<outDir>/.build-electron-done` appears after
//! every successful preload build so the app can be (re)launched.

use anyhow::Result;
use build_electron::Cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging/tracing system
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("build_electron=debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("build_electron=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    cli.execute().await
}
