//! build-electron library
//!
//! Loads a build-electron config, derives the main and preload bundler
//! configs and drives the bundler once or in watch mode.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod paths;
pub mod report;
pub mod target;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use orchestrator::Orchestrator;
