//! Sources a configuration can be read from

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

use super::Config;
use crate::error::ConfigError;
use crate::utils::node_binary;

/// Prints the default export of the module at `argv[1]` as JSON.
///
/// The custom fragments are left out: they may hold regexes, functions and
/// plugin instances, so the webpack driver imports them from the module
/// itself.
const EXPORT_SCRIPT: &str = r#"
const { pathToFileURL } = await import('node:url');
const mod = await import(pathToFileURL(process.argv[1]).href);
const config = mod.default ?? mod;
const plain = config && typeof config === 'object' && !Array.isArray(config)
  ? (({ customConfig, customMainConfig, customPreloadConfig, ...rest }) => rest)(config)
  : config;
process.stdout.write(JSON.stringify(plain) ?? 'null');
"#;

/// Anything able to produce the raw configuration mapping
pub trait ConfigSource {
    /// Human readable origin, used in log lines and error context
    fn describe(&self) -> String;

    /// Read the configuration without applying defaults
    fn read(&self) -> Result<Config>;
}

/// A configuration file, parsed according to its extension
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_toml(&self) -> Result<Config> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {}", self.path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn read_json(&self) -> Result<Config> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {}", self.path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        self.parse_value(value)
    }

    /// Evaluate a JavaScript module with node and take its default export.
    /// Blocks until node exits.
    fn read_module(&self) -> Result<Config> {
        let node = node_binary()?;
        debug!("Evaluating {} with {}", self.path.display(), node.display());

        let mut command = Command::new(&node);
        command
            .arg("--input-type=module")
            .arg("-e")
            .arg(EXPORT_SCRIPT)
            .arg(&self.path);
        if let Some(dir) = self.path.parent() {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .with_context(|| format!("Failed to run {}", node.display()))?;

        if !output.status.success() {
            return Err(ConfigError::Evaluation {
                path: self.path.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let value: serde_json::Value = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Config module {} did not serialise", self.path.display()))?;
        let mut config = self.parse_value(value)?;
        config.module = Some(self.path.clone());
        Ok(config)
    }

    fn parse_value(&self, value: serde_json::Value) -> Result<Config> {
        if !value.is_object() {
            return Err(ConfigError::NotAMapping(self.path.clone()).into());
        }
        serde_json::from_value(value)
            .with_context(|| format!("Invalid configuration in {}", self.path.display()))
    }
}

impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Config> {
        if !self.path.is_file() {
            return Err(ConfigError::NotFound(self.path.clone()).into());
        }

        let extension = self.path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            "toml" => self.read_toml(),
            "json" => self.read_json(),
            "js" | "mjs" | "cjs" => self.read_module(),
            _ => Err(ConfigError::UnsupportedFormat(self.path.clone()).into()),
        }
    }
}

/// An in-memory configuration
pub struct InlineSource(pub Config);

impl ConfigSource for InlineSource {
    fn describe(&self) -> String {
        "<inline>".to_string()
    }

    fn read(&self) -> Result<Config> {
        Ok(self.0.clone())
    }
}
