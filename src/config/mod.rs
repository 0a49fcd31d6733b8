//! Configuration handling for build-electron
//!
//! Loads the user's `build-electron.config.*` file, fills in the target
//! defaults and checks the fields a build cannot do without.

mod schema;
mod source;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::paths::PathResolver;
use crate::target::TargetKind;

pub use schema::*;
pub use source::{ConfigSource, FileSource, InlineSource};

/// Opaque bundler configuration fragment
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// User configuration, as exported by the config file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Entry of the main process bundle
    pub main_entry: Option<String>,

    /// Entry of the preload bundle
    pub preload_entry: Option<String>,

    /// Additional named entries bundled with the main target
    pub main_extra_entries: Option<BTreeMap<String, String>>,

    /// Additional named entries bundled with the preload target
    pub preload_extra_entries: Option<BTreeMap<String, String>>,

    /// Output directory shared by both targets
    pub out_dir: Option<String>,

    /// Extra externals, merged over the built-in electron externals
    pub externals: Option<BTreeMap<String, String>>,

    /// Overrides applied to both targets
    pub custom_config: Option<JsonMap>,

    /// Overrides applied to the main target after `custom_config`
    pub custom_main_config: Option<JsonMap>,

    /// Overrides applied to the preload target after `custom_config`
    pub custom_preload_config: Option<JsonMap>,

    pub main_target: Option<String>,

    pub preload_target: Option<String>,

    /// JS module the config was evaluated from. Its custom fragments never
    /// reach Rust; the engine imports them from here.
    #[serde(skip)]
    pub module: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path, resolved against the project root.
    ///
    /// JS configs run a node subprocess to completion; call this from
    /// `spawn_blocking` inside the runtime.
    pub fn load<P: AsRef<Path>>(path: P, resolver: &PathResolver) -> Result<Self> {
        Self::from_source(&FileSource::new(resolver.resolve(path)))
    }

    /// Read, default and validate a configuration from any source
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        debug!("Reading configuration from {}", source.describe());

        let config = source.read()?.normalized().with_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Config file used when none is given on the command line
    pub fn default_path(root: &Path) -> PathBuf {
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| root.join(format!("{}.{}", CONFIG_FILE_STEM, ext)))
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| root.join(format!("{}.js", CONFIG_FILE_STEM)))
    }

    /// Empty strings count as unset
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.main_entry,
            &mut self.preload_entry,
            &mut self.out_dir,
            &mut self.main_target,
            &mut self.preload_target,
        ] {
            if field.as_deref().is_some_and(str::is_empty) {
                *field = None;
            }
        }
        self
    }

    fn with_defaults(mut self) -> Self {
        self.main_target.get_or_insert_with(default_main_target);
        self.preload_target.get_or_insert_with(default_preload_target);
        self
    }

    /// Check the fields no build can start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.main_entry.is_none() && self.preload_entry.is_none() {
            return Err(ConfigError::MissingEntry);
        }
        if self.out_dir.is_none() {
            return Err(ConfigError::MissingOutDir);
        }
        if self.main_target.is_none() {
            return Err(ConfigError::MissingTarget("mainTarget"));
        }
        if self.preload_target.is_none() {
            return Err(ConfigError::MissingTarget("preloadTarget"));
        }
        Ok(())
    }

    pub fn entry(&self, kind: TargetKind) -> Option<&str> {
        match kind {
            TargetKind::Main => self.main_entry.as_deref(),
            TargetKind::Preload => self.preload_entry.as_deref(),
        }
    }

    pub fn extra_entries(&self, kind: TargetKind) -> Option<&BTreeMap<String, String>> {
        match kind {
            TargetKind::Main => self.main_extra_entries.as_ref(),
            TargetKind::Preload => self.preload_extra_entries.as_ref(),
        }
    }

    /// Platform target for `kind`, falling back to the default
    pub fn platform_target(&self, kind: TargetKind) -> String {
        match kind {
            TargetKind::Main => self.main_target.clone().unwrap_or_else(default_main_target),
            TargetKind::Preload => self
                .preload_target
                .clone()
                .unwrap_or_else(default_preload_target),
        }
    }

    pub fn custom_target_config(&self, kind: TargetKind) -> Option<&JsonMap> {
        match kind {
            TargetKind::Main => self.custom_main_config.as_ref(),
            TargetKind::Preload => self.custom_preload_config.as_ref(),
        }
    }

    /// Absolute output directory
    pub fn output_dir(&self, resolver: &PathResolver) -> Option<PathBuf> {
        self.out_dir.as_ref().map(|dir| resolver.resolve(dir))
    }
}
