//! Per-target bundler configuration
//!
//! Builds the configuration handed to the bundler for the main and preload
//! targets by layering, in order: common defaults, the computed entry and
//! output, `customConfig`, then the target's own custom config. Every layer
//! is a shallow merge where later keys replace earlier ones.
//!
//! Configs evaluated from a JS module keep their custom fragments in that
//! module. The bundler driver applies them over the computed layers, in the
//! same order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::config::{
    Config, JsonMap, Mode, BUILTIN_EXTERNALS, CHUNK_FORMAT, DEVTOOL, OUTPUT_FILENAME,
};
use crate::error::ConfigError;
use crate::paths::PathResolver;

/// One of the two bundles of an Electron app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Main,
    Preload,
}

impl TargetKind {
    pub const ALL: [TargetKind; 2] = [TargetKind::Main, TargetKind::Preload];

    /// Canonical entry name, also the emitted bundle's file stem
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Main => "main",
            TargetKind::Preload => "preload",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved inputs for a single target
#[derive(Debug, Clone)]
pub struct TargetInput {
    pub entry: PathBuf,
    pub extra_entries: BTreeMap<String, PathBuf>,
    pub target: String,
}

/// Fully merged bundler configuration for one target
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    kind: TargetKind,
    settings: JsonMap,
    custom_module: Option<PathBuf>,
}

impl TargetConfig {
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// JS module whose `customConfig` and per-target config still have to
    /// be layered over these settings
    pub fn custom_module(&self) -> Option<&Path> {
        self.custom_module.as_deref()
    }

    /// Names of the entries, i.e. the bundle files this target emits
    pub fn entry_names(&self) -> Vec<&str> {
        match self.settings.get("entry") {
            Some(Value::Object(entries)) => entries.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.settings)
    }
}

/// Shallow merge of `overrides` over `base`, later layers winning
pub fn merge_layers(base: &JsonMap, overrides: &[&JsonMap]) -> JsonMap {
    let mut merged = base.clone();
    for layer in overrides {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Builds [`TargetConfig`]s from a validated [`Config`]
pub struct TargetConfigBuilder<'a> {
    config: &'a Config,
    resolver: &'a PathResolver,
    mode: Mode,
    out_dir: PathBuf,
}

impl<'a> TargetConfigBuilder<'a> {
    pub fn new(
        config: &'a Config,
        resolver: &'a PathResolver,
        mode: Mode,
    ) -> Result<Self, ConfigError> {
        let out_dir = config.output_dir(resolver).ok_or(ConfigError::MissingOutDir)?;

        Ok(Self {
            config,
            resolver,
            mode,
            out_dir,
        })
    }

    /// Resolved inputs for `kind`, or `None` when the target has no entry
    pub fn input(&self, kind: TargetKind) -> Option<TargetInput> {
        let entry = self.config.entry(kind)?;

        let extra_entries = self
            .config
            .extra_entries(kind)
            .map(|extra| {
                extra
                    .iter()
                    .map(|(name, path)| (name.clone(), self.resolver.resolve(path)))
                    .collect()
            })
            .unwrap_or_default();

        Some(TargetInput {
            entry: self.resolver.resolve(entry),
            extra_entries,
            target: self.config.platform_target(kind),
        })
    }

    /// Config for `kind`, or `None` when the target has no entry
    pub fn for_target(&self, kind: TargetKind) -> Option<TargetConfig> {
        self.input(kind).map(|input| self.build(kind, input))
    }

    pub fn build(&self, kind: TargetKind, input: TargetInput) -> TargetConfig {
        let mut entry = JsonMap::new();
        entry.insert(kind.name().to_string(), path_value(&input.entry));
        for (name, path) in &input.extra_entries {
            entry.insert(name.clone(), path_value(path));
        }

        let mut computed = self.common_defaults();
        computed.insert("target".to_string(), Value::String(input.target));
        computed.insert("entry".to_string(), Value::Object(entry));
        computed.insert(
            "output".to_string(),
            json!({
                "path": path_value(&self.out_dir),
                "filename": OUTPUT_FILENAME,
                "chunkFormat": CHUNK_FORMAT,
            }),
        );

        let empty = JsonMap::new();
        let settings = merge_layers(
            &computed,
            &[
                self.config.custom_config.as_ref().unwrap_or(&empty),
                self.config.custom_target_config(kind).unwrap_or(&empty),
            ],
        );

        TargetConfig {
            kind,
            settings,
            custom_module: self.config.module.clone(),
        }
    }

    fn common_defaults(&self) -> JsonMap {
        let mut externals: JsonMap = BUILTIN_EXTERNALS
            .iter()
            .map(|(name, spec)| (name.to_string(), Value::String(spec.to_string())))
            .collect();
        if let Some(user) = &self.config.externals {
            for (name, spec) in user {
                externals.insert(name.clone(), Value::String(spec.clone()));
            }
        }

        let mut defaults = JsonMap::new();
        defaults.insert("mode".to_string(), Value::String(self.mode.as_str().to_string()));
        defaults.insert("externals".to_string(), Value::Object(externals));
        defaults.insert("devtool".to_string(), Value::String(DEVTOOL.to_string()));
        defaults
    }
}

/// Entry names emitted by both targets
pub fn shared_entry_names<'c>(a: &'c TargetConfig, b: &TargetConfig) -> Vec<&'c str> {
    let theirs = b.entry_names();
    a.entry_names()
        .into_iter()
        .filter(|name| theirs.contains(name))
        .collect()
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}
