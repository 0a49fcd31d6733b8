//! Build and watch orchestration
//!
//! Turns a validated [`Config`] into one build handle per present entry,
//! prepares the output directory and drives the handles in one-shot or
//! watch mode. In watch mode every successful preload cycle writes the
//! completion [`Sentinel`].
//!
//! Setup order: target configs and handles are created first, then the
//! output directory is ensured and the sentinel cleared, and only then does
//! any build start.

mod sentinel;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{Config, Mode};
use crate::engine::{BuildEngine, BuildHandle, CycleResult, CycleStream};
use crate::error::ConfigError;
use crate::paths::PathResolver;
use crate::report;
use crate::target::{shared_entry_names, TargetConfig, TargetConfigBuilder, TargetKind};

pub use sentinel::{Sentinel, SENTINEL_FILE_NAME};

/// Drives the main and preload builds of one project
pub struct Orchestrator {
    config: Config,
    resolver: PathResolver,
    mode: Mode,
    engine: Arc<dyn BuildEngine>,
    out_dir: PathBuf,
}

impl Orchestrator {
    /// Fails when the configuration cannot produce any build
    pub fn new(
        config: Config,
        resolver: PathResolver,
        mode: Mode,
        engine: Arc<dyn BuildEngine>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let out_dir = config
            .output_dir(&resolver)
            .ok_or(ConfigError::MissingOutDir)?;

        Ok(Self {
            config,
            resolver,
            mode,
            engine,
            out_dir,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn sentinel(&self) -> Sentinel {
        Sentinel::new(&self.out_dir)
    }

    /// Resolved config for every target that has an entry
    pub fn target_configs(&self) -> Result<Vec<TargetConfig>> {
        let builder = TargetConfigBuilder::new(&self.config, &self.resolver, self.mode)?;

        let configs: Vec<TargetConfig> = TargetKind::ALL
            .iter()
            .filter_map(|&kind| builder.for_target(kind))
            .collect();

        if let [first, second] = configs.as_slice() {
            let shared = shared_entry_names(first, second);
            if !shared.is_empty() {
                warn!(
                    "main and preload both emit {:?} into {}; the later build overwrites the earlier",
                    shared,
                    self.out_dir.display()
                );
            }
        }

        Ok(configs)
    }

    /// Run every target once, or watch them until the process ends
    pub async fn execute(&self) -> Result<()> {
        let handles = self
            .target_configs()?
            .iter()
            .map(|config| self.engine.create(config))
            .collect::<Result<Vec<Box<dyn BuildHandle>>>>()?;

        ensure_dir(&self.out_dir).await?;

        let sentinel = self.sentinel();
        sentinel.clear().await;

        info!(
            "Starting {} {} build(s) with {}",
            handles.len(),
            self.mode,
            self.engine.name()
        );

        let mut tasks = JoinSet::new();
        for handle in handles {
            let kind = handle.kind();
            let started = Instant::now();

            let stream = if self.mode.is_watch() {
                handle.watch().await
            } else {
                handle.run().await
            }
            .with_context(|| format!("Failed to start the {} build", kind))?;

            let watcher = match (self.mode, kind) {
                (Mode::Development, TargetKind::Preload) => Watcher::Signalling(sentinel.clone()),
                (Mode::Development, _) => Watcher::Plain,
                (Mode::Production, _) => Watcher::Once(started),
            };

            tasks.spawn(consume(kind, stream, watcher));
        }

        while let Some(joined) = tasks.join_next().await {
            joined.context("build task panicked")?;
        }

        debug!("All build streams closed");
        Ok(())
    }
}

/// How a target's cycle results are handled
enum Watcher {
    /// One-shot build started at the given instant
    Once(Instant),
    /// Watch cycles, reported only
    Plain,
    /// Watch cycles; each success writes the sentinel
    Signalling(Sentinel),
}

async fn consume(kind: TargetKind, mut stream: CycleStream, watcher: Watcher) {
    while let Some(result) = stream.recv().await {
        let elapsed = match &watcher {
            Watcher::Once(started) => Some(started.elapsed()),
            _ => None,
        };
        report::cycle(kind, &result, elapsed);

        if let (CycleResult::Success { .. }, Watcher::Signalling(sentinel)) = (&result, &watcher) {
            match sentinel.signal().await {
                Ok(()) => debug!("Wrote {}", sentinel.path().display()),
                Err(e) => error!("{:#}", e),
            }
        }
    }
}

/// Create the output directory; an existing one is fine
async fn ensure_dir(dir: &Path) -> Result<()> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e)
            .with_context(|| format!("Failed to create output directory {}", dir.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Engine that replays canned cycle results
    #[derive(Default)]
    struct ScriptedEngine {
        scripts: HashMap<TargetKind, Vec<CycleResult>>,
        /// Checked for existence whenever a handle starts
        probe: Option<PathBuf>,
        calls: Arc<Mutex<Vec<String>>>,
        probe_seen: Arc<Mutex<Vec<bool>>>,
    }

    impl ScriptedEngine {
        fn script(mut self, kind: TargetKind, results: Vec<CycleResult>) -> Self {
            self.scripts.insert(kind, results);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl BuildEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn create(&self, config: &TargetConfig) -> Result<Box<dyn BuildHandle>> {
            self.calls.lock().unwrap().push(format!("create {}", config.kind()));
            Ok(Box::new(ScriptedHandle {
                kind: config.kind(),
                results: self.scripts.get(&config.kind()).cloned().unwrap_or_default(),
                probe: self.probe.clone(),
                calls: self.calls.clone(),
                probe_seen: self.probe_seen.clone(),
            }))
        }
    }

    struct ScriptedHandle {
        kind: TargetKind,
        results: Vec<CycleResult>,
        probe: Option<PathBuf>,
        calls: Arc<Mutex<Vec<String>>>,
        probe_seen: Arc<Mutex<Vec<bool>>>,
    }

    impl ScriptedHandle {
        fn replay(self, action: &str) -> CycleStream {
            self.calls.lock().unwrap().push(format!("{} {}", action, self.kind));
            if let Some(probe) = &self.probe {
                self.probe_seen.lock().unwrap().push(probe.exists());
            }

            let (tx, rx) = mpsc::channel(self.results.len().max(1));
            for result in self.results {
                tx.try_send(result).unwrap();
            }
            rx
        }
    }

    #[async_trait]
    impl BuildHandle for ScriptedHandle {
        fn kind(&self) -> TargetKind {
            self.kind
        }

        async fn run(self: Box<Self>) -> Result<CycleStream> {
            Ok(self.replay("run"))
        }

        async fn watch(self: Box<Self>) -> Result<CycleStream> {
            Ok(self.replay("watch"))
        }
    }

    fn ok() -> CycleResult {
        CycleResult::Success {
            summary: "compiled successfully".to_string(),
        }
    }

    fn failed() -> CycleResult {
        CycleResult::Failure {
            error: "Module not found".to_string(),
        }
    }

    fn config(main: Option<&str>, preload: Option<&str>) -> Config {
        Config {
            main_entry: main.map(str::to_string),
            preload_entry: preload.map(str::to_string),
            out_dir: Some("dist".to_string()),
            main_target: Some("electron16.0-main".to_string()),
            preload_target: Some("electron16.0-preload".to_string()),
            ..Config::default()
        }
    }

    fn orchestrator_for(
        root: &Path,
        config: Config,
        mode: Mode,
        engine: Arc<ScriptedEngine>,
    ) -> Orchestrator {
        Orchestrator::new(config, PathResolver::new(root), mode, engine).unwrap()
    }

    #[test]
    fn test_missing_entries_fail_before_any_engine_call() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::default());

        let result = Orchestrator::new(
            config(None, None),
            PathResolver::new(dir.path()),
            Mode::Production,
            engine.clone(),
        );

        assert!(matches!(result, Err(ConfigError::MissingEntry)));
        assert!(engine.calls().is_empty());
        assert!(!dir.path().join("dist").exists());
    }

    #[tokio::test]
    async fn test_main_only_production_build() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::default().script(TargetKind::Main, vec![ok()]));
        let orchestrator = orchestrator_for(
            dir.path(),
            config(Some("a.js"), None),
            Mode::Production,
            engine.clone(),
        );

        orchestrator.execute().await.unwrap();

        assert_eq!(engine.calls(), vec!["create main", "run main"]);
        assert!(dir.path().join("dist").is_dir());
        assert!(!orchestrator.sentinel().exists());
    }

    #[tokio::test]
    async fn test_production_build_never_writes_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            ScriptedEngine::default()
                .script(TargetKind::Main, vec![ok()])
                .script(TargetKind::Preload, vec![ok()]),
        );
        let orchestrator = orchestrator_for(
            dir.path(),
            config(Some("a.js"), Some("b.js")),
            Mode::Production,
            engine.clone(),
        );

        orchestrator.execute().await.unwrap();

        assert_eq!(
            engine.calls(),
            vec!["create main", "create preload", "run main", "run preload"]
        );
        assert!(!orchestrator.sentinel().exists());
    }

    #[tokio::test]
    async fn test_watch_success_writes_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            ScriptedEngine::default()
                .script(TargetKind::Main, vec![ok()])
                .script(TargetKind::Preload, vec![ok()]),
        );
        let orchestrator = orchestrator_for(
            dir.path(),
            config(Some("a.js"), Some("b.js")),
            Mode::Development,
            engine.clone(),
        );

        orchestrator.execute().await.unwrap();

        assert_eq!(
            engine.calls(),
            vec!["create main", "create preload", "watch main", "watch preload"]
        );
        let sentinel = dir.path().join("dist").join(".build-electron-done");
        assert_eq!(std::fs::metadata(&sentinel).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_failed_preload_cycle_withholds_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            ScriptedEngine::default()
                .script(TargetKind::Main, vec![ok()])
                .script(TargetKind::Preload, vec![failed()]),
        );
        let orchestrator = orchestrator_for(
            dir.path(),
            config(Some("a.js"), Some("b.js")),
            Mode::Development,
            engine,
        );

        orchestrator.execute().await.unwrap();

        assert!(!orchestrator.sentinel().exists());
    }

    #[tokio::test]
    async fn test_main_success_alone_does_not_signal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            ScriptedEngine::default()
                .script(TargetKind::Main, vec![ok(), ok()])
                .script(TargetKind::Preload, vec![failed()]),
        );
        let orchestrator = orchestrator_for(
            dir.path(),
            config(Some("a.js"), Some("b.js")),
            Mode::Development,
            engine,
        );

        orchestrator.execute().await.unwrap();

        assert!(!orchestrator.sentinel().exists());
    }

    #[tokio::test]
    async fn test_later_preload_success_signals_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            ScriptedEngine::default().script(TargetKind::Preload, vec![failed(), ok()]),
        );
        let orchestrator = orchestrator_for(
            dir.path(),
            config(None, Some("b.js")),
            Mode::Development,
            engine,
        );

        orchestrator.execute().await.unwrap();

        assert!(orchestrator.sentinel().exists());
    }

    #[tokio::test]
    async fn test_stale_sentinel_is_cleared_before_builds_start() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("dist");
        std::fs::create_dir_all(&out_dir).unwrap();
        let sentinel = out_dir.join(SENTINEL_FILE_NAME);
        std::fs::write(&sentinel, b"").unwrap();

        let engine = Arc::new(ScriptedEngine {
            probe: Some(sentinel.clone()),
            ..ScriptedEngine::default()
        });
        let orchestrator = orchestrator_for(
            dir.path(),
            config(Some("a.js"), Some("b.js")),
            Mode::Development,
            engine.clone(),
        );

        orchestrator.execute().await.unwrap();

        assert_eq!(*engine.probe_seen.lock().unwrap(), vec![false, false]);
        assert!(!sentinel.exists());
    }

    #[tokio::test]
    async fn test_output_dir_creation_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dist"), b"not a directory").unwrap();

        let engine = Arc::new(ScriptedEngine::default().script(TargetKind::Main, vec![ok()]));
        let orchestrator = orchestrator_for(
            dir.path(),
            config(Some("a.js"), None),
            Mode::Production,
            engine.clone(),
        );

        assert!(orchestrator.execute().await.is_err());
        assert_eq!(engine.calls(), vec!["create main"]);
    }

    #[tokio::test]
    async fn test_nested_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::default().script(TargetKind::Main, vec![ok()]));
        let orchestrator = orchestrator_for(
            dir.path(),
            Config {
                out_dir: Some("build/electron".to_string()),
                ..config(Some("a.js"), None)
            },
            Mode::Production,
            engine,
        );

        orchestrator.execute().await.unwrap();

        assert!(dir.path().join("build/electron").is_dir());
    }

    #[test]
    fn test_target_configs_skip_absent_entries() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_for(
            dir.path(),
            config(None, Some("b.js")),
            Mode::Production,
            Arc::new(ScriptedEngine::default()),
        );

        let configs = orchestrator.target_configs().unwrap();

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].kind(), TargetKind::Preload);
    }
}
