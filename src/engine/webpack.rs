//! Webpack, driven through a small node script
//!
//! The driver loads webpack from the project's `node_modules`, compiles the
//! JSON config it is given and prints one protocol line per finished cycle.
//! When the user config is a JS module, the driver imports it and layers its
//! custom fragments over the JSON config, so regexes, functions and plugin
//! instances reach webpack as written.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{BuildEngine, BuildHandle, CycleResult, CycleStream};
use crate::target::{TargetConfig, TargetKind};
use crate::utils::node_binary;

/// Marks driver output lines that carry a cycle result
const PROTOCOL_PREFIX: &str = "@@build-electron ";

const DRIVER_FILE: &str = "driver.mjs";

/// Tells the driver whether to colour its statistics
const COLOR_ENV_VAR: &str = "BUILD_ELECTRON_COLOR";

const DRIVER_SCRIPT: &str = r#"import { readFileSync } from 'node:fs';
import { createRequire } from 'node:module';
import { join } from 'node:path';
import { pathToFileURL } from 'node:url';

const [configPath, action, kind, customModule] = process.argv.slice(2);
const emit = (message) => process.stdout.write(`@@build-electron ${JSON.stringify(message)}\n`);
const report = (err, stats) => {
  if (err) emit({ type: 'failed', error: String(err.stack || err) });
  else emit({ type: 'done', stats: stats.toString({ colors: process.env.BUILD_ELECTRON_COLOR === '1' }) });
};

let compiler;
try {
  let config = JSON.parse(readFileSync(configPath, 'utf8'));
  if (customModule) {
    const mod = await import(pathToFileURL(customModule).href);
    const user = mod.default ?? mod;
    const own = kind === 'main' ? user.customMainConfig : user.customPreloadConfig;
    config = { ...config, ...user.customConfig, ...own };
  }
  const require = createRequire(join(process.cwd(), 'package.json'));
  const webpack = require('webpack');
  compiler = webpack(config);
} catch (err) {
  report(err);
  process.exit(1);
}

if (action === 'watch') {
  compiler.watch({}, report);
} else {
  compiler.run((err, stats) => {
    report(err, stats);
    compiler.close(() => {});
  });
}
"#;

/// Messages printed by the driver
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum DriverMessage {
    Done { stats: String },
    Failed { error: String },
}

impl From<DriverMessage> for CycleResult {
    fn from(message: DriverMessage) -> Self {
        match message {
            DriverMessage::Done { stats } => CycleResult::Success { summary: stats },
            DriverMessage::Failed { error } => CycleResult::Failure { error },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Run,
    Watch,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::Watch => "watch",
        }
    }
}

/// Build engine backed by the project's webpack installation
pub struct WebpackEngine {
    root: PathBuf,
    work_dir: PathBuf,
}

impl WebpackEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let work_dir = root.join("node_modules").join(".cache").join("build-electron");
        Self { root, work_dir }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl BuildEngine for WebpackEngine {
    fn name(&self) -> &str {
        "webpack"
    }

    fn create(&self, config: &TargetConfig) -> Result<Box<dyn BuildHandle>> {
        Ok(Box::new(WebpackHandle {
            config: config.clone(),
            root: self.root.clone(),
            work_dir: self.work_dir.clone(),
        }))
    }
}

struct WebpackHandle {
    config: TargetConfig,
    root: PathBuf,
    work_dir: PathBuf,
}

impl WebpackHandle {
    async fn start(self, action: Action) -> Result<CycleStream> {
        let kind = self.config.kind();
        let node = node_binary()?;

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.work_dir.display()))?;

        let driver = self.work_dir.join(DRIVER_FILE);
        tokio::fs::write(&driver, DRIVER_SCRIPT)
            .await
            .with_context(|| format!("Failed to write {}", driver.display()))?;

        let config_path = self.work_dir.join(format!("{}.config.json", kind));
        tokio::fs::write(&config_path, self.config.to_json()?)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        debug!("Starting webpack {} for {} target", action.as_str(), kind);

        let mut command = Command::new(&node);
        command
            .arg(&driver)
            .arg(&config_path)
            .arg(action.as_str())
            .arg(kind.name());
        if let Some(module) = self.config.custom_module() {
            command.arg(module);
        }

        let mut child = command
            .current_dir(&self.root)
            .env(COLOR_ENV_VAR, if stdout_is_terminal() { "1" } else { "0" })
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", node.display()))?;

        let stdout = child
            .stdout
            .take()
            .context("webpack driver stdout was not captured")?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(pump(kind, action, child, stdout, tx));

        Ok(rx)
    }
}

#[async_trait]
impl BuildHandle for WebpackHandle {
    fn kind(&self) -> TargetKind {
        self.config.kind()
    }

    async fn run(self: Box<Self>) -> Result<CycleStream> {
        self.start(Action::Run).await
    }

    async fn watch(self: Box<Self>) -> Result<CycleStream> {
        self.start(Action::Watch).await
    }
}

/// Forward driver output until the process exits.
///
/// Returns the number of lines passed through to stdout.
async fn pump(
    kind: TargetKind,
    action: Action,
    mut child: Child,
    stdout: ChildStdout,
    tx: mpsc::Sender<CycleResult>,
) -> usize {
    let mut lines = BufReader::new(stdout).lines();
    let mut last: Option<CycleResult> = None;
    let mut forwarded = 0;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_line(&line) {
                Some(Ok(result)) => {
                    last = Some(result.clone());
                    if tx.send(result).await.is_err() {
                        debug!("{} cycle receiver dropped", kind);
                        return forwarded;
                    }
                }
                Some(Err(e)) => warn!("Malformed webpack driver message: {}", e),
                None => {
                    println!("{}", line);
                    forwarded += 1;
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read webpack output for {}: {}", kind, e);
                break;
            }
        }
    }

    let status = match child.wait().await {
        Ok(status) => status.to_string(),
        Err(e) => e.to_string(),
    };
    debug!("webpack {} for {} exited: {}", action.as_str(), kind, status);

    // A watcher never exits on its own, and a run that printed nothing failed.
    // An exit right after a reported failure is that same failure.
    let already_failed = last.as_ref().is_some_and(|result| !result.is_success());
    let unreported = match action {
        Action::Watch => !already_failed,
        Action::Run => last.is_none(),
    };
    if unreported {
        let _ = tx
            .send(CycleResult::Failure {
                error: format!("webpack {} exited ({})", action.as_str(), status),
            })
            .await;
    }

    forwarded
}

fn stdout_is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// `None` for lines that are not driver messages
fn parse_line(line: &str) -> Option<serde_json::Result<CycleResult>> {
    let payload = line.strip_prefix(PROTOCOL_PREFIX)?;
    Some(serde_json::from_str::<DriverMessage>(payload).map(CycleResult::from))
}
