//! Build engine boundary
//!
//! The bundler itself is external. An engine turns a [`TargetConfig`] into a
//! [`BuildHandle`], and a handle either runs one build or keeps watching.
//! Both report through a [`CycleStream`]: `run` yields exactly one
//! [`CycleResult`], `watch` yields one per rebuild for as long as it lives.

mod webpack;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::target::{TargetConfig, TargetKind};

pub use webpack::WebpackEngine;

/// Outcome of one build cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResult {
    /// The bundler finished; `summary` is its statistics report
    Success { summary: String },

    /// The bundler failed before producing statistics
    Failure { error: String },
}

impl CycleResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleResult::Success { .. })
    }
}

/// Receiving end of a handle's cycle results
pub type CycleStream = mpsc::Receiver<CycleResult>;

/// Creates build handles from target configs
pub trait BuildEngine: Send + Sync {
    /// Engine name for logging
    fn name(&self) -> &str;

    fn create(&self, config: &TargetConfig) -> Result<Box<dyn BuildHandle>>;
}

/// A configured, not yet started build
#[async_trait]
pub trait BuildHandle: Send {
    fn kind(&self) -> TargetKind;

    /// Build once
    async fn run(self: Box<Self>) -> Result<CycleStream>;

    /// Build, then rebuild on every source change
    async fn watch(self: Box<Self>) -> Result<CycleStream>;
}
