//! Typed failures for configuration loading and validation

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("either `mainEntry` or `preloadEntry` must be set")]
    MissingEntry,

    #[error("`outDir` must be set")]
    MissingOutDir,

    #[error("`{0}` must be set")]
    MissingTarget(&'static str),

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported config file extension: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("config module {} did not export an object", .0.display())]
    NotAMapping(PathBuf),

    #[error("failed to evaluate config module {}: {message}", .path.display())]
    Evaluation { path: PathBuf, message: String },
}
