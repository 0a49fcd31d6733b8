//! Configuration schema defaults and fixed build values

use std::fmt;

/// File stem probed for when no config path is given
pub const CONFIG_FILE_STEM: &str = "build-electron.config";

/// Extensions probed, in order, next to [`CONFIG_FILE_STEM`]
pub const CONFIG_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "toml", "json"];

/// Externals every target gets; user externals are merged over these
pub const BUILTIN_EXTERNALS: &[(&str, &str)] = &[
    ("electron", "commonjs2 electron"),
    ("electron-devtools-installer", "commonjs2 electron-devtools-installer"),
];

// TODO: pick a production devtool (e.g. `source-map`) once the desktop shell
// can load external maps.
pub const DEVTOOL: &str = "inline-source-map";

pub const OUTPUT_FILENAME: &str = "[name].js";

pub const CHUNK_FORMAT: &str = "commonjs";

pub fn default_main_target() -> String {
    "electron16.0-main".to_string()
}

pub fn default_preload_target() -> String {
    "electron16.0-preload".to_string()
}

/// Bundler mode, selected by the `--dev` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Mode::Development
        } else {
            Mode::Production
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    pub fn is_watch(&self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
