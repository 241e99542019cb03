//! Run configuration: asset names, directory names and the card template.
//!
//! Loaded from an optional TOML file. Every field has a default, so an empty
//! file (or no file) describes the stock layout:
//!
//! ```toml
//! template_file = "template.png"
//! metadata_file = "gamelist.xml"
//! font = "font.ttf"
//!
//! [layout]
//! frame = { width = 638, height = 1012 }
//! region = { top = 52, height = 823 }
//! text_color = "black"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::Template;

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid layout: {0}")]
    Invalid(&'static str),
}

/// Everything a batch run needs besides the root directory.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Template artwork, relative to the root directory.
    pub template_file: PathBuf,
    /// Per-category metadata file name.
    pub metadata_file: String,
    /// Caption font (TrueType/OpenType), relative to the root directory
    /// unless absolute.
    pub font: PathBuf,
    /// Per-category subdirectory holding covers.
    pub covers_dir: String,
    /// Per-category subdirectory holding marquees.
    pub marquees_dir: String,
    /// Per-category subdirectory receiving cards.
    pub output_dir: String,
    /// Card geometry and colors.
    pub layout: Template,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_file: PathBuf::from("template.png"),
            metadata_file: String::from("gamelist.xml"),
            font: PathBuf::from("font.ttf"),
            covers_dir: String::from("covers"),
            marquees_dir: String::from("marquees"),
            output_dir: String::from("output"),
            layout: Template::default(),
        }
    }
}

impl Config {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    /// Parse and validate TOML text; `path` is only used in errors.
    pub fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject layouts the stack solver cannot place on the frame.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.layout.problem() {
            Some(problem) => Err(ConfigError::Invalid(problem)),
            None => Ok(()),
        }
    }

    /// Template artwork path under `root`.
    pub fn template_path(&self, root: &Path) -> PathBuf {
        root.join(&self.template_file)
    }

    /// Font path under `root` (absolute paths pass through).
    pub fn font_path(&self, root: &Path) -> PathBuf {
        root.join(&self.font)
    }
}
