use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::richtext::highlight::{DEFAULT_HIGHLIGHT_CLASS, DEFAULT_HIGHLIGHT_COLOR};
use crate::richtext::history::MAX_HISTORY_SIZE;
use crate::richtext::mutation::{LinkPolicy, ListStyle};
use crate::richtext::surface::LayoutMetrics;

const QUALIFIER: &str = "net.roblillack";
const ORGANIZATION: &str = "Richedit";
const APPLICATION: &str = "richedit";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access config file: {0}")]
    Io(#[from] io::Error),
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Font size stepping for the toolbar size buttons, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSizeConfig {
    pub default: u32,
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl Default for FontSizeConfig {
    fn default() -> Self {
        FontSizeConfig {
            default: 16,
            min: 8,
            max: 72,
            step: 1,
        }
    }
}

impl FontSizeConfig {
    /// Clamp a size into the configured bounds
    pub fn clamp(&self, size: u32) -> u32 {
        size.clamp(self.min, self.max.max(self.min))
    }

    pub fn bigger(&self, size: u32) -> u32 {
        self.clamp(size.saturating_add(self.step.max(1)))
    }

    pub fn smaller(&self, size: u32) -> u32 {
        self.clamp(size.saturating_sub(self.step.max(1)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub link_policy: LinkPolicy,
    pub highlight_color: String,
    pub highlight_class: String,
    pub list_indent: String,
    pub list_margin: String,
    pub font_size: FontSizeConfig,
    pub history_limit: usize,
    pub layout: LayoutMetrics,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let list = ListStyle::default();
        EditorConfig {
            link_policy: LinkPolicy::default(),
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            highlight_class: DEFAULT_HIGHLIGHT_CLASS.to_string(),
            list_indent: list.indent,
            list_margin: list.margin,
            font_size: FontSizeConfig::default(),
            history_limit: MAX_HISTORY_SIZE,
            layout: LayoutMetrics::default(),
        }
    }
}

impl EditorConfig {
    pub fn list_style(&self) -> ListStyle {
        ListStyle {
            indent: self.list_indent.clone(),
            margin: self.list_margin.clone(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load the config at `path` (or the default location), falling back to
    /// defaults when the file is missing or broken
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config");
                config
            }
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring config file");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
