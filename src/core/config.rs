//! Configuration management with layered hierarchy

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::validator::{Validator, DEFAULT_STORAGE_CLASSES};

/// Errors loading configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(lcv::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    #[diagnostic(
        code(lcv::config::parse),
        help("Valid keys: storage_classes (list), strict (bool), default_format (auto, yaml, json)")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    #[diagnostic(code(lcv::config::env))]
    Env {
        var: &'static str,
        value: String,
        #[help]
        expected: &'static str,
    },
}

/// LCV configuration with layered hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Accepted `StorageClass` values, replacing the built-in set
    pub storage_classes: Option<Vec<String>>,

    /// Treat lint warnings as failures
    pub strict: Option<bool>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Project config file looked up in the current directory
    pub const PROJECT_FILE: &'static str = ".lcv.yaml";

    /// Load configuration from all sources, merging in priority order
    ///
    /// `explicit` replaces the project file lookup; unlike the implicit
    /// locations it must exist and parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/lcv/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                match Self::from_file(&global_path) {
                    Ok(global) => config.merge(global),
                    Err(e) => warn!(error = %e, "ignoring global config"),
                }
            }
        }

        // 3. Project config (.lcv.yaml or --config)
        match explicit {
            Some(path) => config.merge(Self::from_file(path)?),
            None => {
                let project_path = Path::new(Self::PROJECT_FILE);
                if project_path.exists() {
                    config.merge(Self::from_file(project_path)?);
                }
            }
        }

        // 4. Environment variables
        config.merge(Self::from_env(|var| std::env::var(var).ok())?);

        Ok(config)
    }

    /// Read a single YAML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `LCV_STORAGE_CLASSES`, `LCV_STRICT` and `LCV_FORMAT`
    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup("LCV_STORAGE_CLASSES") {
            let classes: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if classes.is_empty() {
                return Err(ConfigError::Env {
                    var: "LCV_STORAGE_CLASSES",
                    value,
                    expected: "Use a comma separated list, e.g. STANDARD,GLACIER",
                });
            }
            config.storage_classes = Some(classes);
        }

        if let Some(value) = lookup("LCV_STRICT") {
            let strict = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::Env {
                        var: "LCV_STRICT",
                        value,
                        expected: "Use true or false",
                    })
                }
            };
            config.strict = Some(strict);
        }

        if let Some(value) = lookup("LCV_FORMAT") {
            config.default_format = Some(value);
        }

        Ok(config)
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lcv")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.storage_classes.is_some() {
            self.storage_classes = other.storage_classes;
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Storage classes to accept, falling back to the built-in set
    pub fn storage_classes(&self) -> Vec<String> {
        self.storage_classes.clone().unwrap_or_else(|| {
            DEFAULT_STORAGE_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }

    pub fn strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    /// Build a validator honoring this configuration
    pub fn validator(&self) -> Validator {
        Validator::default()
            .with_storage_classes(self.storage_classes())
            .strict(self.strict())
    }
}
