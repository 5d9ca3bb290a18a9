//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/pagetree/pagetree.toml`
//! 3. Project config: `<project_dir>/.pagetree.toml`
//! 4. Environment variables: `PAGETREE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::DropZones;
use crate::application::{ApplicationError, SessionOptions};

/// Raw drop-zone thresholds (Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDropZones {
    pub before: Option<f64>,
    pub after: Option<f64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub rules_file: Option<PathBuf>,
    pub disabled_types: Option<Vec<String>>,
    pub history_limit: Option<usize>,
    pub drop_zones: RawDropZones,
}

/// Unified configuration for pagetree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// TOML rule table overlaid onto the built-in registry
    pub rules_file: Option<PathBuf>,
    /// Component types removed from the registry
    pub disabled_types: Vec<String>,
    /// Maximum undo snapshots kept (None = unbounded)
    pub history_limit: Option<usize>,
    /// Drop resolver thresholds
    pub drop_zones: DropZones,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_file: None,
            disabled_types: Vec::new(),
            history_limit: None,
            drop_zones: DropZones::default(),
        }
    }
}

/// Get the XDG config directory for pagetree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pagetree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("pagetree.toml"))
}

/// Get the path to the project config file.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".pagetree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path; unexpandable input is kept as is.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for item in overlay {
            if let Some(negated) = item.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(item.clone());
            }
        }

        // Sorted for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Apply global config onto defaults: everything specified REPLACES.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            rules_file: global.rules_file.clone().or_else(|| self.rules_file.clone()),
            disabled_types: global
                .disabled_types
                .clone()
                .unwrap_or_else(|| self.disabled_types.clone()),
            history_limit: global.history_limit.or(self.history_limit),
            drop_zones: DropZones {
                before: global.drop_zones.before.unwrap_or(self.drop_zones.before),
                after: global.drop_zones.after.unwrap_or(self.drop_zones.after),
            },
        }
    }

    /// Merge project config: scalars win if set, `disabled_types` unions with negation.
    ///
    /// A relative `rules_file` is resolved against the project directory.
    fn merge_with(&self, overlay: &RawSettings, project_dir: &Path) -> Self {
        let rules_file = overlay
            .rules_file
            .as_ref()
            .map(|p| {
                let p = expand_path(p);
                if p.is_relative() {
                    project_dir.join(p)
                } else {
                    p
                }
            })
            .or_else(|| self.rules_file.clone());
        Self {
            rules_file,
            disabled_types: overlay
                .disabled_types
                .as_ref()
                .map(|o| Self::merge_array(&self.disabled_types, o))
                .unwrap_or_else(|| self.disabled_types.clone()),
            history_limit: overlay.history_limit.or(self.history_limit),
            drop_zones: DropZones {
                before: overlay.drop_zones.before.unwrap_or(self.drop_zones.before),
                after: overlay.drop_zones.after.unwrap_or(self.drop_zones.after),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for `.pagetree.toml`
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path();
        Self::load_from(global.as_deref(), project_dir)
    }

    /// Layered load with an explicit global config path (None skips the global layer).
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.apply_global(&raw);
            }
        }

        // 3. Project config
        if let Some(dir) = project_dir {
            let local_path = project_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw, dir);
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        if let Some(path) = current.rules_file.take() {
            current.rules_file = Some(expand_path(&path));
        }
        current.check()?;
        Ok(current)
    }

    /// Apply PAGETREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("PAGETREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("disabled_types"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("rules_file") {
            settings.rules_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get::<Vec<String>>("disabled_types") {
            settings.disabled_types = val;
        }
        if let Ok(val) = config.get::<usize>("history_limit") {
            settings.history_limit = Some(val);
        }
        if let Ok(val) = config.get_float("drop_zones.before") {
            settings.drop_zones.before = val;
        }
        if let Ok(val) = config.get_float("drop_zones.after") {
            settings.drop_zones.after = val;
        }

        Ok(settings)
    }

    fn check(&self) -> Result<(), ApplicationError> {
        if !self.drop_zones.is_valid() {
            return Err(ApplicationError::Config {
                message: format!(
                    "drop_zones must satisfy 0 <= before <= after <= 1 (before={}, after={})",
                    self.drop_zones.before, self.drop_zones.after
                ),
            });
        }
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            drop_zones: self.drop_zones,
            history_limit: self.history_limit,
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# pagetree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/pagetree/pagetree.toml  (defines your baseline)
#   Project: <project_dir>/.pagetree.toml       (project-specific additions)
#   Env:     PAGETREE_* environment variables   (explicit overrides)
#
# Project config UNIONS disabled_types with global; use "!type" to re-enable
# a type disabled globally.

# Rule table overlaid onto the built-in component registry
# rules_file = "rules.toml"

# Component types removed from the registry
# disabled_types = ["video"]

# Maximum undo snapshots kept (unset = unbounded)
# history_limit = 200

[drop_zones]
# Pointer above this fraction of the target's height inserts before it
# before = 0.2
# Pointer below this fraction inserts after it; in between drops inside
# after = 0.8
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
