//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/cfgtree/cfgtree.toml`
//! 3. Local config: `<dir>/.cfgtree.toml` (directory given with `-C`, default cwd)
//! 4. Environment variables: `CFGTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Unified configuration for cfgtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Key-value state file used for auto-save/restore
    pub state_file: PathBuf,
    /// Key under which the tree is stored in the state file
    pub state_key: String,
    /// Default target for `export` and source for `import`
    pub export_file: PathBuf,
}

/// Raw settings for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub state_file: Option<PathBuf>,
    pub state_key: Option<String>,
    pub export_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            state_key: "treeState".into(),
            export_file: PathBuf::from("cfgtree-export.json"),
        }
    }
}

/// Default state file location under the platform data directory.
fn default_state_file() -> PathBuf {
    ProjectDirs::from("", "", "cfgtree")
        .map(|dirs| dirs.data_dir().join("state.json"))
        .unwrap_or_else(|| PathBuf::from("~/.cfgtree/state.json"))
}

/// Get the XDG config directory for cfgtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cfgtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("cfgtree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".cfgtree.toml")
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
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

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.state_file = PathBuf::from(expand_env_vars(&self.state_file.to_string_lossy()));
        self.export_file = PathBuf::from(expand_env_vars(&self.export_file.to_string_lossy()));
    }

    /// Overlay wins where it specifies a value, otherwise keep self.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            state_file: overlay
                .state_file
                .clone()
                .unwrap_or_else(|| self.state_file.clone()),
            state_key: overlay
                .state_key
                .clone()
                .unwrap_or_else(|| self.state_key.clone()),
            export_file: overlay
                .export_file
                .clone()
                .unwrap_or_else(|| self.export_file.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.cfgtree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply CFGTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("CFGTREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("state_file") {
            settings.state_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("state_key") {
            settings.state_key = val;
        }
        if let Ok(val) = config.get_string("export_file") {
            settings.export_file = PathBuf::from(val);
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# cfgtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/cfgtree/cfgtree.toml
#   Local:  <dir>/.cfgtree.toml   (dir = -C argument or cwd)
#   Env:    CFGTREE_* environment variables

# Key-value file the tree is auto-saved to after every change
# state_file = "~/.local/share/cfgtree/state.json"

# Key under which the tree is stored in the state file
# state_key = "treeState"

# Default file for `cfgtree export` / `cfgtree import`
# export_file = "cfgtree-export.json"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
