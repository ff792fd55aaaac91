//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/routekit/routekit.toml`
//! 3. Local config: `<project_dir>/.routekit.toml`
//! 4. Environment variables: `ROUTEKIT_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::document::{DocumentShape, DEFAULT_API_VERSION};
use crate::domain::topology::DEFAULT_INTERNAL_SCHEMES;

/// Codec settings for newly created documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodecConfig {
    /// `apiVersion` written into new `crd` documents
    pub api_version: String,
    /// Shape of new documents: `crd`, `plain` or `kamelet`
    pub default_shape: DocumentShape,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            default_shape: DocumentShape::Plain,
        }
    }
}

/// Raw codec config for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCodecConfig {
    pub api_version: Option<String>,
    pub default_shape: Option<DocumentShape>,
}

impl CodecConfig {
    fn overlay(&self, raw: &RawCodecConfig) -> Self {
        Self {
            api_version: raw
                .api_version
                .clone()
                .unwrap_or_else(|| self.api_version.clone()),
            default_shape: raw.default_shape.unwrap_or(self.default_shape),
        }
    }
}

/// Raw settings for intermediate parsing (arrays are Option to detect "not specified").
///
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub catalog: Option<PathBuf>,
    pub internal_schemes: Option<Vec<String>>,
    pub file_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub codec: RawCodecConfig,
}

/// Unified configuration for routekit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// External catalog JSON replacing the built-in one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    /// Endpoint schemes projected as internal
    pub internal_schemes: Vec<String>,
    /// Extensions of flow files picked up when scanning a directory
    pub file_extensions: Vec<String>,
    pub codec: CodecConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: None,
            internal_schemes: DEFAULT_INTERNAL_SCHEMES.iter().map(|s| s.to_string()).collect(),
            file_extensions: vec!["yaml".into(), "yml".into()],
            codec: CodecConfig::default(),
        }
    }
}

/// Get the XDG config directory for routekit.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "routekit").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("routekit.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".routekit.toml")
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

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is returned unchanged.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["direct", "seda"], &["kafka"])     // → ["direct", "kafka", "seda"]
    /// merge_array(&["direct", "seda"], &["!seda"])     // → ["direct"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Sorted for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Expand shell variables and tilde in the catalog path.
    fn expand_paths(&mut self) {
        if let Some(catalog) = &self.catalog {
            let expanded = expand_env_vars(catalog.to_string_lossy().as_ref());
            self.catalog = Some(PathBuf::from(expanded));
        }
    }

    /// Merge project config onto self with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            catalog: overlay.catalog.clone().or_else(|| self.catalog.clone()),
            internal_schemes: overlay
                .internal_schemes
                .as_ref()
                .map(|o| Self::merge_array(&self.internal_schemes, o))
                .unwrap_or_else(|| self.internal_schemes.clone()),
            file_extensions: overlay
                .file_extensions
                .as_ref()
                .map(|o| Self::merge_array(&self.file_extensions, o))
                .unwrap_or_else(|| self.file_extensions.clone()),
            codec: self.codec.overlay(&overlay.codec),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            catalog: global.catalog.clone().or_else(|| self.catalog.clone()),
            internal_schemes: global
                .internal_schemes
                .clone()
                .unwrap_or_else(|| self.internal_schemes.clone()),
            file_extensions: global
                .file_extensions
                .clone()
                .unwrap_or_else(|| self.file_extensions.clone()),
            codec: self.codec.overlay(&global.codec),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Project: UNION with `!item` negation
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = project_dir {
            let local_path = project_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply ROUTEKIT_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("ROUTEKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("internal_schemes")
                    .with_list_parse_key("file_extensions")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("catalog") {
            settings.catalog = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get::<Vec<String>>("internal_schemes") {
            settings.internal_schemes = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("file_extensions") {
            settings.file_extensions = val;
        }
        if let Ok(val) = config.get_string("codec.api_version") {
            settings.codec.api_version = val;
        }
        if let Ok(val) = config.get_string("codec.default_shape") {
            settings.codec.default_shape = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("ROUTEKIT_CODEC__DEFAULT_SHAPE: {e}"),
            })?;
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
        r#"# routekit configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/routekit/routekit.toml  (defines your baseline)
#   Project: <project_dir>/.routekit.toml      (project-specific additions)
#   Env:     ROUTEKIT_* environment variables  (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Project config UNIONS with global.
#   Use "!item" in project config to REMOVE an inherited item:
#     internal_schemes = ["kafka", "!vertx"]

# External catalog JSON replacing the built-in one
# catalog = "~/.config/routekit/catalog.json"

# Endpoint schemes shown as internal in the topology
# internal_schemes = ["direct", "seda", "vertx"]

# Extensions of flow files when scanning a directory
# file_extensions = ["yaml", "yml"]

[codec]
# apiVersion of new Integration resources
# api_version = "camel.apache.org/v1"

# Shape of new documents: crd, plain or kamelet
# default_shape = "plain"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
