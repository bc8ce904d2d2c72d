//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

const ENV_PREFIX: &str = "JSCA_";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exclude patterns (glob) for class files.
    #[serde(rename = "exclude")]
    pub exclude_patterns: Vec<String>,
    /// Coupling analysis.
    pub coupling: CouplingConfig,
    /// Cohesion analysis.
    pub cohesion: CohesionConfig,
    /// Cycle analysis.
    pub cycles: CyclesConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `JSCA_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| Error::config(e.to_string()))
    }

    /// Load configuration from directory, looking for jsca.toml or .jsca/jsca.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("jsca.toml")))
            .merge(Toml::file(dir.join(".jsca/jsca.toml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| Error::config(e.to_string()))
    }

    /// Default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }
}

/// Coupling analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    /// Internal-name prefixes of platform classes that never become vertices.
    pub platform_prefixes: Vec<String>,
    /// Universal root class; `extends` of it is not a relation.
    pub root_class: String,
    /// Fail when the highest per-class score exceeds this (0 disables).
    pub break_on_cbo: u32,
    /// Fail when any pairwise score exceeds this (0 disables).
    pub break_on_pair_cbo: u32,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            platform_prefixes: vec!["java/".to_string()],
            root_class: "java/lang/Object".to_string(),
            break_on_cbo: 0,
            break_on_pair_cbo: 0,
        }
    }
}

/// Cohesion analyzer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CohesionConfig {
    /// Fail when the highest LCOM exceeds this (0 disables).
    pub break_on_lcom: u32,
}

/// Cycle analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CyclesConfig {
    /// Fail when the dependency graph has a cycle.
    pub break_on_cycle: bool,
    /// jdeps binary used to extract the dependency graph.
    pub jdeps: String,
}

impl Default for CyclesConfig {
    fn default() -> Self {
        Self {
            break_on_cycle: false,
            jdeps: "jdeps".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
    /// Directory for JSON and DOT artifacts. Nothing is written when unset.
    pub dir: Option<PathBuf>,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// Markdown format.
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use 'text', 'json', or 'md'")),
        }
    }
}
