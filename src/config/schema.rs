//! Configuration schema

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Folders to scan, in order
    #[serde(default, rename = "folder")]
    pub folders: Vec<FolderConfig>,

    /// Matching rules, in order
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Ask once before executing pending actions. Advisory: only the CLI reads it.
    #[serde(default)]
    pub prompt_before_action: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            prompt_before_action: false,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A root directory to scan recursively
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderConfig {
    #[serde(alias = "name")]
    pub path: PathBuf,
}

impl FolderConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Action named by a rule in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Delete,
    Copy,
    Move,
    Print,
    #[serde(rename = "none")]
    Nothing,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Delete => "delete",
            ActionKind::Copy => "copy",
            ActionKind::Move => "move",
            ActionKind::Print => "print",
            ActionKind::Nothing => "none",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule as written in the config file, before its pattern is compiled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Human-readable name; the pattern is used when empty
    #[serde(default)]
    pub name: String,

    /// Whether the rule takes part in the scan
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Regex searched in the file's base name
    pub pattern: String,

    /// Minimum size, compared against the size in bytes divided by 1000
    #[serde(default)]
    pub min_size_mb: u64,

    /// Only files last modified before now minus this many days match
    #[serde(default)]
    pub older_than_days: u64,

    pub action: ActionKind,

    /// Destination root for copy and move
    #[serde(default)]
    pub action_to: Option<PathBuf>,

    /// Keep the path relative to the scanned folder under `action_to`
    #[serde(default)]
    pub preserve_path: bool,
}

fn default_enabled() -> bool {
    true
}

impl RuleConfig {
    /// Create an enabled rule with no size or age limits
    pub fn new(pattern: impl Into<String>, action: ActionKind) -> Self {
        Self {
            name: String::new(),
            enabled: true,
            pattern: pattern.into(),
            min_size_mb: 0,
            older_than_days: 0,
            action,
            action_to: None,
            preserve_path: false,
        }
    }

    pub fn to(mut self, destination: impl Into<PathBuf>) -> Self {
        self.action_to = Some(destination.into());
        self
    }

    pub fn preserve_path(mut self, preserve: bool) -> Self {
        self.preserve_path = preserve;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name used in logs and errors
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.pattern
        } else {
            &self.name
        }
    }
}
