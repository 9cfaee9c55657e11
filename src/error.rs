//! Error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run before any file is touched
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file at {}", .0.display())]
    NotFound(PathBuf),

    #[error("could not determine a configuration path")]
    NoDefaultPath,

    #[error("failed to read config from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{} already exists, remove it first", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule '{rule}' has an invalid pattern")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}' uses action '{action}' but has no action_to")]
    MissingDestination { rule: String, action: String },
}

/// A directory entry that could not be read during a walk
#[derive(Debug, Error)]
#[error("{}", describe(.path.as_deref(), .message))]
pub struct ScanError {
    pub path: Option<PathBuf>,
    pub message: String,
}

fn describe(path: Option<&std::path::Path>, message: &str) -> String {
    match path {
        Some(p) => format!("could not read {}: {}", p.display(), message),
        None => format!("could not read entry: {}", message),
    }
}

impl From<walkdir::Error> for ScanError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from);
        let message = match err.io_error() {
            Some(io) => io.to_string(),
            None => err.to_string(),
        };
        Self { path, message }
    }
}
