//! Events reported while scanning
//!
//! Every diagnostic is logged when it is recorded and also kept, in order, in
//! the scan report.

use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::ActionKind;
use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A configured folder does not exist; it was skipped
    FolderMissing { folder: PathBuf },
    /// A configured folder is not a directory; it was skipped
    NotADirectory { folder: PathBuf },
    /// An entry could not be read during the walk; it was skipped
    Unreadable {
        path: Option<PathBuf>,
        message: String,
    },
    /// A `print` rule matched
    Found { rule: String, path: PathBuf },
    /// A file was queued for an action
    Marked {
        rule: String,
        action: ActionKind,
        path: PathBuf,
    },
}

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::FolderMissing { .. }
            | Diagnostic::NotADirectory { .. }
            | Diagnostic::Unreadable { .. } => Severity::Warning,
            Diagnostic::Found { .. } | Diagnostic::Marked { .. } => Severity::Info,
        }
    }

    /// Emit this diagnostic through `tracing`
    pub fn log(&self) {
        match self.severity() {
            Severity::Warning => warn!("{}", self),
            Severity::Info => info!("{}", self),
        }
    }
}

impl From<ScanError> for Diagnostic {
    fn from(err: ScanError) -> Self {
        Diagnostic::Unreadable {
            path: err.path,
            message: err.message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FolderMissing { folder } => {
                write!(f, "Folder {} does not exist, skipping", folder.display())
            }
            Diagnostic::NotADirectory { folder } => {
                write!(f, "{} is not a directory, skipping", folder.display())
            }
            Diagnostic::Unreadable {
                path: Some(path),
                message,
            } => write!(f, "Could not read {}: {}", path.display(), message),
            Diagnostic::Unreadable {
                path: None,
                message,
            } => write!(f, "Could not read entry: {}", message),
            Diagnostic::Found { rule, path } => {
                write!(f, "Found {} (rule '{}')", path.display(), rule)
            }
            Diagnostic::Marked { rule, action, path } => {
                write!(
                    f,
                    "Marked {} for {} (rule '{}')",
                    path.display(),
                    action,
                    rule
                )
            }
        }
    }
}
