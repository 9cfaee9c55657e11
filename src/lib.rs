//! filesweep - rule-based disk cleanup and archival
//!
//! Scans folders, matches files against rules on name pattern, age and size,
//! then deletes, copies or moves what matched.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod rules;
pub mod scanner;

pub use config::Config;
pub use diagnostics::Diagnostic;
pub use error::{ConfigError, ScanError};
pub use rules::{Action, ActionOutcome, Outcome, Rule, Summary, Sweeper, execute, run};
pub use scanner::{MatchedFile, Scanner};

/// Current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Expand ~ and environment variables ($VAR, ${VAR}) in a path
pub fn expand_path(path: &std::path::Path) -> std::path::PathBuf {
    let path_str = path.to_string_lossy();

    let expanded = if let Some(stripped) = path_str.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(stripped).to_string_lossy().to_string(),
            None => path_str.to_string(),
        }
    } else if path_str == "~" {
        match dirs::home_dir() {
            Some(home) => home.to_string_lossy().to_string(),
            None => path_str.to_string(),
        }
    } else {
        path_str.to_string()
    };

    use std::sync::LazyLock;
    static ENV_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("invalid env regex")
    });

    // Unset variables are left as written
    let result = ENV_RE.replace_all(&expanded, |caps: &regex::Captures| {
        let var_name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    });

    std::path::PathBuf::from(result.as_ref())
}
