//! Rule engine - matching, scanning and actions for cleanup rules

mod action;
mod condition;
mod engine;

pub use action::{
    ActionOutcome, Outcome, Summary, destination_for, execute, planned_destinations,
    unique_destination,
};
pub use condition::{FileFacts, age_threshold};
pub use engine::{RunReport, ScanReport, ScanTask, Sweeper, run};

use crate::config::{ActionKind, RuleConfig};
use crate::error::ConfigError;
use regex::bytes::Regex;
use std::path::PathBuf;

/// Where a copy or move puts its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub destination: PathBuf,
    pub preserve_path: bool,
}

/// Action to perform on a matched file, fixed when the rule is compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Delete,
    Copy(Transfer),
    Move(Transfer),
    /// Report the match while scanning; never queued
    Print,
    /// Match silently; never queued
    Nothing,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Delete => ActionKind::Delete,
            Action::Copy(_) => ActionKind::Copy,
            Action::Move(_) => ActionKind::Move,
            Action::Print => ActionKind::Print,
            Action::Nothing => ActionKind::Nothing,
        }
    }

    /// Whether matches go to the executor
    pub fn is_queued(&self) -> bool {
        matches!(self, Action::Delete | Action::Copy(_) | Action::Move(_))
    }
}

/// A compiled rule that matches files and names an action
#[derive(Debug, Clone)]
pub struct Rule {
    /// Human-readable name
    pub name: String,

    /// Searched in the file's base name
    pub pattern: Regex,

    pub min_size_mb: u64,

    pub older_than_days: u64,

    /// Action to perform on matched files
    pub action: Action,
}

impl Rule {
    /// Compile a rule from its config form.
    ///
    /// Fails on an unparsable pattern, or on copy/move without a destination.
    pub fn compile(config: &RuleConfig) -> Result<Self, ConfigError> {
        let name = config.label().to_string();

        let pattern = Regex::new(&config.pattern).map_err(|source| ConfigError::InvalidPattern {
            rule: name.clone(),
            source,
        })?;

        let transfer = || -> Result<Transfer, ConfigError> {
            match config.action_to.as_deref() {
                Some(to) if !to.as_os_str().is_empty() => Ok(Transfer {
                    destination: crate::expand_path(to),
                    preserve_path: config.preserve_path,
                }),
                _ => Err(ConfigError::MissingDestination {
                    rule: name.clone(),
                    action: config.action.to_string(),
                }),
            }
        };

        let action = match config.action {
            ActionKind::Delete => Action::Delete,
            ActionKind::Copy => Action::Copy(transfer()?),
            ActionKind::Move => Action::Move(transfer()?),
            ActionKind::Print => Action::Print,
            ActionKind::Nothing => Action::Nothing,
        };

        Ok(Self {
            name,
            pattern,
            min_size_mb: config.min_size_mb,
            older_than_days: config.older_than_days,
            action,
        })
    }
}
