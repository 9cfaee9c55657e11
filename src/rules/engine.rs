//! Rule engine - pairs folders with rules, scans, and hands matches to the executor

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use super::{Action, ActionOutcome, Rule, execute};
use crate::config::Config;
use crate::diagnostics::Diagnostic;
use crate::error::ConfigError;
use crate::scanner::{MatchedFile, Scanner};

/// One folder paired with one rule
#[derive(Debug, Clone, Copy)]
pub struct ScanTask<'a> {
    pub folder_index: usize,
    pub folder: &'a Path,
    pub rule: &'a Rule,
}

/// Everything a scan found, in folder, rule, walk order
#[derive(Debug, Default)]
pub struct ScanReport<'a> {
    /// Files queued for delete, copy or move
    pub matches: Vec<MatchedFile<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> ScanReport<'a> {
    fn record(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }

    fn accept(&mut self, matched: MatchedFile<'a>) {
        let rule = matched.rule;
        if rule.action.is_queued() {
            self.record(Diagnostic::Marked {
                rule: rule.name.clone(),
                action: rule.action.kind(),
                path: matched.path.clone(),
            });
            self.matches.push(matched);
        } else if matches!(rule.action, Action::Print) {
            self.record(Diagnostic::Found {
                rule: rule.name.clone(),
                path: matched.path,
            });
        } else {
            trace!("Rule '{}' matched with no action: {}", rule.name, matched.path.display());
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunReport {
    pub diagnostics: Vec<Diagnostic>,
    pub outcomes: Vec<ActionOutcome>,
}

/// Scans configured folders with compiled rules
#[derive(Debug, Clone)]
pub struct Sweeper {
    folders: Vec<PathBuf>,
    rules: Vec<Rule>,
}

impl Sweeper {
    /// Compile the configuration.
    ///
    /// Every enabled rule is compiled up front, so a bad pattern or a copy/move
    /// rule without a destination fails here, before any file is touched.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            if !rule.enabled {
                trace!("Skipping disabled rule: {}", rule.label());
                continue;
            }
            rules.push(Rule::compile(rule)?);
        }

        let folders = config
            .folders
            .iter()
            .map(|f| crate::expand_path(&f.path))
            .collect();

        Ok(Self { folders, rules })
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The folder × rule cross product, folder order outer, rule order inner
    pub fn scan_tasks(&self) -> Vec<ScanTask<'_>> {
        self.folders
            .iter()
            .enumerate()
            .flat_map(|(folder_index, folder)| {
                self.rules.iter().map(move |rule| ScanTask {
                    folder_index,
                    folder,
                    rule,
                })
            })
            .collect()
    }

    /// Scan every folder with every rule, judging age against the current time
    pub fn scan(&self) -> ScanReport<'_> {
        self.scan_at(Local::now())
    }

    /// Scan every folder with every rule, judging age against `now`.
    ///
    /// Missing folders and unreadable entries are reported and skipped.
    pub fn scan_at(&self, now: DateTime<Local>) -> ScanReport<'_> {
        let scanner = Scanner::new(now);
        let mut report = ScanReport::default();

        if self.rules.is_empty() {
            warn!("No enabled rules, nothing to scan");
        }

        let tasks = self.scan_tasks();
        for folder_tasks in tasks.chunk_by(|a, b| a.folder_index == b.folder_index) {
            let folder = folder_tasks[0].folder;
            info!("Searching folder {}: {}", folder_tasks[0].folder_index + 1, folder.display());

            if !folder.exists() {
                report.record(Diagnostic::FolderMissing {
                    folder: folder.to_path_buf(),
                });
                continue;
            }
            if !folder.is_dir() {
                report.record(Diagnostic::NotADirectory {
                    folder: folder.to_path_buf(),
                });
                continue;
            }

            for task in folder_tasks {
                debug!("Applying rule '{}' to {}", task.rule.name, folder.display());
                for item in scanner.scan(task.folder, task.rule) {
                    match item {
                        Ok(matched) => report.accept(matched),
                        Err(e) => report.record(e.into()),
                    }
                }
            }
        }

        info!(
            "Scan finished: {} files pending, {} diagnostics",
            report.matches.len(),
            report.diagnostics.len()
        );
        report
    }

    /// Scan and execute in one pass
    pub fn run(&self) -> RunReport {
        let report = self.scan();
        let outcomes = execute(&report.matches);
        RunReport {
            diagnostics: report.diagnostics,
            outcomes,
        }
    }
}

/// Compile, scan and execute a configuration.
///
/// Only configuration problems are returned as errors; everything after that is
/// captured in the report.
pub fn run(config: &Config) -> Result<RunReport, ConfigError> {
    Ok(Sweeper::new(config)?.run())
}
