//! Directory walking - yields files under a folder that match one rule

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::rules::{FileFacts, Rule};

/// One file that satisfied one rule
#[derive(Debug, Clone)]
pub struct MatchedFile<'a> {
    pub rule: &'a Rule,
    pub path: PathBuf,
    /// Folder the file was found under
    pub root: &'a Path,
}

impl MatchedFile<'_> {
    /// Path relative to the scanned folder
    pub fn relative_path(&self) -> &Path {
        self.path.strip_prefix(self.root).unwrap_or(self.path.as_path())
    }
}

/// Walks folders for matching files.
///
/// Every scan starts a fresh depth-first walk. Entries within a directory are
/// visited in file-name order. Symbolic links are never followed and never match.
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    now: DateTime<Local>,
}

impl Scanner {
    /// Create a scanner that judges file age against `now`
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Local> {
        self.now
    }

    /// Lazily walk `root` and yield files matching `rule`
    pub fn scan<'a>(&self, root: &'a Path, rule: &'a Rule) -> Scan<'a> {
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Scan {
            walker,
            rule,
            root,
            now: self.now,
        }
    }
}

/// Iterator over the matches of one rule in one folder.
///
/// Unreadable entries come out as `Err` and the walk carries on.
pub struct Scan<'a> {
    walker: walkdir::IntoIter,
    rule: &'a Rule,
    root: &'a Path,
    now: DateTime<Local>,
}

impl<'a> Iterator for Scan<'a> {
    type Item = Result<MatchedFile<'a>, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };

            if entry.file_type().is_dir() {
                continue;
            }

            if entry.path_is_symlink() {
                trace!("Skipping symlink: {}", entry.path().display());
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => return Some(Err(e.into())),
            };

            let facts = match FileFacts::from_metadata(entry.file_name(), &metadata) {
                Ok(f) => f,
                Err(e) => {
                    return Some(Err(ScanError {
                        path: Some(entry.path().to_path_buf()),
                        message: e.to_string(),
                    }));
                }
            };

            if self.rule.matches(&facts, self.now) {
                trace!("Rule '{}' matched: {}", self.rule.name, entry.path().display());
                return Some(Ok(MatchedFile {
                    rule: self.rule,
                    path: entry.into_path(),
                    root: self.root,
                }));
            }
        }
    }
}
