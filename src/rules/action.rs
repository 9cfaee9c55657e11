//! Rule actions - what to do with matched files

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::{Action, Transfer};
use crate::config::ActionKind;
use crate::scanner::MatchedFile;

/// How executing one action went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded {
        /// Where a copy or move put the file
        destination: Option<PathBuf>,
    },
    Failed {
        error: String,
    },
    /// A move copied the file but could not remove the source; it now exists twice
    Partial {
        destination: PathBuf,
        error: String,
    },
    /// Print and none are not executable
    Skipped,
}

/// Result of executing one matched file's action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub path: PathBuf,
    pub rule: String,
    pub action: ActionKind,
    pub outcome: Outcome,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.outcome, Outcome::Partial { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error } | Outcome::Partial { error, .. } => Some(error.as_str()),
            Outcome::Succeeded { .. } | Outcome::Skipped => None,
        }
    }

    pub fn destination(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Succeeded { destination } => destination.as_deref(),
            Outcome::Partial { destination, .. } => Some(destination.as_path()),
            Outcome::Failed { .. } | Outcome::Skipped => None,
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.outcome {
            Outcome::Succeeded {
                destination: Some(dest),
            } => write!(f, "{} {} -> {}", self.action, path, dest.display()),
            Outcome::Succeeded { destination: None } => write!(f, "{} {}", self.action, path),
            Outcome::Failed { error } => write!(f, "{} {} failed: {}", self.action, path, error),
            Outcome::Partial { destination, error } => write!(
                f,
                "{} {} -> {} copied but source not removed: {}",
                self.action,
                path,
                destination.display(),
                error
            ),
            Outcome::Skipped => write!(f, "{} {} skipped", self.action, path),
        }
    }
}

/// Counts of outcomes by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub partial: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn of(outcomes: &[ActionOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut s, o| {
            match o.outcome {
                Outcome::Succeeded { .. } => s.succeeded += 1,
                Outcome::Failed { .. } => s.failed += 1,
                Outcome::Partial { .. } => s.partial += 1,
                Outcome::Skipped => s.skipped += 1,
            }
            s
        })
    }

    /// Whether every action went through completely
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.partial == 0
    }
}

/// Execute every matched file's action in order.
///
/// A failure is recorded in its outcome and never stops the entries after it.
pub fn execute(matches: &[MatchedFile<'_>]) -> Vec<ActionOutcome> {
    matches.iter().map(apply).collect()
}

fn apply(matched: &MatchedFile<'_>) -> ActionOutcome {
    let path = &matched.path;
    let action = &matched.rule.action;

    let outcome = match action {
        Action::Delete => match remove(path) {
            Ok(()) => Outcome::Succeeded { destination: None },
            Err(e) => Outcome::Failed {
                error: format!("{:#}", e),
            },
        },

        Action::Copy(transfer) => match copy(matched, transfer) {
            Ok(dest) => Outcome::Succeeded {
                destination: Some(dest),
            },
            Err(e) => Outcome::Failed {
                error: format!("{:#}", e),
            },
        },

        Action::Move(transfer) => match copy(matched, transfer) {
            Ok(dest) => after_copy(dest, remove(path)),
            Err(e) => Outcome::Failed {
                error: format!("{:#}", e),
            },
        },

        Action::Print | Action::Nothing => {
            debug!("No action for {}", path.display());
            Outcome::Skipped
        }
    };

    let result = ActionOutcome {
        path: path.clone(),
        rule: matched.rule.name.clone(),
        action: action.kind(),
        outcome,
    };

    match result.outcome {
        Outcome::Failed { .. } => error!("{}", result),
        Outcome::Partial { .. } => warn!("{}", result),
        _ => {}
    }

    result
}

/// Settle a move once its copy landed at `destination`
fn after_copy(destination: PathBuf, removed: Result<()>) -> Outcome {
    match removed {
        Ok(()) => Outcome::Succeeded {
            destination: Some(destination),
        },
        Err(e) => Outcome::Partial {
            destination,
            error: format!("{:#}", e),
        },
    }
}

fn remove(path: &Path) -> Result<()> {
    info!("Deleting {}", path.display());
    std::fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))
}

/// Copy a matched file under its transfer root, never overwriting. Returns the path written.
fn copy(matched: &MatchedFile<'_>, transfer: &Transfer) -> Result<PathBuf> {
    let contents = std::fs::read(&matched.path)
        .with_context(|| format!("Failed to read {}", matched.path.display()))?;

    let dest = destination_for(matched, transfer)?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let written = write_new(&dest, &contents)?;
    info!("Copied {} -> {}", matched.path.display(), written.display());
    Ok(written)
}

/// Where a matched file goes before conflicts are resolved.
///
/// With `preserve_path` the path relative to the scanned folder is kept under
/// the destination, otherwise only the base name.
pub fn destination_for(matched: &MatchedFile<'_>, transfer: &Transfer) -> Result<PathBuf> {
    if transfer.preserve_path {
        Ok(transfer.destination.join(matched.relative_path()))
    } else {
        let filename = matched.path.file_name().context("File has no name")?;
        Ok(transfer.destination.join(filename))
    }
}

/// First name among `path`, `stem.1.ext`, `stem.2.ext`, ... that is neither on
/// disk nor in `claimed`
pub fn unique_destination(path: &Path, claimed: &HashSet<PathBuf>) -> PathBuf {
    let mut n = 0;
    loop {
        let candidate = numbered(path, n);
        if !candidate.exists() && !claimed.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Where each copy or move in `matches` would be written, in execution order.
///
/// Earlier entries claim their names, so copies that collide are numbered the
/// way `execute` numbers them. `None` for other actions and for files with no
/// usable destination.
pub fn planned_destinations(matches: &[MatchedFile<'_>]) -> Vec<Option<PathBuf>> {
    let mut claimed = HashSet::new();
    matches
        .iter()
        .map(|matched| {
            let transfer = match &matched.rule.action {
                Action::Copy(transfer) | Action::Move(transfer) => transfer,
                _ => return None,
            };
            let dest = destination_for(matched, transfer).ok()?;
            let planned = unique_destination(&dest, &claimed);
            claimed.insert(planned.clone());
            Some(planned)
        })
        .collect()
}

fn numbered(path: &Path, n: u64) -> PathBuf {
    if n == 0 {
        return path.to_path_buf();
    }

    // Built from OsStr pieces so names that are not UTF-8 survive intact
    let mut name = OsString::new();
    if let Some(stem) = path.file_stem() {
        name.push(stem);
    }
    name.push(".");
    name.push(n.to_string());
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Write `contents` to the first free numbered variant of `dest`
fn write_new(dest: &Path, contents: &[u8]) -> Result<PathBuf> {
    let mut n = 0;
    loop {
        let candidate = numbered(dest, n);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                if let Err(e) = file.write_all(contents) {
                    drop(file);
                    let _ = std::fs::remove_file(&candidate);
                    return Err(e)
                        .with_context(|| format!("Failed to write {}", candidate.display()));
                }
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next name", candidate.display());
                n += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", candidate.display()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use crate::rules::Rule;

    fn rule(action: ActionKind, to: &Path, preserve: bool) -> Rule {
        let config = RuleConfig::new(".*", action)
            .to(to)
            .preserve_path(preserve);
        Rule::compile(&config).unwrap()
    }

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_numbered() {
        let path = Path::new("/dest/aa.txt");
        assert_eq!(numbered(path, 0), PathBuf::from("/dest/aa.txt"));
        assert_eq!(numbered(path, 1), PathBuf::from("/dest/aa.1.txt"));
        assert_eq!(numbered(path, 2), PathBuf::from("/dest/aa.2.txt"));
        assert_eq!(numbered(Path::new("/d/archive.tar.gz"), 1), PathBuf::from("/d/archive.tar.1.gz"));
        assert_eq!(numbered(Path::new("/d/README"), 3), PathBuf::from("/d/README.3"));
    }

    #[test]
    fn test_unique_destination() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("aa.txt");
        let none = HashSet::new();
        assert_eq!(unique_destination(&target, &none), target);

        write(&target, "x");
        write(&dir.path().join("aa.1.txt"), "x");
        assert_eq!(unique_destination(&target, &none), dir.path().join("aa.2.txt"));

        let claimed = HashSet::from([dir.path().join("aa.2.txt")]);
        assert_eq!(unique_destination(&target, &claimed), dir.path().join("aa.3.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_numbered_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dest = Path::new("/dest");
        let path = dest.join(OsStr::from_bytes(b"r\xFFport.txt"));
        assert_eq!(
            numbered(&path, 1),
            dest.join(OsStr::from_bytes(b"r\xFFport.1.txt"))
        );
        let bare = dest.join(OsStr::from_bytes(b"\xFE\xFF"));
        assert_eq!(numbered(&bare, 2), dest.join(OsStr::from_bytes(b"\xFE\xFF.2")));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_conflict_with_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        let name = OsStr::from_bytes(b"r\xFFport.txt");
        write(&src.join("a").join(name), "first");
        write(&src.join("b").join(name), "second");

        let rule = rule(ActionKind::Copy, &dest, false);
        let matches = vec![
            MatchedFile {
                rule: &rule,
                path: src.join("a").join(name),
                root: &src,
            },
            MatchedFile {
                rule: &rule,
                path: src.join("b").join(name),
                root: &src,
            },
        ];

        let outcomes = execute(&matches);
        assert!(outcomes.iter().all(ActionOutcome::is_success));
        let second = dest.join(OsStr::from_bytes(b"r\xFFport.1.txt"));
        assert_eq!(outcomes[1].destination(), Some(second.as_path()));
        assert_eq!(std::fs::read_to_string(dest.join(name)).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "second");
    }

    #[test]
    fn test_planned_destinations_claim_names() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write(&src.join("a/aa.txt"), "first");
        write(&src.join("b/aa.txt"), "second");
        write(&dest.join("aa.txt"), "already here");

        let copy = rule(ActionKind::Copy, &dest, false);
        let delete = Rule::compile(&RuleConfig::new(".*", ActionKind::Delete)).unwrap();
        let matches = vec![
            MatchedFile {
                rule: &copy,
                path: src.join("a/aa.txt"),
                root: &src,
            },
            MatchedFile {
                rule: &delete,
                path: src.join("a/aa.txt"),
                root: &src,
            },
            MatchedFile {
                rule: &copy,
                path: src.join("b/aa.txt"),
                root: &src,
            },
        ];

        let planned = planned_destinations(&matches);
        assert_eq!(
            planned,
            vec![Some(dest.join("aa.1.txt")), None, Some(dest.join("aa.2.txt"))]
        );
        // Planning touches nothing
        assert!(!dest.join("aa.1.txt").exists());
    }

    #[test]
    fn test_destination_for() {
        let root = Path::new("/src");
        let flat = rule(ActionKind::Copy, Path::new("/dest"), false);
        let nested = rule(ActionKind::Copy, Path::new("/dest"), true);

        let matched = MatchedFile {
            rule: &flat,
            path: PathBuf::from("/src/a/aa.txt"),
            root,
        };
        let Action::Copy(transfer) = &flat.action else {
            unreachable!()
        };
        assert_eq!(
            destination_for(&matched, transfer).unwrap(),
            PathBuf::from("/dest/aa.txt")
        );

        let matched = MatchedFile {
            rule: &nested,
            path: PathBuf::from("/src/a/aa.txt"),
            root,
        };
        let Action::Copy(transfer) = &nested.action else {
            unreachable!()
        };
        assert_eq!(
            destination_for(&matched, transfer).unwrap(),
            PathBuf::from("/dest/a/aa.txt")
        );
    }

    #[test]
    fn test_copy_twice_numbers_the_second() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write(&src.join("a/aa.txt"), "first");
        write(&src.join("b/aa.txt"), "second");

        let rule = rule(ActionKind::Copy, &dest, false);
        let matches = vec![
            MatchedFile {
                rule: &rule,
                path: src.join("a/aa.txt"),
                root: &src,
            },
            MatchedFile {
                rule: &rule,
                path: src.join("b/aa.txt"),
                root: &src,
            },
        ];

        let outcomes = execute(&matches);
        assert!(outcomes.iter().all(ActionOutcome::is_success));
        assert_eq!(outcomes[0].destination(), Some(dest.join("aa.txt").as_path()));
        assert_eq!(outcomes[1].destination(), Some(dest.join("aa.1.txt").as_path()));
        assert_eq!(std::fs::read_to_string(dest.join("aa.txt")).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(dest.join("aa.1.txt")).unwrap(), "second");
        assert!(src.join("a/aa.txt").exists());
        assert!(src.join("b/aa.txt").exists());
    }

    #[test]
    fn test_delete_missing_file_fails_without_stopping() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("gone.txt"), "x");
        write(&root.join("keep.txt"), "x");
        std::fs::remove_file(root.join("gone.txt")).unwrap();

        let rule = Rule::compile(&RuleConfig::new(".*", ActionKind::Delete)).unwrap();
        let matches = vec![
            MatchedFile {
                rule: &rule,
                path: root.join("gone.txt"),
                root,
            },
            MatchedFile {
                rule: &rule,
                path: root.join("keep.txt"),
                root,
            },
        ];

        let outcomes = execute(&matches);
        assert!(!outcomes[0].is_success());
        assert!(outcomes[0].error().unwrap().contains("Failed to delete"));
        assert!(outcomes[1].is_success());
        assert!(!root.join("keep.txt").exists());
    }

    #[test]
    fn test_move_with_unwritable_destination_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        write(&src.join("aa.txt"), "data");
        // A regular file where the destination directory should be
        let blocker = dir.path().join("blocker");
        write(&blocker, "not a dir");

        let rule = rule(ActionKind::Move, &blocker.join("sub"), false);
        let matches = vec![MatchedFile {
            rule: &rule,
            path: src.join("aa.txt"),
            root: &src,
        }];

        let outcomes = execute(&matches);
        assert!(matches!(outcomes[0].outcome, Outcome::Failed { .. }));
        assert_eq!(std::fs::read_to_string(src.join("aa.txt")).unwrap(), "data");
    }

    #[test]
    fn test_move_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write(&src.join("a/aa.txt"), "data");

        let rule = rule(ActionKind::Move, &dest, true);
        let matches = vec![MatchedFile {
            rule: &rule,
            path: src.join("a/aa.txt"),
            root: &src,
        }];

        let outcomes = execute(&matches);
        assert!(outcomes[0].is_success());
        assert!(!src.join("a/aa.txt").exists());
        assert_eq!(std::fs::read_to_string(dest.join("a/aa.txt")).unwrap(), "data");
    }

    #[test]
    fn test_failed_removal_after_copy_is_partial() {
        let err = anyhow::anyhow!("Permission denied");
        let outcome = after_copy(PathBuf::from("/dest/aa.txt"), Err(err));
        assert_eq!(
            outcome,
            Outcome::Partial {
                destination: PathBuf::from("/dest/aa.txt"),
                error: "Permission denied".to_string(),
            }
        );

        let outcome = after_copy(PathBuf::from("/dest/aa.txt"), Ok(()));
        assert!(matches!(outcome, Outcome::Succeeded { destination: Some(_) }));
    }

    #[cfg(unix)]
    #[test]
    fn test_move_from_read_only_folder_is_partial() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write(&src.join("aa.txt"), "data");
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o555)).unwrap();
        // Root ignores directory permissions, so the source could still be removed
        if std::fs::File::create(src.join("writable")).is_ok() {
            std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let rule = rule(ActionKind::Move, &dest, false);
        let matches = vec![MatchedFile {
            rule: &rule,
            path: src.join("aa.txt"),
            root: &src,
        }];

        let outcomes = execute(&matches);
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(outcomes[0].is_partial());
        assert!(matches!(
            &outcomes[0].outcome,
            Outcome::Partial { destination, .. } if *destination == dest.join("aa.txt")
        ));
        assert!(outcomes[0].error().unwrap().contains("aa.txt"));
        assert_eq!(std::fs::read_to_string(src.join("aa.txt")).unwrap(), "data");
        assert_eq!(std::fs::read_to_string(dest.join("aa.txt")).unwrap(), "data");
    }

    #[test]
    fn test_print_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("x.txt"), "x");
        let rule = Rule::compile(&RuleConfig::new(".*", ActionKind::Print)).unwrap();
        let matches = vec![MatchedFile {
            rule: &rule,
            path: dir.path().join("x.txt"),
            root: dir.path(),
        }];

        let outcomes = execute(&matches);
        assert_eq!(outcomes[0].outcome, Outcome::Skipped);
        assert!(dir.path().join("x.txt").exists());
    }

    #[test]
    fn test_summary() {
        let outcome = |outcome| ActionOutcome {
            path: PathBuf::from("/x"),
            rule: "r".to_string(),
            action: ActionKind::Move,
            outcome,
        };
        let outcomes = vec![
            outcome(Outcome::Succeeded { destination: None }),
            outcome(Outcome::Failed {
                error: "e".to_string(),
            }),
            outcome(Outcome::Partial {
                destination: PathBuf::from("/y"),
                error: "e".to_string(),
            }),
        ];

        let summary = Summary::of(&outcomes);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.partial, 1);
        assert!(!summary.is_clean());
        assert!(Summary::of(&outcomes[..1]).is_clean());
    }
}
