//! Rule conditions - matching files on name, age and size

use chrono::{DateTime, Days, Local, TimeDelta};
use std::ffi::{OsStr, OsString};
use std::fs::Metadata;

use super::Rule;

/// Metadata of a directory entry, as seen by the matcher
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub is_file: bool,
    /// Base name exactly as the filesystem reports it
    pub file_name: OsString,
    /// Size in bytes
    pub len: u64,
    pub modified: DateTime<Local>,
}

impl FileFacts {
    /// Snapshot an entry's metadata. Fails when the modification time is unavailable.
    pub fn from_metadata(file_name: &OsStr, metadata: &Metadata) -> std::io::Result<Self> {
        Ok(Self {
            is_file: metadata.is_file(),
            file_name: file_name.to_os_string(),
            len: metadata.len(),
            modified: DateTime::from(metadata.modified()?),
        })
    }
}

/// Latest modification time a rule with `older_than_days` still accepts (exclusive).
///
/// Days are calendar days in local time. A result that lands in a DST gap falls
/// back to whole 24h periods. `None` when the subtraction leaves chrono's range;
/// nothing matches then.
pub fn age_threshold(now: DateTime<Local>, older_than_days: u64) -> Option<DateTime<Local>> {
    now.checked_sub_days(Days::new(older_than_days)).or_else(|| {
        let days = i64::try_from(older_than_days).ok()?;
        now.checked_sub_signed(TimeDelta::try_days(days)?)
    })
}

impl Rule {
    /// Check if an entry matches this rule at time `now`
    pub fn matches(&self, facts: &FileFacts, now: DateTime<Local>) -> bool {
        if !facts.is_file {
            return false;
        }

        // Raw bytes, so names that are not UTF-8 are matched as they are
        if !self.pattern.is_match(facts.file_name.as_encoded_bytes()) {
            return false;
        }

        match age_threshold(now, self.older_than_days) {
            Some(threshold) if facts.modified < threshold => {}
            _ => return false,
        }

        // Size in thousands of bytes against a field named in MB; kept as-is.
        facts.len / 1000 >= self.min_size_mb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionKind, RuleConfig};
    use chrono::{Duration, TimeZone};

    fn rule(pattern: &str, min_size_mb: u64, older_than_days: u64) -> Rule {
        let mut config = RuleConfig::new(pattern, ActionKind::Delete);
        config.min_size_mb = min_size_mb;
        config.older_than_days = older_than_days;
        Rule::compile(&config).unwrap()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn file(name: &str, len: u64, modified: DateTime<Local>) -> FileFacts {
        FileFacts {
            is_file: true,
            file_name: OsString::from(name),
            len,
            modified,
        }
    }

    #[test]
    fn test_directories_never_match() {
        let r = rule(".*", 0, 0);
        let mut facts = file("aa.txt", 10, now() - Duration::days(1));
        facts.is_file = false;
        assert!(!r.matches(&facts, now()));
    }

    #[test]
    fn test_pattern_is_unanchored() {
        let r = rule("aa", 0, 0);
        let old = now() - Duration::hours(1);
        assert!(r.matches(&file("baab.txt", 0, old), now()));
        assert!(!r.matches(&file("ab.txt", 0, old), now()));

        let anchored = rule(r"^aa\.txt$", 0, 0);
        assert!(anchored.matches(&file("aa.txt", 0, old), now()));
        assert!(!anchored.matches(&file("baa.txt", 0, old), now()));
    }

    #[test]
    fn test_age_threshold_is_strict() {
        let r = rule("log", 0, 3);
        let threshold = age_threshold(now(), 3).unwrap();

        assert!(!r.matches(&file("a.log", 0, threshold), now()));
        assert!(r.matches(&file("a.log", 0, threshold - Duration::seconds(1)), now()));
        assert!(!r.matches(&file("a.log", 0, threshold + Duration::seconds(1)), now()));
    }

    #[test]
    fn test_zero_days_means_anything_before_now() {
        let r = rule("log", 0, 0);
        assert!(r.matches(&file("a.log", 0, now() - Duration::seconds(1)), now()));
        assert!(!r.matches(&file("a.log", 0, now()), now()));
        assert!(!r.matches(&file("a.log", 0, now() + Duration::minutes(5)), now()));
    }

    #[test]
    fn test_size_divides_by_thousand() {
        let r = rule("bin", 2, 0);
        let old = now() - Duration::days(1);
        assert!(!r.matches(&file("a.bin", 1999, old), now()));
        assert!(r.matches(&file("a.bin", 2000, old), now()));
        assert!(r.matches(&file("a.bin", 2999, old), now()));
    }

    #[test]
    fn test_huge_age_matches_nothing() {
        let r = rule("x", 0, u64::MAX);
        let ancient = Local.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert!(!r.matches(&file("x", 0, ancient), now()));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_match_on_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let mut facts = file("", 10, now() - Duration::days(1));
        facts.file_name = OsStr::from_bytes(b"r\xFFport.txt").to_os_string();

        assert!(rule(r"port\.txt$", 0, 0).matches(&facts, now()));
        assert!(rule(r"^r(?-u:\xFF)port", 0, 0).matches(&facts, now()));
        // The lossy form would carry U+FFFD instead of the original byte
        assert!(!rule("\u{FFFD}", 0, 0).matches(&facts, now()));
    }

    #[test]
    fn test_facts_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, vec![0u8; 1500]).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        let facts = FileFacts::from_metadata(path.file_name().unwrap(), &metadata).unwrap();
        assert!(facts.is_file);
        assert_eq!(facts.file_name, "data.bin");
        assert_eq!(facts.len, 1500);

        let metadata = std::fs::metadata(dir.path()).unwrap();
        let facts = FileFacts::from_metadata(OsStr::new("dir"), &metadata).unwrap();
        assert!(!facts.is_file);
    }
}
