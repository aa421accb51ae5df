//! Detection of keys redefined inside a single env file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, DuplicateEntry, Result};
use super::parser::split_assignment;

/// Tracks the first line each key was defined on, per file path.
///
/// A path that is fed in twice shares its tracker, so every key of the second
/// pass is reported against the first.
#[derive(Debug, Default)]
pub struct DuplicateKeyScanner {
    seen: HashMap<PathBuf, HashMap<String, usize>>,
    duplicates: Vec<DuplicateEntry>,
}

impl DuplicateKeyScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans already-read file content.
    pub fn scan_text(&mut self, path: &Path, text: &str) {
        let first_seen = self.seen.entry(path.to_path_buf()).or_default();

        for (idx, line) in text.lines().enumerate() {
            let Some((key, _)) = split_assignment(line) else {
                continue;
            };
            let line_no = idx + 1;
            match first_seen.get(key) {
                Some(&first_line) => self.duplicates.push(DuplicateEntry {
                    path: path.to_path_buf(),
                    key: key.to_string(),
                    first_line,
                    duplicate_line: line_no,
                    line_content: line.to_string(),
                }),
                None => {
                    first_seen.insert(key.to_string(), line_no);
                }
            }
        }
    }

    pub fn duplicates(&self) -> &[DuplicateEntry] {
        &self.duplicates
    }

    pub fn into_duplicates(self) -> Vec<DuplicateEntry> {
        self.duplicates
    }
}

/// Scans every existing file in `paths`. Missing files are skipped.
pub fn scan<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<DuplicateEntry>> {
    let mut scanner = DuplicateKeyScanner::new();
    for path in paths {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => scanner.scan_text(path, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }
    Ok(scanner.into_duplicates())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_scan_text_reports_redefinitions() {
        let mut scanner = DuplicateKeyScanner::new();
        scanner.scan_text(
            Path::new(".env"),
            "# header\nHOST=a\nPORT=1\n\nexport HOST=b\nHOST=c\n",
        );

        let dups = scanner.duplicates();
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].key, "HOST");
        assert_eq!(dups[0].first_line, 2);
        assert_eq!(dups[0].duplicate_line, 5);
        assert_eq!(dups[0].line_content, "export HOST=b");
        assert_eq!(dups[1].first_line, 2);
        assert_eq!(dups[1].duplicate_line, 6);
    }

    #[test]
    fn test_different_files_are_independent() {
        let mut scanner = DuplicateKeyScanner::new();
        scanner.scan_text(Path::new("a.env"), "HOST=a\n");
        scanner.scan_text(Path::new("b.env"), "HOST=b\n");
        assert!(scanner.duplicates().is_empty());
    }

    #[test]
    fn test_same_path_twice_is_duplicate() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "HOST=a").unwrap();
        writeln!(file, "PORT=1").unwrap();

        let dups = scan(&[file.path(), file.path()]).unwrap();
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].key, "HOST");
        assert_eq!((dups[0].first_line, dups[0].duplicate_line), (1, 1));
    }

    #[test]
    fn test_scan_skips_missing_files() {
        let dups = scan(&["/nonexistent/path/.env"]).unwrap();
        assert!(dups.is_empty());
    }

    #[test]
    fn test_scan_unreadable_path_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = scan(&[dir.path()]).unwrap_err();
        let ConfigError::ReadError { path, .. } = &err else {
            panic!("expected ReadError, got {err}");
        };
        assert_eq!(path, dir.path());
    }
}
