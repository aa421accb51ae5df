//! Env-file loading.

use std::path::Path;

use tracing::{debug, warn};

use super::error::{ConfigError, Result};
use super::parser::parse;
use super::scanner::DuplicateKeyScanner;
use super::source::RawEnvMapping;

/// Loads a single env file.
///
/// A missing file yields an empty mapping. No duplicate checking is done here;
/// within one file the last definition simply wins.
pub fn load(path: impl AsRef<Path>) -> Result<RawEnvMapping> {
    let path = path.as_ref();
    Ok(read_env_file(path)?.map(|text| parse(&text)).unwrap_or_default())
}

/// Loads several env files in order, later files overriding earlier ones.
///
/// Missing files are skipped. If any file redefines one of its own keys, the
/// whole load fails with every duplicate listed and no mapping is returned.
pub fn load_multiple<P: AsRef<Path>>(paths: &[P]) -> Result<RawEnvMapping> {
    let mut scanner = DuplicateKeyScanner::new();
    let mut merged = RawEnvMapping::new();

    for path in paths {
        let path = path.as_ref();
        let Some(text) = read_env_file(path)? else {
            continue;
        };
        scanner.scan_text(path, &text);
        merged.merge(parse(&text));
    }

    let duplicates = scanner.into_duplicates();
    if !duplicates.is_empty() {
        warn!(count = duplicates.len(), "duplicate keys in env files");
        return Err(ConfigError::DuplicateKey(duplicates));
    }

    Ok(merged)
}

/// Reads an env file, returning `Ok(None)` if it doesn't exist.
fn read_env_file(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            debug!(path = %path.display(), "loaded env file");
            Ok(Some(contents))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "env file not found, skipping");
            Ok(None)
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
