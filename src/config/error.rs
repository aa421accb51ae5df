use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required value is absent after default and dummy fallback, or a
    /// `${VAR:?msg}` reference failed.
    #[error("{message}")]
    MissingConfig { key: String, message: String },

    /// Coercion or format validation failed.
    #[error("{key}: {message}")]
    BadConfig { key: String, message: String },

    #[error("{}", DuplicateList(.0))]
    DuplicateKey(Vec<DuplicateEntry>),

    #[error("unknown config type: {0}")]
    UnknownConfigType(String),

    #[error("no configuration declared as '{0}'")]
    UnknownKey(String),

    #[error("circular reference detected while resolving '{0}'")]
    CircularReference(String),

    #[error("failed to read env file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write dummy value '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn missing(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    pub(crate) fn bad(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadConfig {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// One redefinition of a key inside a single env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEntry {
    pub path: PathBuf,
    pub key: String,
    pub first_line: usize,
    pub duplicate_line: usize,
    /// The raw redefining line. Kept out of `Display` since it may hold a secret.
    pub line_content: String,
}

struct DuplicateList<'a>(&'a [DuplicateEntry]);

impl fmt::Display for DuplicateList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate keys in env files:")?;
        for entry in self.0 {
            write!(
                f,
                "\n  {}: '{}' defined on line {} and again on line {}",
                entry.path.display(),
                entry.key,
                entry.first_line,
                entry.duplicate_line
            )?;
        }
        Ok(())
    }
}
