//! Declarative configuration resolved from the environment and env files.

mod builder;
mod declaration;
mod dummy;
mod env;
mod error;
mod file;
mod group;
mod parser;
mod resolve;
mod scanner;
mod source;
mod validate;
mod value;

pub use builder::{Settings, SettingsBuilder, DUMMY_MODE_VAR, DUMMY_SUFFIX, ROOT_VAR};
pub use declaration::{ConfigDeclaration, ConfigType, DefaultValue};
pub use dummy::DummyStore;
pub use env::ProcessEnv;
pub use error::{ConfigError, DuplicateEntry, Result};
pub use file::{load, load_multiple};
pub use group::Group;
pub use parser::parse;
pub use resolve::interpolate;
pub use scanner::{scan, DuplicateKeyScanner};
pub use source::{RawEnvMapping, VariableNamespace};
pub use validate::ValidationRules;
pub use value::ResolvedValue;
