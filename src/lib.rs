//! Declarative configuration resolved from the process environment and
//! `.env`-style files.
//!
//! Declare each value once with its env var, type, default and rules, then
//! resolve it on access. See [`Settings`] for the full pipeline.

pub mod config;

pub use config::{
    ConfigDeclaration, ConfigError, ConfigType, DefaultValue, Group, ProcessEnv, ResolvedValue,
    Settings, SettingsBuilder,
};
