use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;

use super::builder::Settings;
use super::error::{ConfigError, Result};
use super::validate::ValidationRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigType {
    String,
    Integer,
    Boolean,
    Url,
    IpList,
    /// Collects every variable sharing a prefix into a map.
    Object,
}

impl FromStr for ConfigType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "url" => Ok(Self::Url),
            "ip_list" => Ok(Self::IpList),
            "object" => Ok(Self::Object),
            other => Err(ConfigError::UnknownConfigType(other.to_string())),
        }
    }
}

type DeferredFn = dyn Fn(&Settings) -> Result<String> + Send + Sync;

/// A fallback raw value, used when the variable is unset or empty.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(String),
    /// Computed on demand from the rest of the configuration.
    Deferred(Arc<DeferredFn>),
}

impl DefaultValue {
    pub(crate) fn evaluate(&self, settings: &Settings) -> Result<String> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Deferred(f) => f(settings),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// One declared configuration value.
///
/// The accessor defaults to the lower-cased env var (with any trailing `*` or
/// `_` of an object prefix removed).
///
/// ```
/// use envdecl::{ConfigDeclaration, ConfigType};
///
/// let decl = ConfigDeclaration::new("DATABASE_URL", ConfigType::Url)
///     .scheme("postgres")
///     .namespace("database")
///     .accessor("url");
/// assert_eq!(decl.qualified_name(), "database.url");
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDeclaration {
    pub env_var: String,
    pub ty: ConfigType,
    pub accessor: String,
    pub default: Option<DefaultValue>,
    pub rules: ValidationRules,
    pub url_scheme: Option<String>,
    pub namespace: Option<String>,
}

impl ConfigDeclaration {
    pub fn new(env_var: impl Into<String>, ty: ConfigType) -> Self {
        let env_var = env_var.into();
        let accessor = env_var
            .trim_end_matches('*')
            .trim_end_matches('_')
            .to_lowercase();
        Self {
            env_var,
            ty,
            accessor,
            default: None,
            rules: ValidationRules::default(),
            url_scheme: None,
            namespace: None,
        }
    }

    pub fn string(env_var: impl Into<String>) -> Self {
        Self::new(env_var, ConfigType::String)
    }

    pub fn integer(env_var: impl Into<String>) -> Self {
        Self::new(env_var, ConfigType::Integer)
    }

    pub fn boolean(env_var: impl Into<String>) -> Self {
        Self::new(env_var, ConfigType::Boolean)
    }

    pub fn url(env_var: impl Into<String>) -> Self {
        Self::new(env_var, ConfigType::Url)
    }

    pub fn ip_list(env_var: impl Into<String>) -> Self {
        Self::new(env_var, ConfigType::IpList)
    }

    pub fn object(prefix: impl Into<String>) -> Self {
        Self::new(prefix, ConfigType::Object)
    }

    #[must_use]
    pub fn accessor(mut self, name: impl Into<String>) -> Self {
        self.accessor = name.into();
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    #[must_use]
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Settings) -> Result<String> + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Deferred(Arc::new(f)));
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.rules.required = false;
        self
    }

    #[must_use]
    pub fn format(mut self, pattern: Regex) -> Self {
        self.rules.format = Some(pattern);
        self
    }

    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.url_scheme = Some(scheme.into());
        self
    }

    #[must_use]
    pub fn namespace(mut self, name: impl Into<String>) -> Self {
        self.namespace = Some(name.into());
        self
    }

    /// The registry key: `namespace.accessor`, or just `accessor`.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.accessor),
            None => self.accessor.clone(),
        }
    }
}
