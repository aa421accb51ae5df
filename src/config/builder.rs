use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::declaration::{ConfigDeclaration, ConfigType};
use super::dummy::DummyStore;
use super::env::{is_truthy, ProcessEnv};
use super::error::{ConfigError, Result};
use super::file::load_multiple;
use super::group::Group;
use super::resolve::interpolate;
use super::source::{RawEnvMapping, VariableNamespace};
use super::validate;
use super::value::ResolvedValue;

/// Enables dummy fallback for every required key when set to `1` or `true`.
pub const DUMMY_MODE_VAR: &str = "CONFIG_DUMMY_MODE";

/// Root directory under which dummy values are stored (`<root>/tmp/`).
pub const ROOT_VAR: &str = "CONFIG_ROOT";

/// Suffix of the per-key dummy override, e.g. `API_KEY_DUMMY=1`.
pub const DUMMY_SUFFIX: &str = "_DUMMY";

thread_local! {
    /// Declarations currently being resolved on this thread, keyed by owner.
    static RESOLVING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// The variable layers of one load.
#[derive(Debug)]
struct Snapshot {
    process: ProcessEnv,
    files: RawEnvMapping,
}

#[derive(Debug, Default)]
struct LoadRequest {
    paths: Vec<PathBuf>,
    propagate: bool,
    /// Keys this load exported into the process layer, with the exported value.
    exported: Vec<(String, String)>,
}

#[derive(Debug)]
struct Loaded {
    snapshot: Arc<Snapshot>,
    request: LoadRequest,
}

/// Declared configuration resolved on every access.
///
/// Values are looked up in the process environment first, then in the loaded
/// env files. Each lookup interpolates references, applies the declared
/// default, falls back to a persisted dummy value when dummy mode allows it,
/// and coerces the result to the declared type.
///
/// ## Example
///
/// ```no_run
/// use envdecl::{ConfigDeclaration, Settings};
///
/// let settings = Settings::builder()
///     .declare(ConfigDeclaration::url("DATABASE_URL").scheme("postgres"))
///     .declare(ConfigDeclaration::integer("PORT").default_value("3000"))
///     .declare(ConfigDeclaration::boolean("DEBUG").optional())
///     .build();
///
/// settings.load(&[".env", ".env.local"], false)?;
///
/// let port = settings.get("port")?.as_i64();
/// let db = settings.get("database_url")?;
/// # Ok::<(), envdecl::ConfigError>(())
/// ```
///
/// `load` and `reload` swap in a fresh snapshot of the file layer, so a
/// `Settings` can be shared across threads while it is being reloaded.
#[derive(Debug)]
pub struct Settings {
    declarations: Vec<ConfigDeclaration>,
    index: HashMap<String, usize>,
    groups: Vec<String>,
    base_env: ProcessEnv,
    root: Option<PathBuf>,
    dummy_mode: Option<bool>,
    loaded: RwLock<Loaded>,
}

impl Settings {
    /// Creates a new settings builder.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Registers a declaration. Re-registering a qualified name replaces the
    /// previous declaration in place.
    pub fn declare(&mut self, declaration: ConfigDeclaration) {
        if let Some(ns) = &declaration.namespace {
            self.register_group(ns.clone());
        }
        let name = declaration.qualified_name();
        match self.index.get(&name) {
            Some(&pos) => self.declarations[pos] = declaration,
            None => {
                self.index.insert(name, self.declarations.len());
                self.declarations.push(declaration);
            }
        }
    }

    /// Registers a namespace so [`group`](Self::group) finds it even before
    /// any declaration names it.
    pub fn register_group(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.groups.contains(&name) {
            self.groups.push(name);
        }
    }

    pub fn declaration(&self, name: &str) -> Option<&ConfigDeclaration> {
        self.index.get(name).map(|&pos| &self.declarations[pos])
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ConfigDeclaration> {
        self.declarations.iter()
    }

    /// Loads env files in order, later files overriding earlier ones.
    ///
    /// Missing files are skipped. Fails without changing the current state
    /// if any file redefines one of its keys. With `propagate`, file values
    /// are exported into the process layer for keys it doesn't already hold.
    pub fn load<P: AsRef<Path>>(&self, paths: &[P], propagate: bool) -> Result<()> {
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        self.load_paths(paths, propagate)
    }

    /// Re-reads the files of the last [`load`](Self::load).
    pub fn reload(&self) -> Result<()> {
        let (paths, propagate) = {
            let loaded = self.read_loaded();
            (loaded.request.paths.clone(), loaded.request.propagate)
        };
        self.load_paths(paths, propagate)
    }

    fn load_paths(&self, paths: Vec<PathBuf>, propagate: bool) -> Result<()> {
        let files = load_multiple(&paths)?;

        let mut loaded = self
            .loaded
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut process = self.base_env.clone();
        // Leave keys alone that the host has reassigned since the last export.
        for (key, value) in &loaded.request.exported {
            if process.get(key).as_deref() == Some(value.as_str()) {
                process.remove(key);
            }
        }

        let mut exported = Vec::new();
        if propagate {
            for (key, value) in files.iter() {
                if process.set_if_absent(key, value) {
                    exported.push((key.to_string(), value.to_string()));
                }
            }
        }

        debug!(
            files = paths.len(),
            keys = files.len(),
            exported = exported.len(),
            "env files loaded"
        );

        *loaded = Loaded {
            snapshot: Arc::new(Snapshot { process, files }),
            request: LoadRequest {
                paths,
                propagate,
                exported,
            },
        };
        Ok(())
    }

    /// Resolves the value declared under `name` (`accessor` or `namespace.accessor`).
    pub fn get(&self, name: &str) -> Result<ResolvedValue> {
        let declaration = self
            .declaration(name)
            .ok_or_else(|| ConfigError::UnknownKey(name.to_string()))?;
        self.resolve(declaration)
    }

    /// Like [`get`](Self::get), but returns `default` for undeclared or absent values.
    pub fn fetch_or(&self, name: &str, default: ResolvedValue) -> Result<ResolvedValue> {
        self.fetch_or_else(name, |_| default)
    }

    pub fn fetch_or_else<F>(&self, name: &str, f: F) -> Result<ResolvedValue>
    where
        F: FnOnce(&str) -> ResolvedValue,
    {
        match self.declaration(name) {
            Some(declaration) => match self.resolve(declaration)? {
                ResolvedValue::Absent => Ok(f(name)),
                value => Ok(value),
            },
            None => Ok(f(name)),
        }
    }

    /// Qualified names of every declaration, in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.declarations
            .iter()
            .map(ConfigDeclaration::qualified_name)
            .collect()
    }

    pub fn values(&self) -> Result<Vec<ResolvedValue>> {
        self.declarations.iter().map(|d| self.resolve(d)).collect()
    }

    /// Resolves every declaration into a map keyed by qualified name.
    pub fn to_map(&self) -> Result<BTreeMap<String, ResolvedValue>> {
        self.declarations
            .iter()
            .map(|d| Ok((d.qualified_name(), self.resolve(d)?)))
            .collect()
    }

    /// Renders every resolved value as a TOML table. Namespaces become nested
    /// tables; absent values are left out.
    ///
    /// Fails with [`ConfigError::BadConfig`] if a top-level accessor has the
    /// same name as a namespace of another declaration.
    pub fn to_table(&self) -> Result<toml::Table> {
        if let Some(clash) = self.declarations.iter().find(|d| {
            d.namespace.is_none()
                && self
                    .declarations
                    .iter()
                    .any(|other| other.namespace.as_deref() == Some(d.accessor.as_str()))
        }) {
            return Err(ConfigError::bad(
                &clash.env_var,
                format!(
                    "accessor '{}' collides with a namespace of the same name",
                    clash.accessor
                ),
            ));
        }

        let mut table = toml::Table::new();
        for declaration in &self.declarations {
            let Some(value) = self.resolve(declaration)?.to_toml() else {
                continue;
            };
            let target = match &declaration.namespace {
                Some(ns) => {
                    let entry = table
                        .entry(ns.clone())
                        .or_insert(toml::Value::Table(toml::Table::new()));
                    match entry {
                        toml::Value::Table(nested) => nested,
                        _ => {
                            return Err(ConfigError::bad(
                                &declaration.env_var,
                                format!("namespace '{ns}' is not a table"),
                            ))
                        }
                    }
                }
                None => &mut table,
            };
            target.insert(declaration.accessor.clone(), value);
        }
        Ok(table)
    }

    /// Deserializes the resolved configuration into `T`.
    ///
    /// ```no_run
    /// use envdecl::{ConfigDeclaration, Settings};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct AppConfig {
    ///     port: i64,
    ///     database: Database,
    /// }
    ///
    /// #[derive(Deserialize)]
    /// struct Database {
    ///     url: String,
    /// }
    ///
    /// let settings = Settings::builder()
    ///     .declare(ConfigDeclaration::integer("PORT"))
    ///     .declare(ConfigDeclaration::url("DATABASE_URL").namespace("database").accessor("url"))
    ///     .build();
    /// settings.load(&[".env"], false)?;
    ///
    /// let config: AppConfig = settings.extract()?;
    /// # Ok::<(), envdecl::ConfigError>(())
    /// ```
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        let value = toml::Value::Table(self.to_table()?);
        value.try_into().map_err(ConfigError::DeserializeError)
    }

    /// Returns the named namespace, if registered.
    pub fn group(&self, name: &str) -> Option<Group<'_>> {
        self.groups
            .iter()
            .find(|g| *g == name)
            .map(|g| Group::new(self, g))
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    fn read_loaded(&self) -> std::sync::RwLockReadGuard<'_, Loaded> {
        self.loaded
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.read_loaded().snapshot)
    }

    pub(crate) fn resolve(&self, declaration: &ConfigDeclaration) -> Result<ResolvedValue> {
        let _guard = ResolveGuard::enter(self, declaration.qualified_name())?;

        let snapshot = self.snapshot();
        let ns = VariableNamespace::new(&snapshot.process, &snapshot.files);
        let key = declaration.env_var.as_str();

        if declaration.ty == ConfigType::Object {
            return validate::object(key, &ns);
        }

        let mut value = match ns.lookup(key) {
            Some(raw) => Some(interpolate(&raw, &ns)?),
            None => None,
        }
        .filter(|v| !v.is_empty());

        if value.is_none() {
            if let Some(default) = &declaration.default {
                trace!(key, "using declared default");
                value = Some(default.evaluate(self)?).filter(|v| !v.is_empty());
            }
        }

        let Some(value) = value else {
            if !declaration.rules.required {
                return coerce(declaration, "");
            }
            if self.dummy_enabled(&ns, key) {
                let store = DummyStore::new(self.dummy_root(&ns));
                let dummy = store.fetch_or_generate(key, declaration.url_scheme.as_deref())?;
                return Ok(ResolvedValue::String(dummy));
            }
            return Err(ConfigError::missing(
                key,
                format!("missing required configuration: {key}"),
            ));
        };

        coerce(declaration, &value)
    }

    fn dummy_enabled(&self, ns: &VariableNamespace<'_>, key: &str) -> bool {
        let global = self
            .dummy_mode
            .unwrap_or_else(|| is_truthy(ns.lookup(DUMMY_MODE_VAR).as_deref()));
        global || is_truthy(ns.lookup(&format!("{key}{DUMMY_SUFFIX}")).as_deref())
    }

    fn dummy_root(&self, ns: &VariableNamespace<'_>) -> PathBuf {
        self.root
            .clone()
            .or_else(|| ns.lookup(ROOT_VAR).filter(|r| !r.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn coerce(declaration: &ConfigDeclaration, raw: &str) -> Result<ResolvedValue> {
    let key = declaration.env_var.as_str();
    match declaration.ty {
        ConfigType::String => {
            validate::string(key, Some(raw).filter(|r| !r.is_empty()), &declaration.rules)
        }
        ConfigType::Integer => validate::integer(key, raw),
        ConfigType::Boolean => validate::boolean(key, raw),
        ConfigType::Url => validate::url(key, raw),
        ConfigType::IpList => validate::ip_list(key, raw),
        ConfigType::Object => Ok(ResolvedValue::Absent),
    }
}

/// Marks a declaration as in-flight so a default that reads itself fails
/// instead of recursing forever.
struct ResolveGuard {
    owner: usize,
}

impl ResolveGuard {
    fn enter(settings: &Settings, name: String) -> Result<Self> {
        let owner = settings as *const Settings as usize;
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(o, n)| *o == owner && *n == name) {
                return Err(ConfigError::CircularReference(name));
            }
            stack.push((owner, name));
            Ok(Self { owner })
        })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|(o, _)| *o == self.owner) {
                stack.remove(pos);
            }
        });
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SettingsBuilder {
    process_env: ProcessEnv,
    root: Option<PathBuf>,
    dummy_mode: Option<bool>,
    declarations: Vec<ConfigDeclaration>,
    groups: Vec<String>,
}

impl SettingsBuilder {
    /// Replaces the process layer. Defaults to the real environment.
    pub fn process_env(mut self, env: ProcessEnv) -> Self {
        self.process_env = env;
        self
    }

    /// Directory under which dummy values are stored. Overrides `CONFIG_ROOT`.
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Forces global dummy mode on or off. Overrides `CONFIG_DUMMY_MODE`.
    pub fn dummy_mode(mut self, enabled: bool) -> Self {
        self.dummy_mode = Some(enabled);
        self
    }

    pub fn declare(mut self, declaration: ConfigDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.groups.push(name.into());
        self
    }

    pub fn build(self) -> Settings {
        let snapshot = Snapshot {
            process: self.process_env.clone(),
            files: RawEnvMapping::new(),
        };
        let mut settings = Settings {
            declarations: Vec::new(),
            index: HashMap::new(),
            groups: Vec::new(),
            base_env: self.process_env,
            root: self.root,
            dummy_mode: self.dummy_mode,
            loaded: RwLock::new(Loaded {
                snapshot: Arc::new(snapshot),
                request: LoadRequest::default(),
            }),
        };
        for group in self.groups {
            settings.register_group(group);
        }
        for declaration in self.declarations {
            settings.declare(declaration);
        }
        settings
    }
}
