use std::collections::BTreeMap;

/// The authoritative variable layer.
///
/// `System` reads and writes the real process environment. `Fixed` is an
/// in-memory stand-in so resolution can run without touching global state.
#[derive(Debug, Clone, Default)]
pub enum ProcessEnv {
    #[default]
    System,
    Fixed(BTreeMap<String, String>),
}

impl ProcessEnv {
    pub fn system() -> Self {
        Self::System
    }

    pub fn fixed<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Self::System => std::env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            Self::System => std::env::var_os(key).is_some(),
            Self::Fixed(vars) => vars.contains_key(key),
        }
    }

    /// Sets `key` only when it is not already present.
    ///
    /// Returns whether the value was written.
    pub fn set_if_absent(&mut self, key: &str, value: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        match self {
            Self::System => std::env::set_var(key, value),
            Self::Fixed(vars) => {
                vars.insert(key.to_string(), value.to_string());
            }
        }
        true
    }

    pub fn remove(&mut self, key: &str) {
        match self {
            Self::System => std::env::remove_var(key),
            Self::Fixed(vars) => {
                vars.remove(key);
            }
        }
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self {
            // Non-unicode variables cannot be configuration keys; skip them.
            Self::System => std::env::vars_os()
                .filter_map(|(k, _)| k.into_string().ok())
                .filter(|k| k.starts_with(prefix))
                .collect(),
            Self::Fixed(vars) => vars
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
        }
    }
}

/// Reads a `1`/`true` style switch.
pub(crate) fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_fixed_lookup() {
        let env = ProcessEnv::fixed([("HOST", "localhost")]);
        assert_eq!(env.get("HOST").as_deref(), Some("localhost"));
        assert!(env.contains("HOST"));
        assert_eq!(env.get("PORT"), None);
    }

    #[test]
    fn test_fixed_set_if_absent_never_overwrites() {
        let mut env = ProcessEnv::fixed([("HOST", "process")]);
        assert!(!env.set_if_absent("HOST", "file"));
        assert!(env.set_if_absent("PORT", "5432"));
        assert_eq!(env.get("HOST").as_deref(), Some("process"));
        assert_eq!(env.get("PORT").as_deref(), Some("5432"));
    }

    #[test]
    #[serial]
    fn test_system_layer_reads_real_environment() {
        std::env::set_var("ENVDECL_TEST_SYSTEM_LAYER", "yes");
        let env = ProcessEnv::system();

        assert_eq!(env.get("ENVDECL_TEST_SYSTEM_LAYER").as_deref(), Some("yes"));
        assert!(env
            .keys_with_prefix("ENVDECL_TEST_SYSTEM_")
            .contains(&"ENVDECL_TEST_SYSTEM_LAYER".to_string()));

        std::env::remove_var("ENVDECL_TEST_SYSTEM_LAYER");
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("TRUE")));
        assert!(is_truthy(Some("true")));
        assert!(!is_truthy(Some("yes")));
        assert!(!is_truthy(Some("0")));
        assert!(!is_truthy(None));
    }
}
