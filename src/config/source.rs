//! The two lookup layers a value is resolved against.

use std::collections::{BTreeSet, HashMap};

use super::env::ProcessEnv;

/// Ordered key/value pairs read from env files.
///
/// Keys keep the position of their first insertion; re-inserting a key
/// replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvMapping {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl RawEnvMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Applies `overlay` on top of this mapping; overlay values win.
    pub fn merge(&mut self, overlay: RawEnvMapping) {
        for (key, value) in overlay.entries {
            self.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawEnvMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

/// Layered lookup: the process environment first, then the loaded files.
#[derive(Debug, Clone, Copy)]
pub struct VariableNamespace<'a> {
    process: &'a ProcessEnv,
    files: &'a RawEnvMapping,
}

impl<'a> VariableNamespace<'a> {
    pub fn new(process: &'a ProcessEnv, files: &'a RawEnvMapping) -> Self {
        Self { process, files }
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        self.process
            .get(name)
            .or_else(|| self.files.get(name).map(str::to_owned))
    }

    /// Every key in either layer starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: BTreeSet<String> =
            self.process.keys_with_prefix(prefix).into_iter().collect();
        keys.extend(
            self.files
                .keys()
                .filter(|k| k.starts_with(prefix))
                .map(str::to_owned),
        );
        keys.into_iter().collect()
    }
}
