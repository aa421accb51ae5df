//! Namespaced views over [`Settings`].

use std::collections::BTreeMap;

use super::builder::Settings;
use super::declaration::ConfigDeclaration;
use super::error::Result;
use super::value::ResolvedValue;

/// The declarations of one namespace, addressed by their bare accessor.
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    settings: &'a Settings,
    name: &'a str,
}

impl<'a> Group<'a> {
    pub(crate) fn new(settings: &'a Settings, name: &'a str) -> Self {
        Self { settings, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    fn members(&self) -> impl Iterator<Item = &'a ConfigDeclaration> {
        let name = self.name;
        self.settings
            .declarations()
            .filter(move |d| d.namespace.as_deref() == Some(name))
    }

    pub fn get(&self, accessor: &str) -> Result<ResolvedValue> {
        self.settings.get(&self.qualify(accessor))
    }

    pub fn fetch_or(&self, accessor: &str, default: ResolvedValue) -> Result<ResolvedValue> {
        self.settings.fetch_or(&self.qualify(accessor), default)
    }

    pub fn fetch_or_else<F>(&self, accessor: &str, f: F) -> Result<ResolvedValue>
    where
        F: FnOnce(&str) -> ResolvedValue,
    {
        self.settings.fetch_or_else(&self.qualify(accessor), f)
    }

    pub fn keys(&self) -> Vec<String> {
        self.members().map(|d| d.accessor.clone()).collect()
    }

    pub fn values(&self) -> Result<Vec<ResolvedValue>> {
        self.members().map(|d| self.settings.resolve(d)).collect()
    }

    pub fn to_map(&self) -> Result<BTreeMap<String, ResolvedValue>> {
        self.members()
            .map(|d| Ok((d.accessor.clone(), self.settings.resolve(d)?)))
            .collect()
    }

    fn qualify(&self, accessor: &str) -> String {
        format!("{}.{accessor}", self.name)
    }
}
