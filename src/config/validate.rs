//! Type coercion and constraint checks.
//!
//! Every function takes the already-interpolated raw string and the env key
//! the value came from (for error context). Empty input means "no value".

use std::collections::BTreeMap;
use std::net::IpAddr;

use regex::Regex;
use url::Url;

use super::error::{ConfigError, Result};
use super::resolve::interpolate;
use super::source::VariableNamespace;
use super::value::ResolvedValue;

/// Constraints for string values.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub required: bool,
    pub format: Option<Regex>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required: true,
            format: None,
        }
    }
}

pub fn string(key: &str, raw: Option<&str>, rules: &ValidationRules) -> Result<ResolvedValue> {
    let Some(value) = raw.filter(|v| !v.is_empty()) else {
        if rules.required {
            return Err(ConfigError::missing(
                key,
                format!("{key}: value required but not set"),
            ));
        }
        return Ok(ResolvedValue::Absent);
    };

    if let Some(format) = &rules.format {
        if !format.is_match(value) {
            return Err(ConfigError::bad(
                key,
                format!("does not match required format {}", format.as_str()),
            ));
        }
    }
    Ok(ResolvedValue::String(value.to_string()))
}

pub fn integer(key: &str, raw: &str) -> Result<ResolvedValue> {
    if raw.is_empty() {
        return Ok(ResolvedValue::Absent);
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let parsed = if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        raw.parse::<i64>().ok()
    } else {
        None
    };
    parsed
        .map(ResolvedValue::Integer)
        .ok_or_else(|| ConfigError::bad(key, format!("must be an integer, got: {raw}")))
}

pub fn boolean(key: &str, raw: &str) -> Result<ResolvedValue> {
    if raw.is_empty() {
        return Ok(ResolvedValue::Absent);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(ResolvedValue::Boolean(true)),
        "false" | "0" | "no" | "off" => Ok(ResolvedValue::Boolean(false)),
        _ => Err(ConfigError::bad(key, format!("must be true/false, got: {raw}"))),
    }
}

pub fn url(key: &str, raw: &str) -> Result<ResolvedValue> {
    if raw.is_empty() {
        return Ok(ResolvedValue::Absent);
    }
    match Url::parse(raw) {
        Ok(parsed) => Ok(ResolvedValue::Url(parsed)),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Err(ConfigError::bad(key, format!("must have a scheme, got: {raw}")))
        }
        Err(e) => Err(ConfigError::bad(key, format!("not a valid URL ({e}): {raw}"))),
    }
}

pub fn ip_list(key: &str, raw: &str) -> Result<ResolvedValue> {
    let mut entries = Vec::new();
    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !is_ip_or_cidr(segment) {
            return Err(ConfigError::bad(
                key,
                format!("invalid IP address or CIDR block: {segment}"),
            ));
        }
        entries.push(segment.to_string());
    }
    Ok(ResolvedValue::IpList(entries))
}

fn is_ip_or_cidr(segment: &str) -> bool {
    let Some((addr, prefix)) = segment.split_once('/') else {
        return segment.parse::<IpAddr>().is_ok();
    };
    let Ok(addr) = addr.parse::<IpAddr>() else {
        return false;
    };
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let max = if addr.is_ipv4() { 32 } else { 128 };
    prefix.parse::<u8>().is_ok_and(|p| p <= max)
}

/// Normalizes an object prefix: drops a trailing `*` and ensures a trailing `_`.
pub fn object_prefix(pattern: &str) -> String {
    let base = pattern.strip_suffix('*').unwrap_or(pattern);
    if base.ends_with('_') {
        base.to_string()
    } else {
        format!("{base}_")
    }
}

/// Collects every `PREFIX_*` variable into a map keyed by the lower-cased suffix.
pub fn object(pattern: &str, ns: &VariableNamespace<'_>) -> Result<ResolvedValue> {
    let prefix = object_prefix(pattern);
    let mut fields = BTreeMap::new();
    for key in ns.keys_with_prefix(&prefix) {
        let suffix = &key[prefix.len()..];
        if suffix.is_empty() {
            continue;
        }
        let raw = ns.lookup(&key).unwrap_or_default();
        fields.insert(suffix.to_lowercase(), interpolate(&raw, ns)?);
    }
    Ok(ResolvedValue::Object(fields))
}
