//! Variable reference expansion.
//!
//! Supports `$NAME`, `${NAME}`, `${NAME:-default}` and `${NAME:?message}`.
//! Names are looked up in the process layer first, then the loaded files.
//! Operands are taken literally; they are not expanded themselves.

use super::error::{ConfigError, Result};
use super::parser::identifier_len;
use super::source::VariableNamespace;

/// Expands every reference in `raw`, left to right.
///
/// Unset names expand to the empty string. A failed `:?` reference aborts the
/// whole string with [`ConfigError::MissingConfig`]. Expressions with an
/// unknown modifier or a malformed name are copied through unchanged.
pub fn interpolate(raw: &str, ns: &VariableNamespace<'_>) -> Result<String> {
    if !raw.contains('$') {
        return Ok(raw.to_string());
    }

    let mut result = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(body) = after.strip_prefix('{') {
            match body.find('}') {
                Some(close) => {
                    let expr = &body[..close];
                    match expand_expression(expr, ns)? {
                        Some(value) => result.push_str(&value),
                        None => {
                            result.push_str("${");
                            result.push_str(expr);
                            result.push('}');
                        }
                    }
                    rest = &body[close + 1..];
                }
                None => {
                    // Unterminated: copy the remainder verbatim.
                    result.push('$');
                    rest = after;
                }
            }
            continue;
        }

        let len = identifier_len(after);
        if len == 0 {
            result.push('$');
        } else {
            result.push_str(&ns.lookup(&after[..len]).unwrap_or_default());
        }
        rest = &after[len..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Evaluates the inside of `${...}`. `Ok(None)` means "leave verbatim".
fn expand_expression(expr: &str, ns: &VariableNamespace<'_>) -> Result<Option<String>> {
    let len = identifier_len(expr);
    if len == 0 {
        return Ok(None);
    }
    let (name, modifier) = expr.split_at(len);

    if modifier.is_empty() {
        return Ok(Some(ns.lookup(name).unwrap_or_default()));
    }

    let value = ns.lookup(name).filter(|v| !v.is_empty());
    if let Some(default) = modifier.strip_prefix(":-") {
        return Ok(Some(value.unwrap_or_else(|| default.to_string())));
    }
    if let Some(message) = modifier.strip_prefix(":?") {
        return match value {
            Some(v) => Ok(Some(v)),
            None if message.is_empty() => Err(ConfigError::missing(
                name,
                format!("{name}: parameter not set"),
            )),
            None => Err(ConfigError::missing(name, message)),
        };
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::ProcessEnv;
    use crate::config::source::RawEnvMapping;

    fn expand(raw: &str, process: &[(&str, &str)], files: &[(&str, &str)]) -> Result<String> {
        let process = ProcessEnv::fixed(process.iter().copied());
        let files: RawEnvMapping = files.iter().copied().collect();
        interpolate(raw, &VariableNamespace::new(&process, &files))
    }

    #[test]
    fn test_braced_reference_prefers_process() {
        let out = expand("http://${HOST}/api", &[("HOST", "proc")], &[("HOST", "file")]).unwrap();
        assert_eq!(out, "http://proc/api");
    }

    #[test]
    fn test_braced_reference_falls_back_to_file() {
        let out = expand("${HOST}", &[], &[("HOST", "file")]).unwrap();
        assert_eq!(out, "file");
    }

    #[test]
    fn test_missing_reference_is_empty() {
        assert_eq!(expand("[${HOST}]", &[], &[]).unwrap(), "[]");
        assert_eq!(expand("[$HOST]", &[], &[]).unwrap(), "[]");
    }

    #[test]
    fn test_bare_reference() {
        let out = expand("$USER@$HOST:5432", &[("USER", "app")], &[("HOST", "db")]).unwrap();
        assert_eq!(out, "app@db:5432");
    }

    #[test]
    fn test_default_modifier() {
        assert_eq!(expand("${HOST:-x}", &[], &[]).unwrap(), "x");
        assert_eq!(expand("${HOST:-x}", &[("HOST", "")], &[]).unwrap(), "x");
        assert_eq!(expand("${HOST:-x}", &[], &[("HOST", "real")]).unwrap(), "real");
    }

    #[test]
    fn test_default_operand_is_not_expanded() {
        let out = expand("${HOST:-$OTHER}", &[("OTHER", "o")], &[]).unwrap();
        assert_eq!(out, "$OTHER");
    }

    #[test]
    fn test_required_modifier() {
        assert_eq!(expand("${HOST:?missing}", &[("HOST", "h")], &[]).unwrap(), "h");

        let err = expand("${HOST:?missing host}", &[], &[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfig { ref key, .. } if key == "HOST"));
        assert_eq!(err.to_string(), "missing host");

        let err = expand("${HOST:?}", &[("HOST", "")], &[]).unwrap_err();
        assert_eq!(err.to_string(), "HOST: parameter not set");
    }

    #[test]
    fn test_required_failure_aborts_whole_string() {
        let result = expand("${A}-${B:?b required}-${C}", &[("A", "a"), ("C", "c")], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_modifier_is_verbatim() {
        assert_eq!(expand("${HOST:+alt}", &[("HOST", "h")], &[]).unwrap(), "${HOST:+alt}");
        assert_eq!(expand("${1BAD}", &[], &[]).unwrap(), "${1BAD}");
        assert_eq!(expand("${}", &[], &[]).unwrap(), "${}");
    }

    #[test]
    fn test_lone_dollar_and_unterminated() {
        assert_eq!(expand("cost: $5", &[], &[]).unwrap(), "cost: $5");
        assert_eq!(expand("trailing $", &[], &[]).unwrap(), "trailing $");
        assert_eq!(expand("${HOST", &[("HOST", "h")], &[]).unwrap(), "${HOST");
    }

    #[test]
    fn test_resolved_string_is_unchanged() {
        let plain = "postgres://db:5432/app";
        assert_eq!(expand(plain, &[], &[]).unwrap(), plain);
    }
}
