//! `.env` text parsing.
//!
//! Extracts raw `KEY=value` pairs, handling quoting and comments. `$VAR` and
//! `${...}` sequences are kept verbatim; expansion happens at resolution time.

use super::source::RawEnvMapping;

/// Parses env-file text into an ordered mapping. Later lines win.
pub fn parse(text: &str) -> RawEnvMapping {
    let mut mapping = RawEnvMapping::new();
    for line in text.lines() {
        if let Some((key, rest)) = split_assignment(line) {
            mapping.insert(key, unquote(rest));
        }
    }
    mapping
}

/// Splits a `[export ]KEY = rest` line into its key and raw remainder.
///
/// Blank lines, comments, and lines of any other shape yield `None`.
pub(crate) fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(after) = line.strip_prefix("export") {
        if after.starts_with(char::is_whitespace) {
            if let Some(parsed) = split_key(after.trim_start()) {
                return Some(parsed);
            }
        }
    }
    split_key(line)
}

fn split_key(line: &str) -> Option<(&str, &str)> {
    let end = identifier_len(line);
    if end == 0 {
        return None;
    }
    let (key, rest) = line.split_at(end);
    let rest = rest.trim_start().strip_prefix('=')?;
    Some((key, rest.trim_start()))
}

/// Length in bytes of the identifier (`[A-Za-z_][A-Za-z0-9_]*`) at the start of `s`.
pub(crate) fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (i, ch) in s.char_indices() {
        let ok = if i == 0 {
            ch.is_ascii_alphabetic() || ch == '_'
        } else {
            ch.is_ascii_alphanumeric() || ch == '_'
        };
        if !ok {
            break;
        }
        len = i + ch.len_utf8();
    }
    len
}

fn unquote(rest: &str) -> String {
    match rest.chars().next() {
        Some('"') => {
            if let Some((inner, after)) = split_quoted(rest, '"') {
                if is_comment_or_blank(after) {
                    return unescape_double(inner);
                }
            }
        }
        Some('\'') => {
            if let Some((inner, after)) = split_quoted(rest, '\'') {
                if is_comment_or_blank(after) {
                    return inner.replace("\\'", "'");
                }
            }
        }
        _ => {}
    }
    strip_inline_comment(rest).trim().to_string()
}

/// Splits `"inner"after` at the first unescaped closing quote.
fn split_quoted(s: &str, quote: char) -> Option<(&str, &str)> {
    let body = &s[quote.len_utf8()..];
    let mut chars = body.char_indices();
    while let Some((i, ch)) = chars.next() {
        if ch == '\\' {
            chars.next();
        } else if ch == quote {
            return Some((&body[..i], &body[i + ch.len_utf8()..]));
        }
    }
    None
}

fn is_comment_or_blank(s: &str) -> bool {
    let s = s.trim_start();
    s.is_empty() || s.starts_with('#')
}

fn unescape_double(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Drops a `#` comment that is preceded by whitespace.
fn strip_inline_comment(s: &str) -> &str {
    let mut prev_ws = false;
    for (i, ch) in s.char_indices() {
        if ch == '#' && prev_ws {
            return &s[..i];
        }
        prev_ws = ch.is_whitespace();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_pairs_and_comments() {
        let mapping = parse(
            "# leading comment\n\
             \n\
             HOST=localhost\n\
             PORT = 5432\n\
             export USER=admin\n\
             not a pair\n\
             1BAD=nope\n",
        );

        assert_eq!(mapping.get("HOST"), Some("localhost"));
        assert_eq!(mapping.get("PORT"), Some("5432"));
        assert_eq!(mapping.get("USER"), Some("admin"));
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_double_quoted_with_comment() {
        let mapping = parse(r#"GREETING="hello \"world\"\nbye"  # trailing"#);
        assert_eq!(mapping.get("GREETING"), Some("hello \"world\"\nbye"));
    }

    #[test]
    fn test_double_quoted_unknown_escape_passes_through() {
        let mapping = parse(r#"PATTERN="a\d+\\b\tc""#);
        assert_eq!(mapping.get("PATTERN"), Some("a\\d+\\b\tc"));
    }

    #[test]
    fn test_single_quoted_keeps_backslashes() {
        let mapping = parse(r"RAW='it\'s C:\path\n' # note");
        assert_eq!(mapping.get("RAW"), Some(r"it's C:\path\n"));
    }

    #[test]
    fn test_unquoted_inline_comment() {
        let mapping = parse("KEY=value # comment\nHASH=abc#def\nSPACED=  padded   ");
        assert_eq!(mapping.get("KEY"), Some("value"));
        assert_eq!(mapping.get("HASH"), Some("abc#def"));
        assert_eq!(mapping.get("SPACED"), Some("padded"));
    }

    #[test]
    fn test_unterminated_quote_is_unquoted() {
        let mapping = parse("KEY=\"open # comment");
        assert_eq!(mapping.get("KEY"), Some("\"open"));
    }

    #[test]
    fn test_interpolation_syntax_preserved() {
        let mapping = parse(
            "URL=postgres://${DB_HOST:-localhost}/$DB_NAME\n\
             QUOTED=\"${TOKEN:?token required}\"\n",
        );
        assert_eq!(
            mapping.get("URL"),
            Some("postgres://${DB_HOST:-localhost}/$DB_NAME")
        );
        assert_eq!(mapping.get("QUOTED"), Some("${TOKEN:?token required}"));
    }

    #[test]
    fn test_later_definition_wins() {
        let mapping = parse("A=1\nB=2\nA=3\n");
        assert_eq!(mapping.get("A"), Some("3"));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_export_as_key_name() {
        let mapping = parse("export=yes\nexportFOO=1");
        assert_eq!(mapping.get("export"), Some("yes"));
        assert_eq!(mapping.get("exportFOO"), Some("1"));
    }

    #[test]
    fn test_empty_values() {
        let mapping = parse("EMPTY=\nQUOTED=\"\"\nSINGLE=''");
        assert_eq!(mapping.get("EMPTY"), Some(""));
        assert_eq!(mapping.get("QUOTED"), Some(""));
        assert_eq!(mapping.get("SINGLE"), Some(""));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "A=\"x\\ty\"\nB='z' # c\nC=${A}\n";
        assert_eq!(parse(text), parse(text));
    }
}
