//! Property file parsing
//!
//! Legacy dataset and column definitions are `.properties` files: one
//! `key=value` (or `key: value`, or `key value`) pair per logical line, `#` and
//! `!` comment lines, backslash line continuations and backslash escapes.
//! File bytes are ISO-8859-1.

use std::collections::HashMap;

/// Parsed contents of a property file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// Parse property file text
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        let mut lines = content.lines();

        while let Some(line) = lines.next() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            let mut logical = trimmed.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_key_value(&logical);
            entries.insert(unescape(&key), unescape(&value));
        }

        Self { entries }
    }

    /// Parse property file bytes as ISO-8859-1
    ///
    /// Every byte maps to the code point of the same value; characters
    /// outside Latin-1 are written as `\uXXXX` escapes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&encoding_rs::mem::decode_latin1(bytes))
    }

    /// Raw value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Trimmed value of a key, treating blank values as absent
    pub fn get_trimmed(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped separator
///
/// The key keeps its escape sequences; they are resolved by `unescape`.
fn split_key_value(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '\\' {
            chars.next();
            key.push('\\');
            if let Some(escaped) = chars.next() {
                key.push(escaped);
            }
            continue;
        }
        if c == '=' || c == ':' || c.is_whitespace() {
            break;
        }
        key.push(c);
        chars.next();
    }

    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
    if matches!(chars.peek(), Some('=') | Some(':')) {
        chars.next();
    }
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }

    (key, chars.collect())
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
