//! Cookie header parsing.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// Cookies sent with a request, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    /// Parse a `Cookie` header value.
    ///
    /// - pairs are separated by `;` and optional spaces
    /// - pairs without `=` are skipped
    /// - names and values are trimmed; surrounding quotes are removed
    /// - values are percent-decoded, the raw value is kept if that fails
    /// - the first occurrence of a name wins
    pub fn parse(header: &str) -> Self {
        let mut cookies = HashMap::new();

        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = unquote(value.trim());

            cookies
                .entry(name.to_string())
                .or_insert_with(|| decode(value));
        }

        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    match value.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"').unwrap_or(rest),
        None => value,
    }
}

fn decode(value: &str) -> String {
    match percent_decode_str(value).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}
