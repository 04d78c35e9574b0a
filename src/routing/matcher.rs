//! Path matching logic.
//!
//! # Responsibilities
//! - Match the raw request path (never the query string)
//! - Exact, prefix, suffix, regex and literal-set conditions
//!
//! # Design Decisions
//! - Path matching is case-sensitive unless a matcher says otherwise
//! - No normalization: trailing slashes and case are significant
//! - Regex matchers only answer match/no-match, captures are discarded

use regex::Regex;

/// Trait for matching a request path against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches when the path equals one of the given paths.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    paths: Vec<String>,
}

impl ExactMatcher {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for ExactMatcher {
    fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefixes: Vec<String>,
}

impl PathPrefixMatcher {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Matches the end of the path, e.g. an extension or a trailing file name.
#[derive(Debug, Clone)]
pub struct SuffixMatcher {
    suffixes: Vec<String>,
}

impl SuffixMatcher {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for SuffixMatcher {
    fn matches(&self, path: &str) -> bool {
        self.suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }
}

/// Regex search against the path. Anchors are up to the pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl Matcher for PatternMatcher {
    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// A fixed set of literal pages such as `/faq` or `/tos`.
///
/// Optionally case-insensitive, and optionally matching anything below the
/// literal (`/faq/getting-started`). `/faqs` never matches `/faq`.
#[derive(Debug, Clone)]
pub struct LiteralSetMatcher {
    paths: Vec<String>,
    case_insensitive: bool,
    subpaths: bool,
}

impl LiteralSetMatcher {
    pub fn new<I, S>(paths: I, case_insensitive: bool, subpaths: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            case_insensitive,
            subpaths,
        }
    }

    fn matches_one(&self, literal: &str, path: &str) -> bool {
        let eq = |a: &str, b: &str| {
            if self.case_insensitive {
                a.eq_ignore_ascii_case(b)
            } else {
                a == b
            }
        };

        if eq(literal, path) {
            return true;
        }
        if !self.subpaths || path.len() <= literal.len() {
            return false;
        }
        // `get` keeps us on a char boundary for non-ASCII paths.
        match (path.get(..literal.len()), path.get(literal.len()..)) {
            (Some(head), Some(rest)) => eq(head, literal) && rest.starts_with('/'),
            _ => false,
        }
    }
}

impl Matcher for LiteralSetMatcher {
    fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|literal| self.matches_one(literal, path))
    }
}
