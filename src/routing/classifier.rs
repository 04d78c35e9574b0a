//! Backend classification.
//!
//! # Responsibilities
//! - Store compiled rules in declaration order
//! - Map a request path to exactly one backend
//! - Report which rule matched, for diagnostics
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over rules, first match wins
//! - Total: a default backend answers when no rule matches

use crate::config::schema::{MatcherConfig, RoutingConfig, RuleConfig};
use crate::config::ConfigError;
use crate::routing::matcher::{
    ExactMatcher, LiteralSetMatcher, Matcher, PathPrefixMatcher, PatternMatcher, SuffixMatcher,
};
use crate::routing::types::Backend;

/// A compiled classification rule.
#[derive(Debug)]
pub struct Rule {
    pub name: String,
    pub matcher: Box<dyn Matcher>,
    pub backend: Backend,
}

impl Rule {
    pub fn new(name: impl Into<String>, matcher: Box<dyn Matcher>, backend: Backend) -> Self {
        Self {
            name: name.into(),
            matcher,
            backend,
        }
    }

    /// Compile a rule from its configuration.
    pub fn compile(config: &RuleConfig) -> Result<Self, ConfigError> {
        let matcher: Box<dyn Matcher> = match &config.matcher {
            MatcherConfig::Exact { paths } => Box::new(ExactMatcher::new(paths.iter().cloned())),
            MatcherConfig::Prefix { prefixes } => {
                Box::new(PathPrefixMatcher::new(prefixes.iter().cloned()))
            }
            MatcherConfig::Suffix { suffixes } => {
                Box::new(SuffixMatcher::new(suffixes.iter().cloned()))
            }
            MatcherConfig::Pattern { pattern } => {
                let matcher = PatternMatcher::new(pattern).map_err(|source| ConfigError::Rule {
                    rule: config.name.clone(),
                    source,
                })?;
                Box::new(matcher)
            }
            MatcherConfig::Literal {
                paths,
                case_insensitive,
                subpaths,
            } => Box::new(LiteralSetMatcher::new(
                paths.iter().cloned(),
                *case_insensitive,
                *subpaths,
            )),
        };

        Ok(Self::new(config.name.clone(), matcher, config.backend))
    }
}

/// Ordered rule table with a default backend.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<Rule>,
    default: Backend,
}

impl Classifier {
    pub fn new(rules: Vec<Rule>, default: Backend) -> Self {
        Self { rules, default }
    }

    pub fn from_config(config: &RoutingConfig) -> Result<Self, ConfigError> {
        let rules = config
            .rules
            .iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            rules = rules.len(),
            default_backend = %config.default_backend,
            "Classifier compiled"
        );

        Ok(Self::new(rules, config.default_backend))
    }

    /// Backend for a path. The query string must already be removed.
    pub fn classify(&self, path: &str) -> Backend {
        self.matched_rule(path)
            .map(|rule| rule.backend)
            .unwrap_or(self.default)
    }

    /// The first rule matching `path`, if any.
    pub fn matched_rule(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matcher.matches(path))
    }

    pub fn default_backend(&self) -> Backend {
        self.default
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
