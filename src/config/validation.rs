//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value shapes (addresses, URLs, path prefixes, language tags)
//! - Detect hosts claimed by more than one environment
//! - Compile-check every routing rule
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{MatcherConfig, RouterConfig};
use crate::language::LanguageTag;
use crate::routing::domains::TargetHost;
use crate::routing::types::Environment;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid socket address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("unsupported upstream scheme: {0}")]
    InvalidScheme(String),

    #[error("host {host} is declared for more than one environment")]
    DuplicateHost { host: String },

    #[error("empty host in {environment} environment")]
    EmptyHost { environment: Environment },

    #[error("invalid target host for {environment}/{backend}: {value}")]
    InvalidTargetHost {
        environment: Environment,
        backend: String,
        value: String,
    },

    #[error("api path prefix must start and end with '/': {0}")]
    InvalidApiPrefix(String),

    #[error("query parameter name must not be empty: {field}")]
    EmptyParam { field: &'static str },

    #[error("invalid language tag in {field}: {tag}")]
    InvalidLanguage { field: &'static str, tag: String },

    #[error("redirect path must start with '/': {0}")]
    InvalidRedirectPath(String),

    #[error("redirect target for {path} is not an absolute URL: {location}")]
    InvalidRedirectLocation { path: String, location: String },

    #[error("duplicate redirect for {0}")]
    DuplicateRedirect(String),

    #[error("rule {rule}: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("invalid access log endpoint {0}")]
    InvalidEndpoint(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addresses(config, &mut errors);
    check_environments(config, &mut errors);
    check_api(config, &mut errors);
    check_languages(config, &mut errors);
    check_redirects(config, &mut errors);
    check_rules(config, &mut errors);
    check_access_log(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addresses(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.request_secs",
        });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.connect_secs",
        });
    }
    if !matches!(config.upstream.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::InvalidScheme(config.upstream.scheme.clone()));
    }
}

fn check_environments(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for environment in [Environment::Production, Environment::Staging] {
        for host in config.environments.get(environment) {
            if host.is_empty() {
                errors.push(ValidationError::EmptyHost { environment });
            } else if !seen.insert(host.as_str()) {
                errors.push(ValidationError::DuplicateHost { host: host.clone() });
            }
        }

        for (backend, target) in config.domains.get(environment).iter() {
            if TargetHost::parse(target).is_none() {
                errors.push(ValidationError::InvalidTargetHost {
                    environment,
                    backend: backend.to_string(),
                    value: target.clone(),
                });
            }
        }
    }
}

fn check_api(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    let prefix = &config.api.path_prefix;
    if prefix.len() < 2 || !prefix.starts_with('/') || !prefix.ends_with('/') {
        errors.push(ValidationError::InvalidApiPrefix(prefix.clone()));
    }
    if config.api.key_param.is_empty() {
        errors.push(ValidationError::EmptyParam {
            field: "api.key_param",
        });
    }
}

fn check_languages(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    let languages = &config.languages;
    if LanguageTag::parse(&languages.default).is_none() {
        errors.push(ValidationError::InvalidLanguage {
            field: "languages.default",
            tag: languages.default.clone(),
        });
    }
    for tag in &languages.detectable {
        if LanguageTag::parse(tag).is_none() {
            errors.push(ValidationError::InvalidLanguage {
                field: "languages.detectable",
                tag: tag.clone(),
            });
        }
    }
    for tag in &languages.available {
        if LanguageTag::parse(tag).is_none() {
            errors.push(ValidationError::InvalidLanguage {
                field: "languages.available",
                tag: tag.clone(),
            });
        }
    }
    if languages.cookie_name.is_empty() {
        errors.push(ValidationError::EmptyParam {
            field: "languages.cookie_name",
        });
    }
    if languages.query_param.is_empty() {
        errors.push(ValidationError::EmptyParam {
            field: "languages.query_param",
        });
    }
}

fn check_redirects(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for redirect in &config.redirects {
        if !redirect.path.starts_with('/') {
            errors.push(ValidationError::InvalidRedirectPath(redirect.path.clone()));
        }
        let absolute = Url::parse(&redirect.location)
            .map(|url| url.has_host())
            .unwrap_or(false);
        if !absolute {
            errors.push(ValidationError::InvalidRedirectLocation {
                path: redirect.path.clone(),
                location: redirect.location.clone(),
            });
        }
        if !seen.insert((redirect.path.as_str(), redirect.backend)) {
            errors.push(ValidationError::DuplicateRedirect(redirect.path.clone()));
        }
    }
}

fn check_rules(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    let mut names = HashSet::new();
    for rule in &config.routing.rules {
        if !names.insert(rule.name.as_str()) {
            errors.push(ValidationError::DuplicateRule(rule.name.clone()));
        }

        let invalid = |reason: &str| ValidationError::InvalidRule {
            rule: rule.name.clone(),
            reason: reason.to_string(),
        };

        match &rule.matcher {
            MatcherConfig::Exact { paths } | MatcherConfig::Literal { paths, .. } => {
                if paths.is_empty() {
                    errors.push(invalid("no paths"));
                } else if paths.iter().any(|p| !p.starts_with('/')) {
                    errors.push(invalid("paths must start with '/'"));
                }
            }
            MatcherConfig::Prefix { prefixes } => {
                if prefixes.is_empty() || prefixes.iter().any(|p| p.is_empty()) {
                    errors.push(invalid("empty prefix"));
                }
            }
            MatcherConfig::Suffix { suffixes } => {
                if suffixes.is_empty() || suffixes.iter().any(|s| s.is_empty()) {
                    errors.push(invalid("empty suffix"));
                }
            }
            MatcherConfig::Pattern { pattern } => {
                if let Err(e) = regex::Regex::new(pattern) {
                    errors.push(invalid(&e.to_string()));
                }
            }
        }
    }
}

fn check_access_log(config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    let log = &config.access_log;
    let endpoints = log
        .default_endpoint
        .iter()
        .chain(log.endpoints.iter().map(|(_, endpoint)| endpoint));
    for endpoint in endpoints {
        let valid = Url::parse(endpoint)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidEndpoint(endpoint.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RedirectConfig, RuleConfig};
    use crate::routing::domains::DomainTable;
    use crate::routing::types::Backend;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&RouterConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.api.path_prefix = "api".to_string();
        config.languages.detectable.push("not a tag".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::InvalidApiPrefix("api".to_string())));
    }

    #[test]
    fn rejects_host_shared_between_environments() {
        let mut config = RouterConfig::default();
        config
            .environments
            .staging
            .push("opencollective.com".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateHost {
                host: "opencollective.com".to_string()
            }]
        );
    }

    #[test]
    fn rejects_bad_rules() {
        let mut config = RouterConfig::default();
        config.routing.rules.push(RuleConfig {
            name: "broken".to_string(),
            backend: Backend::Images,
            matcher: MatcherConfig::Pattern {
                pattern: "(".to_string(),
            },
        });
        config.routing.rules.push(RuleConfig {
            name: "api".to_string(),
            backend: Backend::Api,
            matcher: MatcherConfig::Prefix { prefixes: vec![] },
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::DuplicateRule("api".to_string())));
    }

    #[test]
    fn rejects_relative_redirects() {
        let mut config = RouterConfig::default();
        config.redirects.push(RedirectConfig {
            path: "/docs".to_string(),
            location: "/help".to_string(),
            backend: None,
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::InvalidRedirectLocation { .. }
        ));
    }

    #[test]
    fn accepts_target_with_port() {
        let mut config = RouterConfig::default();
        config
            .domains
            .production
            .set(Backend::Frontend, "127.0.0.1:3000".to_string());
        assert_eq!(validate_config(&config), Ok(()));

        config
            .domains
            .production
            .set(Backend::Frontend, "http://127.0.0.1".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn target_validation_agrees_with_domain_table() {
        let mut config = RouterConfig::default();
        // An empty port parses as a URL authority but names no port.
        config
            .domains
            .staging
            .set(Backend::Api, "localhost:".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidTargetHost {
                environment: Environment::Staging,
                backend: "api".to_string(),
                value: "localhost:".to_string(),
            }]
        );
        assert!(DomainTable::from_config(&config.domains).is_err());
    }
}
