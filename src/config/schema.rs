//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files, and
//! every section defaults to the canonical deployment so that an empty file
//! is a working configuration.

use serde::{Deserialize, Serialize};

use crate::routing::types::{Backend, BackendMap, Environment, EnvironmentMap};

/// Root configuration for the edge router.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// How forwarded requests reach the backends.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Known hostnames per environment.
    pub environments: EnvironmentMap<Vec<String>>,

    /// Target host per (environment, backend). Declaring any `[domains.*]`
    /// table replaces the built-in table as a whole.
    pub domains: EnvironmentMap<BackendMap<String>>,

    /// API gateway rewriting.
    pub api: ApiConfig,

    /// Language negotiation.
    pub languages: LanguageConfig,

    /// Static redirects, checked before any rewriting.
    pub redirects: Vec<RedirectConfig>,

    /// Ordered classification rules.
    pub routing: RoutingConfig,

    /// Asynchronous access-log shipping.
    pub access_log: AccessLogConfig,
}

impl RouterConfig {
    /// Canonical environment host lists.
    pub fn default_environments() -> EnvironmentMap<Vec<String>> {
        EnvironmentMap {
            production: vec![
                "opencollective.com".to_string(),
                "api.opencollective.com".to_string(),
            ],
            staging: vec![
                "staging.opencollective.com".to_string(),
                "api-staging.opencollective.com".to_string(),
            ],
        }
    }

    /// Canonical domain table.
    pub fn default_domains() -> EnvironmentMap<BackendMap<String>> {
        let table = |suffix: &str| {
            let mut hosts = BackendMap::default();
            for backend in [
                Backend::Frontend,
                Backend::Api,
                Backend::Images,
                Backend::Invoices,
                Backend::Rest,
            ] {
                hosts.set(backend, format!("{}{}.opencollective.com", backend, suffix));
            }
            hosts
        };
        EnvironmentMap {
            production: table(""),
            staging: table("-staging"),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            upstream: UpstreamConfig::default(),
            observability: ObservabilityConfig::default(),
            environments: Self::default_environments(),
            domains: Self::default_domains(),
            api: ApiConfig::default(),
            languages: LanguageConfig::default(),
            redirects: RedirectConfig::defaults(),
            routing: RoutingConfig::default(),
            access_log: AccessLogConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream request timeout in seconds.
    pub request_secs: u64,

    /// Access-log POST timeout in seconds.
    pub access_log_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            access_log_secs: 5,
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme used for forwarded requests. TLS is terminated before the
    /// router, so the inbound scheme is not known.
    pub scheme: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// API gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Path prefix stripped from requests routed to the `api` backend.
    pub path_prefix: String,

    /// Query parameter carrying the API key.
    pub key_param: String,

    /// API key per environment. Usually provided through
    /// `EDGE_ROUTER_PRODUCTION_API_KEY` / `EDGE_ROUTER_STAGING_API_KEY`.
    pub keys: EnvironmentMap<Option<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/api/".to_string(),
            key_param: "api_key".to_string(),
            keys: EnvironmentMap::default(),
        }
    }
}

impl ApiConfig {
    pub fn key_for(&self, environment: Environment) -> Option<&str> {
        self.keys
            .get(environment)
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

/// Language negotiation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Language the backends render when none is requested.
    pub default: String,

    /// Languages offered through Accept-Language negotiation, in tie-break order.
    pub detectable: Vec<String>,

    /// Languages a user may pin with the language cookie.
    pub available: Vec<String>,

    /// Cookie holding an explicit language choice.
    pub cookie_name: String,

    /// Query parameter forwarded to localized backends.
    pub query_param: String,

    /// Backends that serve localized content.
    pub localized_backends: Vec<Backend>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        let tags = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            default: "en".to_string(),
            detectable: tags(&["en", "fr", "pt", "es"]),
            available: tags(&[
                "en", "ca", "zh", "cs", "nl", "fr", "de", "it", "ja", "ko", "pt", "ru", "es",
            ]),
            cookie_name: "language".to_string(),
            query_param: "language".to_string(),
            localized_backends: vec![Backend::Frontend],
        }
    }
}

/// A static redirect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RedirectConfig {
    /// Exact request path.
    pub path: String,

    /// Absolute target URL.
    pub location: String,

    /// Only redirect when the path classified to this backend.
    #[serde(default)]
    pub backend: Option<Backend>,
}

impl RedirectConfig {
    pub fn defaults() -> Vec<RedirectConfig> {
        vec![
            RedirectConfig {
                path: "/about".to_string(),
                location: "https://docs.opencollective.com/help/about".to_string(),
                backend: Some(Backend::Frontend),
            },
            RedirectConfig {
                path: "/opensourcecollective".to_string(),
                location: "https://opencollective.com/opensource".to_string(),
                backend: Some(Backend::Frontend),
            },
        ]
    }
}

/// Classification rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Backend used when no rule matches.
    pub default_backend: Backend,

    /// Rules, evaluated top to bottom. First match wins.
    pub rules: Vec<RuleConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_backend: Backend::Frontend,
            rules: RuleConfig::defaults(),
        }
    }
}

/// One classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Rule identifier for logging and diagnostics.
    pub name: String,

    /// Backend selected when the matcher succeeds.
    pub backend: Backend,

    #[serde(flatten)]
    pub matcher: MatcherConfig,
}

/// Matcher definition, tagged by `match = "..."`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "match", rename_all = "lowercase")]
pub enum MatcherConfig {
    Exact {
        paths: Vec<String>,
    },
    Prefix {
        prefixes: Vec<String>,
    },
    Suffix {
        suffixes: Vec<String>,
    },
    Pattern {
        pattern: String,
    },
    Literal {
        paths: Vec<String>,
        #[serde(default)]
        case_insensitive: bool,
        #[serde(default)]
        subpaths: bool,
    },
}

impl RuleConfig {
    fn new(name: &str, backend: Backend, matcher: MatcherConfig) -> Self {
        Self {
            name: name.to_string(),
            backend,
            matcher,
        }
    }

    /// The canonical rule table.
    pub fn defaults() -> Vec<RuleConfig> {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let prefix = |items: &[&str]| MatcherConfig::Prefix { prefixes: list(items) };
        let suffix = |items: &[&str]| MatcherConfig::Suffix { suffixes: list(items) };
        let pattern = |p: &str| MatcherConfig::Pattern { pattern: p.to_string() };

        vec![
            RuleConfig::new("rest-v1", Backend::Rest, prefix(&["/api/v1/", "/v1/"])),
            RuleConfig::new("api", Backend::Api, prefix(&["/api/"])),
            RuleConfig::new(
                "help-pages",
                Backend::Frontend,
                MatcherConfig::Literal {
                    paths: list(&["/faq"]),
                    case_insensitive: true,
                    subpaths: true,
                },
            ),
            RuleConfig::new(
                "static-pages",
                Backend::Frontend,
                MatcherConfig::Literal {
                    paths: list(&["/about", "/discover", "/tos", "/privacypolicy"]),
                    case_insensitive: true,
                    subpaths: false,
                },
            ),
            RuleConfig::new("invoices", Backend::Invoices, suffix(&["invoice.pdf", "invoice.html"])),
            RuleConfig::new("manifest", Backend::Frontend, suffix(&["manifest.json"])),
            RuleConfig::new("rest-export", Backend::Rest, suffix(&[".json", ".csv"])),
            RuleConfig::new("public", Backend::Frontend, prefix(&["/public/"])),
            RuleConfig::new("static-images", Backend::Frontend, prefix(&["/static/images/"])),
            RuleConfig::new("logo", Backend::Images, pattern(r"^/[^/]*/logo\.(jpg|png|svg|txt)")),
            RuleConfig::new("badge", Backend::Images, pattern(r"/badge\.(png|svg)$")),
            RuleConfig::new("avatar", Backend::Images, pattern(r"/avatar(\.(png|svg|jpg))?$")),
            RuleConfig::new("website", Backend::Images, suffix(&["/website"])),
            RuleConfig::new(
                "tiers",
                Backend::Images,
                pattern(r"^/[^/]*/(backers?|sponsors?|organizations?|individuals?|tiers/[^/]*)\.(png|svg)$"),
            ),
            RuleConfig::new("contributors", Backend::Images, suffix(&["/contributors.svg"])),
        ]
    }
}

/// Access-log shipping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Enable access-log shipping.
    pub enabled: bool,

    /// Destination used when the backend has no dedicated endpoint.
    pub default_endpoint: Option<String>,

    /// Per-backend destinations.
    pub endpoints: BackendMap<String>,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_endpoint: None,
            endpoints: BackendMap::default(),
        }
    }
}

impl AccessLogConfig {
    /// Destination for a backend, falling back to the default endpoint.
    pub fn endpoint_for(&self, backend: Backend) -> Option<&str> {
        self.endpoints
            .get(backend)
            .or(self.default_endpoint.as_ref())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_canonical_config() {
        let config: RouterConfig = toml::from_str("").unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.routing.default_backend, Backend::Frontend);
        assert_eq!(config.routing.rules.len(), 15);
        assert_eq!(config.redirects.len(), 2);
        assert_eq!(
            config.domains.staging.get(Backend::Images).map(String::as_str),
            Some("images-staging.opencollective.com")
        );
        assert!(config.domains.production.get(Backend::Website).is_none());
        assert!(config
            .environments
            .production
            .contains(&"api.opencollective.com".to_string()));
    }

    #[test]
    fn rules_parse_from_toml() {
        let config: RouterConfig = toml::from_str(
            r#"
            [routing]
            default_backend = "website"

            [[routing.rules]]
            name = "docs"
            backend = "frontend"
            match = "prefix"
            prefixes = ["/docs/"]

            [[routing.rules]]
            name = "pages"
            backend = "website"
            match = "literal"
            paths = ["/faq"]
            case_insensitive = true
            "#,
        )
        .unwrap();

        assert_eq!(config.routing.default_backend, Backend::Website);
        assert_eq!(config.routing.rules.len(), 2);
        assert_eq!(
            config.routing.rules[1].matcher,
            MatcherConfig::Literal {
                paths: vec!["/faq".to_string()],
                case_insensitive: true,
                subpaths: false,
            }
        );
    }

    #[test]
    fn domain_section_replaces_the_table() {
        let config: RouterConfig = toml::from_str(
            r#"
            [domains.production]
            frontend = "127.0.0.1:3000"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.domains.production.get(Backend::Frontend).map(String::as_str),
            Some("127.0.0.1:3000")
        );
        assert!(config.domains.production.get(Backend::Api).is_none());
        assert!(config.domains.staging.get(Backend::Api).is_none());
        // Other sections keep their defaults.
        assert_eq!(config.environments.staging.len(), 2);
    }

    #[test]
    fn access_log_endpoint_fallback() {
        let mut config = AccessLogConfig {
            default_endpoint: Some("http://logs.internal/default".to_string()),
            ..Default::default()
        };
        config
            .endpoints
            .set(Backend::Api, "http://logs.internal/api".to_string());

        assert_eq!(config.endpoint_for(Backend::Api), Some("http://logs.internal/api"));
        assert_eq!(
            config.endpoint_for(Backend::Images),
            Some("http://logs.internal/default")
        );
    }

    #[test]
    fn api_key_lookup_ignores_empty_values() {
        let mut api = ApiConfig::default();
        api.keys.production = Some(String::new());
        api.keys.staging = Some("staging-key".to_string());

        assert_eq!(api.key_for(Environment::Production), None);
        assert_eq!(api.key_for(Environment::Staging), Some("staging-key"));
    }
}
