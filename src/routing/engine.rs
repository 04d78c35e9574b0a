//! The compiled routing engine.
//!
//! Composes environment resolution, classification, static redirects,
//! language negotiation and rewriting into one pure decision per request.
//! No network I/O happens here; the HTTP layer acts on the decision.

use axum::http::{header, HeaderMap};
use url::Url;

use crate::config::{ConfigError, RouterConfig};
use crate::language::{LanguageNegotiator, NegotiatedLanguage};
use crate::routing::classifier::Classifier;
use crate::routing::environment::EnvironmentResolver;
use crate::routing::redirect::RedirectTable;
use crate::routing::rewrite::RequestRewriter;
use crate::routing::types::{Backend, Environment};

/// What to do with a request.
#[derive(Debug, Clone)]
pub enum RouteDecision {
    /// Answer with a 301 to `location` without contacting any backend.
    Redirect {
        backend: Backend,
        location: String,
    },
    /// Forward to a backend.
    Forward(Forward),
}

/// A request bound for a backend.
#[derive(Debug, Clone)]
pub struct Forward {
    pub environment: Option<Environment>,
    pub backend: Backend,
    /// Name of the rule that matched, `None` for the default backend.
    pub rule: Option<String>,
    pub language: Option<NegotiatedLanguage>,
    /// Rewritten outbound URL.
    pub url: Url,
    /// Headers overlaid onto the backend response.
    pub diagnostics: HeaderMap,
}

/// Immutable routing state compiled from a [`RouterConfig`].
#[derive(Debug)]
pub struct RoutingEngine {
    environments: EnvironmentResolver,
    classifier: Classifier,
    redirects: RedirectTable,
    negotiator: LanguageNegotiator,
    rewriter: RequestRewriter,
}

impl RoutingEngine {
    pub fn new(
        environments: EnvironmentResolver,
        classifier: Classifier,
        redirects: RedirectTable,
        negotiator: LanguageNegotiator,
        rewriter: RequestRewriter,
    ) -> Self {
        Self {
            environments,
            classifier,
            redirects,
            negotiator,
            rewriter,
        }
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            EnvironmentResolver::new(&config.environments),
            Classifier::from_config(&config.routing)?,
            RedirectTable::new(&config.redirects),
            LanguageNegotiator::from_config(&config.languages)?,
            RequestRewriter::from_config(&config.domains, &config.api, &config.languages)?,
        ))
    }

    /// Decide how to handle a request for `url` carrying `headers`.
    ///
    /// `url` is the inbound URL as seen by the router, with the upstream
    /// scheme already applied.
    pub fn route(&self, url: &Url, headers: &HeaderMap) -> RouteDecision {
        let environment = url.host_str().and_then(|host| self.environments.resolve(host));

        let path = url.path();
        let rule = self.classifier.matched_rule(path);
        let backend = rule
            .map(|rule| rule.backend)
            .unwrap_or_else(|| self.classifier.default_backend());

        if let Some(location) = self.redirects.lookup(path, backend) {
            return RouteDecision::Redirect {
                backend,
                location: location.to_string(),
            };
        }

        let language = if self.rewriter.is_localized(backend) {
            self.negotiator.negotiate(
                header_str(headers, header::COOKIE),
                header_str(headers, header::ACCEPT_LANGUAGE),
            )
        } else {
            None
        };

        let rewrite = self.rewriter.rewrite(
            environment,
            backend,
            url,
            language.as_ref().map(|l| l.tag.as_str()),
        );

        RouteDecision::Forward(Forward {
            environment,
            backend,
            rule: rule.map(|rule| rule.name.clone()),
            language,
            url: rewrite.url,
            diagnostics: rewrite.diagnostics,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageSource;
    use crate::routing::rewrite::{OC_BACKEND, OC_ENVIRONMENT, OC_LANGUAGE};
    use axum::http::HeaderValue;

    fn engine() -> RoutingEngine {
        let mut config = RouterConfig::default();
        config.api.keys.production = Some("secret".to_string());
        RoutingEngine::from_config(&config).unwrap()
    }

    fn forward(decision: RouteDecision) -> Forward {
        match decision {
            RouteDecision::Forward(forward) => forward,
            other => panic!("expected forward, got {:?}", other),
        }
    }

    #[test]
    fn api_request_in_production() {
        let decision = engine().route(
            &Url::parse("https://opencollective.com/api/graphql?foo=bar").unwrap(),
            &HeaderMap::new(),
        );
        let forward = forward(decision);
        assert_eq!(forward.backend, Backend::Api);
        assert_eq!(forward.rule.as_deref(), Some("api"));
        assert_eq!(
            forward.url.as_str(),
            "https://api.opencollective.com/graphql?foo=bar&api_key=secret"
        );
        assert_eq!(forward.diagnostics[OC_ENVIRONMENT], "production");
    }

    #[test]
    fn frontend_request_negotiates_language() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-CA,fr;q=0.9,en;q=0.8"),
        );
        let forward = forward(engine().route(
            &Url::parse("https://staging.opencollective.com/webpack").unwrap(),
            &headers,
        ));

        assert_eq!(forward.backend, Backend::Frontend);
        assert_eq!(forward.rule, None);
        assert_eq!(
            forward.url.as_str(),
            "https://frontend-staging.opencollective.com/webpack?language=fr"
        );
        assert_eq!(forward.diagnostics[OC_LANGUAGE], "fr");
        assert_eq!(forward.language.map(|l| l.source), Some(LanguageSource::Header));
    }

    #[test]
    fn cookie_overrides_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("fr"));
        headers.insert(header::COOKIE, HeaderValue::from_static("a=b; language=ja"));
        let forward = forward(engine().route(
            &Url::parse("https://opencollective.com/").unwrap(),
            &headers,
        ));
        assert_eq!(forward.diagnostics[OC_LANGUAGE], "ja");
        assert_eq!(forward.url.query(), Some("language=ja"));
    }

    #[test]
    fn non_localized_backend_skips_negotiation() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("fr"));
        let forward = forward(engine().route(
            &Url::parse("https://opencollective.com/webpack/badge.svg").unwrap(),
            &headers,
        ));
        assert_eq!(forward.backend, Backend::Images);
        assert!(forward.language.is_none());
        assert!(forward.diagnostics.get(OC_LANGUAGE).is_none());
        assert_eq!(forward.diagnostics[OC_BACKEND], "images");
    }

    #[test]
    fn redirects_short_circuit() {
        match engine().route(
            &Url::parse("https://opencollective.com/opensourcecollective").unwrap(),
            &HeaderMap::new(),
        ) {
            RouteDecision::Redirect { backend, location } => {
                assert_eq!(backend, Backend::Frontend);
                assert_eq!(location, "https://opencollective.com/opensource");
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn unknown_host_is_forwarded_untouched() {
        let url = Url::parse("http://localhost:8080/api/graphql").unwrap();
        let forward = forward(engine().route(&url, &HeaderMap::new()));
        assert_eq!(forward.url, url);
        assert!(forward.environment.is_none());
        assert!(forward.diagnostics.get(OC_ENVIRONMENT).is_none());
    }
}
