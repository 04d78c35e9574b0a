//! Request rewriting.
//!
//! # Responsibilities
//! - Point the URL at the physical host for (environment, backend)
//! - Strip the API prefix and inject the environment's API key
//! - Forward the negotiated language to localized backends
//! - Produce the diagnostic headers reported on the response
//!
//! # Design Decisions
//! - Fail-safe: any rewrite error forwards the original URL unchanged
//! - Setting a query parameter replaces the first occurrence and drops the rest
//! - Diagnostics are produced even when the URL rewrite fails

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::{ApiConfig, LanguageConfig};
use crate::config::ConfigError;
use crate::routing::domains::DomainTable;
use crate::routing::types::{Backend, BackendMap, Environment, EnvironmentMap};

pub const OC_BACKEND: HeaderName = HeaderName::from_static("oc-backend");
pub const OC_ENVIRONMENT: HeaderName = HeaderName::from_static("oc-environment");
pub const OC_LANGUAGE: HeaderName = HeaderName::from_static("oc-language");

/// Why a URL could not be rewritten.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("url cannot carry a host: {0}")]
    NotHierarchical(String),

    #[error("invalid target host: {0}")]
    Host(#[from] url::ParseError),
}

/// Result of rewriting one request.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub url: Url,
    pub diagnostics: HeaderMap,
}

/// Applies the domain table, API gateway rules and language forwarding.
#[derive(Debug, Clone)]
pub struct RequestRewriter {
    domains: DomainTable,
    api: ApiConfig,
    default_language: String,
    language_param: String,
    localized: Vec<Backend>,
}

impl RequestRewriter {
    pub fn new(domains: DomainTable, api: ApiConfig, languages: &LanguageConfig) -> Self {
        Self {
            domains,
            api,
            default_language: languages.default.clone(),
            language_param: languages.query_param.clone(),
            localized: languages.localized_backends.clone(),
        }
    }

    pub fn from_config(
        domains: &EnvironmentMap<BackendMap<String>>,
        api: &ApiConfig,
        languages: &LanguageConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(DomainTable::from_config(domains)?, api.clone(), languages))
    }

    /// Whether responses from `backend` are rendered per language.
    pub fn is_localized(&self, backend: Backend) -> bool {
        self.localized.contains(&backend)
    }

    /// Rewrite `url` for `backend`, never failing.
    ///
    /// On error the original URL is returned and a warning is logged.
    pub fn rewrite(
        &self,
        environment: Option<Environment>,
        backend: Backend,
        url: &Url,
        language: Option<&str>,
    ) -> Rewrite {
        let language = language.filter(|_| self.is_localized(backend));
        let diagnostics = diagnostics(environment, backend, language);

        let url = match self.try_rewrite(environment, backend, url, language) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    url = %url,
                    backend = %backend,
                    "Rewrite failed, forwarding original url"
                );
                url.clone()
            }
        };

        Rewrite { url, diagnostics }
    }

    /// Rewrite `url`, reporting the first failure.
    pub fn try_rewrite(
        &self,
        environment: Option<Environment>,
        backend: Backend,
        url: &Url,
        language: Option<&str>,
    ) -> Result<Url, RewriteError> {
        if url.cannot_be_a_base() {
            return Err(RewriteError::NotHierarchical(url.to_string()));
        }
        let mut url = url.clone();

        if let Some(environment) = environment {
            if let Some(target) = self.domains.lookup(environment, backend) {
                target.apply(&mut url)?;
            }

            if backend == Backend::Api {
                self.rewrite_api(environment, &mut url);
            }
        }

        if let Some(language) = language {
            if language != self.default_language && !has_value(&url, &self.language_param) {
                set_query_param(&mut url, &self.language_param, language);
            }
        }

        Ok(url)
    }

    fn rewrite_api(&self, environment: Environment, url: &mut Url) {
        let Some(rest) = url.path().strip_prefix(self.api.path_prefix.as_str()) else {
            return;
        };
        let path = format!("/{}", rest);
        url.set_path(&path);

        match self.api.key_for(environment) {
            Some(key) => set_query_param(url, &self.api.key_param, key),
            None => tracing::warn!(
                environment = %environment,
                "No API key configured, forwarding without one"
            ),
        }
    }
}

fn diagnostics(
    environment: Option<Environment>,
    backend: Backend,
    language: Option<&str>,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(OC_BACKEND, HeaderValue::from_static(backend.as_str()));
    if let Some(environment) = environment {
        headers.insert(OC_ENVIRONMENT, HeaderValue::from_static(environment.as_str()));
    }
    if let Some(value) = language.and_then(|tag| HeaderValue::from_str(tag).ok()) {
        headers.insert(OC_LANGUAGE, value);
    }
    headers
}

/// True when the query carries `name` with a non-empty value.
pub fn has_value(url: &Url, name: &str) -> bool {
    url.query_pairs().any(|(k, v)| k == name && !v.is_empty())
}

/// Set a query parameter: the first occurrence is replaced, later ones are
/// removed, and the pair is appended when absent.
pub fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k != name {
                return Some((k.into_owned(), v.into_owned()));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((k.into_owned(), value.to_string()))
        })
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear();
    for (k, v) in &pairs {
        query.append_pair(k, v);
    }
    if !replaced {
        query.append_pair(name, value);
    }
}
