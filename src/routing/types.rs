//! Core routing vocabulary: backends, environments and per-backend tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A downstream service that can own a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Frontend,
    Api,
    Images,
    Invoices,
    Rest,
    Website,
}

impl Backend {
    pub const ALL: [Backend; 6] = [
        Backend::Frontend,
        Backend::Api,
        Backend::Images,
        Backend::Invoices,
        Backend::Rest,
        Backend::Website,
    ];

    /// Label used in the `oc-backend` header and in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Frontend => "frontend",
            Backend::Api => "api",
            Backend::Images => "images",
            Backend::Invoices => "invoices",
            Backend::Rest => "rest",
            Backend::Website => "website",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment tier inferred from the inbound host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One optional value per backend.
///
/// Used for the per-environment domain table and for access-log destinations.
/// A missing entry is meaningful ("no override"), never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendMap<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoices: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<T>,
}

impl<T> Default for BackendMap<T> {
    fn default() -> Self {
        Self {
            frontend: None,
            api: None,
            images: None,
            invoices: None,
            rest: None,
            website: None,
        }
    }
}

impl<T> BackendMap<T> {
    pub fn get(&self, backend: Backend) -> Option<&T> {
        match backend {
            Backend::Frontend => self.frontend.as_ref(),
            Backend::Api => self.api.as_ref(),
            Backend::Images => self.images.as_ref(),
            Backend::Invoices => self.invoices.as_ref(),
            Backend::Rest => self.rest.as_ref(),
            Backend::Website => self.website.as_ref(),
        }
    }

    pub fn set(&mut self, backend: Backend, value: T) {
        let slot = match backend {
            Backend::Frontend => &mut self.frontend,
            Backend::Api => &mut self.api,
            Backend::Images => &mut self.images,
            Backend::Invoices => &mut self.invoices,
            Backend::Rest => &mut self.rest,
            Backend::Website => &mut self.website,
        };
        *slot = Some(value);
    }

    /// Iterate over the entries that are present.
    pub fn iter(&self) -> impl Iterator<Item = (Backend, &T)> {
        Backend::ALL
            .into_iter()
            .filter_map(move |backend| self.get(backend).map(|v| (backend, v)))
    }
}

/// One value per environment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct EnvironmentMap<T> {
    pub production: T,
    pub staging: T,
}

impl<T> EnvironmentMap<T> {
    pub fn get(&self, environment: Environment) -> &T {
        match environment {
            Environment::Production => &self.production,
            Environment::Staging => &self.staging,
        }
    }

    pub fn get_mut(&mut self, environment: Environment) -> &mut T {
        match environment {
            Environment::Production => &mut self.production,
            Environment::Staging => &mut self.staging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_labels() {
        assert_eq!(Backend::Frontend.to_string(), "frontend");
        assert_eq!(Backend::Invoices.as_str(), "invoices");
        assert_eq!(Environment::Staging.to_string(), "staging");
    }

    #[test]
    fn backend_map_lookup() {
        let mut map = BackendMap::default();
        map.set(Backend::Api, "api.example.com".to_string());

        assert_eq!(map.get(Backend::Api).map(String::as_str), Some("api.example.com"));
        assert!(map.get(Backend::Frontend).is_none());
        assert_eq!(map.iter().count(), 1);
    }

    #[test]
    fn backend_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: Backend,
        }
        let w: Wrapper = toml::from_str(r#"backend = "images""#).unwrap();
        assert_eq!(w.backend, Backend::Images);
    }
}
