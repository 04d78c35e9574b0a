//! Per-environment domain rewrite table.

use url::Url;

use crate::config::validation::ValidationError;
use crate::config::ConfigError;
use crate::routing::types::{Backend, BackendMap, Environment, EnvironmentMap};

/// A physical target: a host and an optional explicit port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHost {
    pub host: String,
    pub port: Option<u16>,
}

impl TargetHost {
    /// Parse `host` or `host:port`.
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty() || value.contains('/') {
            return None;
        }
        let url = Url::parse(&format!("http://{}/", value)).ok()?;
        // `Url::port` hides default ports; keep the port exactly as written.
        let port = match value.rsplit_once(':') {
            Some((_, port)) if !value.ends_with(']') => Some(port.parse().ok()?),
            _ => None,
        };
        Some(Self {
            host: url.host_str()?.to_string(),
            port,
        })
    }

    /// Point `url` at this target. The scheme is left to the caller.
    pub fn apply(&self, url: &mut Url) -> Result<(), url::ParseError> {
        url.set_host(Some(&self.host))?;
        // `set_port` only fails for URLs that cannot carry a host, which
        // `set_host` already rejected.
        let _ = url.set_port(self.port);
        Ok(())
    }
}

impl std::fmt::Display for TargetHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

/// (environment, backend) → target host.
#[derive(Debug, Clone, Default)]
pub struct DomainTable {
    targets: EnvironmentMap<BackendMap<TargetHost>>,
}

impl DomainTable {
    pub fn from_config(domains: &EnvironmentMap<BackendMap<String>>) -> Result<Self, ConfigError> {
        let mut targets: EnvironmentMap<BackendMap<TargetHost>> = EnvironmentMap::default();
        let mut errors = Vec::new();

        for environment in [Environment::Production, Environment::Staging] {
            for (backend, value) in domains.get(environment).iter() {
                match TargetHost::parse(value) {
                    Some(target) => targets.get_mut(environment).set(backend, target),
                    None => errors.push(ValidationError::InvalidTargetHost {
                        environment,
                        backend: backend.to_string(),
                        value: value.clone(),
                    }),
                }
            }
        }

        if errors.is_empty() {
            Ok(Self { targets })
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Target for a backend in an environment. Absent means "leave the host alone".
    pub fn lookup(&self, environment: Environment, backend: Backend) -> Option<&TargetHost> {
        self.targets.get(environment).get(backend)
    }
}
