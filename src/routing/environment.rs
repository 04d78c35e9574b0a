//! Environment resolution from the inbound host.

use std::collections::HashMap;

use crate::routing::types::{Environment, EnvironmentMap};

/// Maps known hostnames to their deployment environment.
///
/// Matching is exact and case-sensitive. Unknown hosts resolve to `None`,
/// which is not an error: the request is still routed, just without host
/// rewriting or secret injection.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    hosts: HashMap<String, Environment>,
}

impl EnvironmentResolver {
    pub fn new(hosts: &EnvironmentMap<Vec<String>>) -> Self {
        let mut map = HashMap::new();
        for environment in [Environment::Production, Environment::Staging] {
            for host in hosts.get(environment) {
                // Validation rejects duplicates; keep the first claim regardless.
                map.entry(host.clone()).or_insert(environment);
            }
        }
        Self { hosts: map }
    }

    pub fn resolve(&self, host: &str) -> Option<Environment> {
        self.hosts.get(host).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;

    fn resolver() -> EnvironmentResolver {
        EnvironmentResolver::new(&RouterConfig::default_environments())
    }

    #[test]
    fn resolves_known_hosts() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("opencollective.com"),
            Some(Environment::Production)
        );
        assert_eq!(
            resolver.resolve("api.opencollective.com"),
            Some(Environment::Production)
        );
        assert_eq!(
            resolver.resolve("staging.opencollective.com"),
            Some(Environment::Staging)
        );
        assert_eq!(
            resolver.resolve("api-staging.opencollective.com"),
            Some(Environment::Staging)
        );
    }

    #[test]
    fn unknown_hosts_are_absent() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("localhost"), None);
        assert_eq!(resolver.resolve("www.opencollective.com"), None);
        assert_eq!(resolver.resolve("OpenCollective.com"), None);
        assert_eq!(resolver.resolve(""), None);
    }
}
