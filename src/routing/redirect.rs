//! Static redirects.

use crate::config::schema::RedirectConfig;
use crate::routing::types::Backend;

#[derive(Debug, Clone)]
struct Redirect {
    path: String,
    location: String,
    backend: Option<Backend>,
}

/// Exact-path redirects, optionally restricted to one backend.
#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    redirects: Vec<Redirect>,
}

impl RedirectTable {
    pub fn new(redirects: &[RedirectConfig]) -> Self {
        Self {
            redirects: redirects
                .iter()
                .map(|r| Redirect {
                    path: r.path.clone(),
                    location: r.location.clone(),
                    backend: r.backend,
                })
                .collect(),
        }
    }

    /// Absolute target for a request path that classified to `backend`.
    pub fn lookup(&self, path: &str, backend: Backend) -> Option<&str> {
        self.redirects
            .iter()
            .find(|r| r.path == path && r.backend.map_or(true, |b| b == backend))
            .map(|r| r.location.as_str())
    }

    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }
}
