//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → environment.rs (host → production | staging | unknown)
//!     → classifier.rs + matcher.rs (path → backend, first match wins)
//!     → redirect.rs (static redirect? terminal)
//!     → language negotiation (localized backends only)
//!     → rewrite.rs + domains.rs (outbound URL, diagnostic headers)
//!     → Return: RouteDecision
//!
//! Engine Compilation (at startup and on reload):
//!     RouterConfig
//!     → Compile matchers (prefix lists, regexes, literal sets)
//!     → Parse domain targets
//!     → Freeze as immutable RoutingEngine
//! ```
//!
//! # Design Decisions
//! - Engine compiled from config, immutable at runtime
//! - Deterministic: same input always yields the same decision
//! - Rules evaluated in declaration order, never re-sorted
//! - Classification is total: a default backend always answers

pub mod classifier;
pub mod domains;
pub mod engine;
pub mod environment;
pub mod matcher;
pub mod redirect;
pub mod rewrite;
pub mod types;

pub use classifier::{Classifier, Rule};
pub use engine::{Forward, RouteDecision, RoutingEngine};
pub use rewrite::{RequestRewriter, RewriteError};
pub use types::{Backend, Environment};
