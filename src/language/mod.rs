//! Language negotiation subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header
//!     → cookie.rs (parse jar, read the language cookie)
//!     → exact membership in the available set
//!
//! Accept-Language header (when the cookie gives nothing)
//!     → accept.rs (parse entries, sort by quality)
//!     → tag.rs (compatibility check against detectable tags)
//!
//! → negotiator.rs returns the chosen tag, or none
//! ```
//!
//! # Design Decisions
//! - Negotiation never fails; malformed input means "no preference"
//! - The cookie set and the header set are configured separately

pub mod accept;
pub mod cookie;
pub mod negotiator;
pub mod tag;

pub use accept::{parse_accept_language, pick_language, AcceptedLanguage};
pub use cookie::CookieJar;
pub use negotiator::{negotiate_language, LanguageNegotiator, LanguageSource, NegotiatedLanguage};
pub use tag::LanguageTag;
