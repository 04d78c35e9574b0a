//! Language negotiation: cookie override first, then Accept-Language.

use crate::config::schema::LanguageConfig;
use crate::config::ConfigError;
use crate::language::accept::{parse_accept_language, select};
use crate::language::cookie::CookieJar;
use crate::language::tag::LanguageTag;

/// Where a negotiated language came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSource {
    Cookie,
    Header,
}

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedLanguage {
    pub tag: String,
    pub source: LanguageSource,
}

/// Compiled language negotiation settings.
#[derive(Debug, Clone)]
pub struct LanguageNegotiator {
    detectable: Vec<(String, LanguageTag)>,
    available: Vec<String>,
    cookie_name: String,
}

impl LanguageNegotiator {
    /// Build a negotiator.
    ///
    /// `detectable` is matched against Accept-Language, in tie-break order.
    /// `available` lists the tags a cookie may select.
    pub fn new(
        detectable: &[String],
        available: &[String],
        cookie_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let detectable = detectable
            .iter()
            .map(|raw| {
                LanguageTag::parse(raw)
                    .map(|tag| (raw.clone(), tag))
                    .ok_or_else(|| ConfigError::Language(raw.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            detectable,
            available: available.to_vec(),
            cookie_name: cookie_name.into(),
        })
    }

    pub fn from_config(config: &LanguageConfig) -> Result<Self, ConfigError> {
        Self::new(&config.detectable, &config.available, config.cookie_name.clone())
    }

    /// Negotiate from raw `Cookie` and `Accept-Language` header values.
    ///
    /// Never fails: malformed input just yields no preference.
    pub fn negotiate(
        &self,
        cookie_header: Option<&str>,
        accept_language: Option<&str>,
    ) -> Option<NegotiatedLanguage> {
        let cookie = cookie_header.map(CookieJar::parse);
        let cookie_value = cookie.as_ref().and_then(|jar| jar.get(&self.cookie_name));

        if let Some(tag) = self.from_cookie(cookie_value) {
            return Some(NegotiatedLanguage {
                tag: tag.to_string(),
                source: LanguageSource::Cookie,
            });
        }

        self.from_header(accept_language?).map(|tag| NegotiatedLanguage {
            tag: tag.to_string(),
            source: LanguageSource::Header,
        })
    }

    /// Exact, case-sensitive membership in the available set.
    pub fn from_cookie(&self, value: Option<&str>) -> Option<&str> {
        let value = value?;
        self.available
            .iter()
            .find(|tag| tag.as_str() == value)
            .map(String::as_str)
    }

    pub fn from_header(&self, accept_language: &str) -> Option<&str> {
        select(&self.detectable, &parse_accept_language(accept_language)).map(String::as_str)
    }
}

/// Negotiate a language from a supported set, a header value and an
/// optional cookie value. The cookie must name a supported tag exactly.
pub fn negotiate_language<'a, S: AsRef<str>>(
    supported: &'a [S],
    accept_language: Option<&str>,
    cookie: Option<&str>,
) -> Option<&'a str> {
    if let Some(cookie) = cookie {
        if let Some(tag) = supported.iter().find(|s| s.as_ref() == cookie) {
            return Some(tag.as_ref());
        }
    }
    crate::language::accept::pick_language(supported, accept_language?)
}
