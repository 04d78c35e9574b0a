//! Accept-Language parsing and quality-weighted selection.

use crate::language::tag::LanguageTag;

/// One entry of an Accept-Language header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedLanguage {
    pub tag: LanguageTag,
    pub quality: f32,
}

/// Parse an Accept-Language header.
///
/// Entries are returned sorted by descending quality; entries with equal
/// quality keep their header order. Malformed entries (bad tag, `*`, a q
/// value that is not a decimal in [0, 1]) are skipped rather than failing
/// the whole header.
pub fn parse_accept_language(header: &str) -> Vec<AcceptedLanguage> {
    let mut entries: Vec<AcceptedLanguage> = header
        .split(',')
        .filter_map(|part| {
            let mut params = part.split(';');
            let tag = LanguageTag::parse(params.next()?.trim())?;

            let mut quality = 1.0;
            for param in params {
                let Some((name, value)) = param.split_once('=') else {
                    continue;
                };
                if name.trim().eq_ignore_ascii_case("q") {
                    quality = parse_quality(value.trim())?;
                }
            }

            Some(AcceptedLanguage { tag, quality })
        })
        .collect();

    // `sort_by` is stable, which keeps header order for equal weights.
    entries.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    entries
}

fn parse_quality(value: &str) -> Option<f32> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let quality: f32 = value.parse().ok()?;
    (0.0..=1.0).contains(&quality).then_some(quality)
}

/// Pick the best supported language for an Accept-Language header.
///
/// Accepted entries are walked in quality order and, for each, the supported
/// tags in their declared order; the first compatible pair wins. Returns the
/// supported tag exactly as it was given.
pub fn pick_language<'a, S: AsRef<str>>(supported: &'a [S], accept_language: &str) -> Option<&'a str> {
    let supported: Vec<(&'a str, LanguageTag)> = supported
        .iter()
        .filter_map(|s| LanguageTag::parse(s.as_ref()).map(|tag| (s.as_ref(), tag)))
        .collect();

    select(&supported, &parse_accept_language(accept_language)).copied()
}

/// First supported entry compatible with the best accepted entry.
pub(crate) fn select<'s, S>(
    supported: &'s [(S, LanguageTag)],
    accepted: &[AcceptedLanguage],
) -> Option<&'s S> {
    accepted.iter().find_map(|accepted| {
        supported
            .iter()
            .find(|(_, tag)| accepted.tag.matches(tag))
            .map(|(raw, _)| raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORTED: [&str; 4] = ["en", "fr", "pt", "es"];

    fn codes(header: &str) -> Vec<String> {
        parse_accept_language(header)
            .into_iter()
            .map(|entry| entry.tag.to_string())
            .collect()
    }

    #[test]
    fn parses_and_sorts_by_quality() {
        let entries = parse_accept_language("en;q=0.5, fr-CA, zh-Hans-CN;q=0.8");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].tag.to_string(), "fr-CA");
        assert_eq!(entries[0].quality, 1.0);
        assert_eq!(entries[1].tag.script.as_deref(), Some("Hans"));
        assert_eq!(entries[1].quality, 0.8);
        assert_eq!(entries[2].tag.code, "en");
    }

    #[test]
    fn equal_quality_keeps_header_order() {
        assert_eq!(codes("pt;q=0.7,es;q=0.7,de;q=0.9"), vec!["de", "pt", "es"]);
    }

    #[test]
    fn skips_malformed_entries() {
        assert_eq!(codes("*;q=0.1,en;q=2,fr;q=abc,,es;q=0.3,pt"), vec!["pt", "es"]);
        assert!(parse_accept_language("").is_empty());
        assert!(parse_accept_language(";;;").is_empty());
    }

    #[test]
    fn region_mismatch_falls_back_to_unscoped_entry() {
        assert_eq!(pick_language(&SUPPORTED, "fr-CA,fr;q=0.9,en;q=0.8"), Some("fr"));
    }

    #[test]
    fn regional_preference_matches_unscoped_support() {
        assert_eq!(pick_language(&SUPPORTED, "pt-BR"), Some("pt"));
    }

    #[test]
    fn regional_support_rejects_other_region() {
        let supported = ["en-US", "fr-FR"];
        assert_eq!(pick_language(&supported, "en-GB,fr;q=0.5"), Some("fr-FR"));
        assert_eq!(pick_language(&supported, "en"), Some("en-US"));
    }

    #[test]
    fn quality_beats_header_position() {
        assert_eq!(pick_language(&SUPPORTED, "es;q=0.4,pt;q=0.6"), Some("pt"));
    }

    #[test]
    fn supported_order_breaks_ties() {
        let supported = ["pt-PT", "pt-BR"];
        assert_eq!(pick_language(&supported, "pt"), Some("pt-PT"));
    }

    #[test]
    fn case_insensitive_codes() {
        assert_eq!(pick_language(&SUPPORTED, "FR"), Some("fr"));
    }

    #[test]
    fn nothing_matches() {
        assert_eq!(pick_language(&SUPPORTED, "de,ja;q=0.5"), None);
        assert_eq!(pick_language(&SUPPORTED, "garbage!!"), None);
        let empty: [&str; 0] = [];
        assert_eq!(pick_language(&empty, "en"), None);
    }
}
