//! Language tags (`code[-script][-region]`).

use std::fmt;

/// A parsed language tag.
///
/// Segments keep the casing they were written with; comparisons are done
/// case-insensitively by [`LanguageTag::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageTag {
    pub code: String,
    pub script: Option<String>,
    pub region: Option<String>,
}

impl LanguageTag {
    /// Parse a tag. Three segments are code/script/region, two are
    /// code/region, one is just the code.
    ///
    /// Returns `None` for empty segments, a non-alphabetic code, non
    /// alphanumeric subtags or more than three segments.
    pub fn parse(tag: &str) -> Option<Self> {
        let segments: Vec<&str> = tag.split('-').collect();

        let valid_code = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic());
        let valid_subtag = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());

        if !valid_code(segments[0]) || !segments[1..].iter().all(|s| valid_subtag(*s)) {
            return None;
        }

        let owned = |s: &&str| s.to_string();
        let (script, region) = match segments.len() {
            1 => (None, None),
            2 => (None, segments.get(1).map(owned)),
            3 => (segments.get(1).map(owned), segments.get(2).map(owned)),
            _ => return None,
        };

        Some(Self {
            code: segments[0].to_string(),
            script,
            region,
        })
    }

    /// True when `other` is an acceptable substitute for `self`.
    ///
    /// Codes must be equal; script and region only have to agree when both
    /// sides specify them. All comparisons ignore ASCII case.
    pub fn matches(&self, other: &LanguageTag) -> bool {
        fn compatible(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => true,
            }
        }

        self.code.eq_ignore_ascii_case(&other.code)
            && compatible(&self.script, &other.script)
            && compatible(&self.region, &other.region)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)?;
        if let Some(script) = &self.script {
            write!(f, "-{}", script)?;
        }
        if let Some(region) = &self.region {
            write!(f, "-{}", region)?;
        }
        Ok(())
    }
}
