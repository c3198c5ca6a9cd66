use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Languages the engine can detect in release titles and filter on.
///
/// `Multi` marks multi-audio releases and `Unspecified` ("no" on the wire)
/// marks releases with no detectable language and no request default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Language {
    #[cfg_attr(feature = "serde", serde(rename = "en"))]
    En,
    #[cfg_attr(feature = "serde", serde(rename = "fr"))]
    Fr,
    #[cfg_attr(feature = "serde", serde(rename = "es"))]
    Es,
    #[cfg_attr(feature = "serde", serde(rename = "de"))]
    De,
    #[cfg_attr(feature = "serde", serde(rename = "it"))]
    It,
    #[cfg_attr(feature = "serde", serde(rename = "pt"))]
    Pt,
    #[cfg_attr(feature = "serde", serde(rename = "ru"))]
    Ru,
    #[cfg_attr(feature = "serde", serde(rename = "in"))]
    In,
    #[cfg_attr(feature = "serde", serde(rename = "nl"))]
    Nl,
    #[cfg_attr(feature = "serde", serde(rename = "multi"))]
    Multi,
    #[cfg_attr(feature = "serde", serde(rename = "no"))]
    Unspecified,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Ru => "ru",
            Language::In => "in",
            Language::Nl => "nl",
            Language::Multi => "multi",
            Language::Unspecified => "no",
        }
    }

    /// Parse a language tag such as `en`, `en-US` or `fr_FR`.
    ///
    /// Only the primary subtag is considered.
    pub fn from_tag(tag: &str) -> Result<Self, ModelError> {
        primary_subtag(tag).parse()
    }

    /// Flag glyph shown next to results in the player.
    pub fn flag(&self) -> &'static str {
        match self {
            Language::Fr => "🇫🇷",
            Language::En => "🇬🇧",
            Language::Es => "🇪🇸",
            Language::De => "🇩🇪",
            Language::It => "🇮🇹",
            Language::Pt => "🇵🇹",
            Language::Ru => "🇷🇺",
            Language::In => "🇮🇳",
            Language::Nl => "🇳🇱",
            Language::Multi => "🌍",
            Language::Unspecified => "🇬🇧",
        }
    }

    /// Languages whose release naming conventions need the relaxed
    /// season/episode matching chain.
    pub fn uses_relaxed_episode_matching(&self) -> bool {
        matches!(self, Language::Ru)
    }
}

/// Lower-cased primary subtag of a language tag (`en-US` -> `en`).
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

impl FromStr for Language {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "fr" => Ok(Language::Fr),
            "es" => Ok(Language::Es),
            "de" => Ok(Language::De),
            "it" => Ok(Language::It),
            "pt" => Ok(Language::Pt),
            "ru" => Ok(Language::Ru),
            "in" | "hi" => Ok(Language::In),
            "nl" => Ok(Language::Nl),
            "multi" => Ok(Language::Multi),
            "no" | "" => Ok(Language::Unspecified),
            other => Err(ModelError::UnknownLanguage(other.to_string())),
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_with_region_use_primary_subtag() {
        assert_eq!(Language::from_tag("en-US"), Ok(Language::En));
        assert_eq!(Language::from_tag("fr_FR"), Ok(Language::Fr));
        assert_eq!(primary_subtag("ja-JP"), "ja");
        assert!(Language::from_tag("ja-JP").is_err());
    }

    #[test]
    fn unknown_flag_falls_back_to_english() {
        assert_eq!(Language::Unspecified.flag(), Language::En.flag());
        assert_eq!(Language::Multi.flag(), "🌍");
    }
}
