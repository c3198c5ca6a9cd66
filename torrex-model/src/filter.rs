//! Per-request filter configuration.
//!
//! Requests arrive with a loosely typed payload ([`RawFilterConfig`], the
//! JSON object the player stores in its addon URL). It is validated once
//! into a [`FilterConfig`] before any filtering happens, so the pipeline
//! never has to deal with malformed values.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::num::NonZeroUsize;
use std::str::FromStr;

use thiserror::Error;

use crate::language::Language;
use crate::quality::{QualityTier, SpecTag};

/// Rejection of a malformed filter configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown language '{0}'")]
    Language(String),

    #[error("unknown sort mode '{0}'")]
    SortMode(String),

    #[error("unknown quality exclusion '{0}'")]
    QualityExclusion(String),

    #[error("invalid max size '{0}'")]
    MaxSize(String),

    #[error("results per quality must not be negative (got {0})")]
    ResultsPerQuality(i64),
}

/// Final ordering applied by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortMode {
    /// Tier order (4k first), ties broken by descending size.
    #[default]
    Quality,
    SizeAsc,
    SizeDesc,
}

impl FromStr for SortMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "quality" | "qualitythensize" => Ok(SortMode::Quality),
            "sizeasc" | "size_asc" => Ok(SortMode::SizeAsc),
            "sizedesc" | "size_desc" => Ok(SortMode::SizeDesc),
            _ => Err(ConfigurationError::SortMode(s.to_string())),
        }
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMode::Quality => "quality",
            SortMode::SizeAsc => "sizeAsc",
            SortMode::SizeDesc => "sizeDesc",
        })
    }
}

/// One entry of the excluded-qualities set: either a resolution tier or a
/// named group of release tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityExclusion {
    Tier(QualityTier),
    /// HDRIP, BRRIP, BDRIP, WEBRIP, TVRIP, VODRIP
    Rips,
    /// CAM, TS, TC, R5, DVDSCR, HDTV, PDTV, DSR, WORKPRINT, VHSRIP, HDCAM
    Cams,
}

impl QualityExclusion {
    pub fn excludes_tag(&self, tag: SpecTag) -> bool {
        match self {
            QualityExclusion::Rips => tag.is_rip(),
            QualityExclusion::Cams => tag.is_cam(),
            QualityExclusion::Tier(_) => false,
        }
    }
}

impl FromStr for QualityExclusion {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RIPS" => Ok(QualityExclusion::Rips),
            "CAM" => Ok(QualityExclusion::Cams),
            _ => s
                .parse::<QualityTier>()
                .map(QualityExclusion::Tier)
                .map_err(|_| ConfigurationError::QualityExclusion(s.to_string())),
        }
    }
}

/// Size cap as sent by clients: either a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum SizeValue {
    Bytes(u64),
    Text(String),
}

/// Filter payload as decoded from the request, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct RawFilterConfig {
    pub language: Option<String>,
    pub max_size: Option<SizeValue>,
    pub sort: Option<String>,
    pub exclusion: Vec<String>,
    pub exclusion_keywords: Vec<String>,
    pub results_per_quality: Option<i64>,
}

/// Validated filter configuration. Shared read-only by every reducer of a
/// request.
///
/// Defaults: no language filter, no size cap, quality sort, no exclusions,
/// no per-quality cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    language: Option<Language>,
    max_size_bytes: Option<u64>,
    sort: SortMode,
    excluded_qualities: BTreeSet<QualityExclusion>,
    excluded_keywords: Vec<String>,
    results_per_quality: Option<NonZeroUsize>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// A zero cap disables the size filter.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = (bytes > 0).then_some(bytes);
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_excluded_quality(mut self, exclusion: QualityExclusion) -> Self {
        self.excluded_qualities.insert(exclusion);
        self
    }

    pub fn with_excluded_keyword(mut self, keyword: &str) -> Self {
        push_keyword(&mut self.excluded_keywords, keyword);
        self
    }

    /// A zero cap disables the per-quality limit.
    pub fn with_results_per_quality(mut self, n: usize) -> Self {
        self.results_per_quality = NonZeroUsize::new(n);
        self
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size_bytes
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn excluded_qualities(&self) -> &BTreeSet<QualityExclusion> {
        &self.excluded_qualities
    }

    /// Upper-cased keywords, deduplicated, in configuration order.
    pub fn excluded_keywords(&self) -> &[String] {
        &self.excluded_keywords
    }

    pub fn results_per_quality(&self) -> Option<NonZeroUsize> {
        self.results_per_quality
    }
}

fn push_keyword(keywords: &mut Vec<String>, keyword: &str) {
    let keyword = keyword.trim().to_uppercase();
    if !keyword.is_empty() && !keywords.contains(&keyword) {
        keywords.push(keyword);
    }
}

impl TryFrom<RawFilterConfig> for FilterConfig {
    type Error = ConfigurationError;

    fn try_from(raw: RawFilterConfig) -> Result<Self, Self::Error> {
        let language = match raw.language.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => Some(
                code.parse::<Language>()
                    .map_err(|_| ConfigurationError::Language(code.to_string()))?,
            ),
        };

        let max_size_bytes = match raw.max_size {
            None => None,
            Some(SizeValue::Bytes(bytes)) => Some(bytes),
            Some(SizeValue::Text(text)) if text.trim().is_empty() => None,
            Some(SizeValue::Text(text)) => Some(
                text.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigurationError::MaxSize(text.clone()))?,
            ),
        }
        .filter(|bytes| *bytes > 0);

        let sort = match raw.sort.as_deref() {
            None => SortMode::default(),
            Some(mode) => mode.parse()?,
        };

        let excluded_qualities = raw
            .exclusion
            .iter()
            .map(|entry| entry.parse::<QualityExclusion>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut excluded_keywords = Vec::new();
        for keyword in &raw.exclusion_keywords {
            push_keyword(&mut excluded_keywords, keyword);
        }

        let results_per_quality = match raw.results_per_quality {
            None => None,
            Some(n) if n < 0 => {
                return Err(ConfigurationError::ResultsPerQuality(n));
            }
            Some(n) => NonZeroUsize::new(n as usize),
        };

        Ok(Self {
            language,
            max_size_bytes,
            sort,
            excluded_qualities,
            excluded_keywords,
            results_per_quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_is_validated_into_typed_values() {
        let raw = RawFilterConfig {
            language: Some("fr".into()),
            max_size: Some(SizeValue::Text("1073741824".into())),
            sort: Some("sizeDesc".into()),
            exclusion: vec!["720p".into(), "rips".into(), "CAM".into()],
            exclusion_keywords: vec!["sample".into(), "SAMPLE".into(), " ".into()],
            results_per_quality: Some(3),
        };
        let config = FilterConfig::try_from(raw).unwrap();

        assert_eq!(config.language(), Some(Language::Fr));
        assert_eq!(config.max_size_bytes(), Some(1_073_741_824));
        assert_eq!(config.sort(), SortMode::SizeDesc);
        assert!(
            config
                .excluded_qualities()
                .contains(&QualityExclusion::Tier(QualityTier::Hd))
        );
        assert!(config.excluded_qualities().contains(&QualityExclusion::Rips));
        assert!(config.excluded_qualities().contains(&QualityExclusion::Cams));
        assert_eq!(config.excluded_keywords(), ["SAMPLE".to_string()]);
        assert_eq!(config.results_per_quality().map(NonZeroUsize::get), Some(3));
    }

    #[test]
    fn zero_values_mean_disabled() {
        let raw = RawFilterConfig {
            max_size: Some(SizeValue::Bytes(0)),
            results_per_quality: Some(0),
            ..Default::default()
        };
        let config = FilterConfig::try_from(raw).unwrap();
        assert_eq!(config.max_size_bytes(), None);
        assert_eq!(config.results_per_quality(), None);
        assert_eq!(config, FilterConfig::default());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let bad_sort = RawFilterConfig {
            sort: Some("random".into()),
            ..Default::default()
        };
        assert_eq!(
            FilterConfig::try_from(bad_sort),
            Err(ConfigurationError::SortMode("random".into()))
        );

        let bad_quality = RawFilterConfig {
            exclusion: vec!["8k".into()],
            ..Default::default()
        };
        assert_eq!(
            FilterConfig::try_from(bad_quality),
            Err(ConfigurationError::QualityExclusion("8k".into()))
        );

        let negative = RawFilterConfig {
            results_per_quality: Some(-1),
            ..Default::default()
        };
        assert_eq!(
            FilterConfig::try_from(negative),
            Err(ConfigurationError::ResultsPerQuality(-1))
        );

        let bad_size = RawFilterConfig {
            max_size: Some(SizeValue::Text("2GB".into())),
            ..Default::default()
        };
        assert!(matches!(
            FilterConfig::try_from(bad_size),
            Err(ConfigurationError::MaxSize(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn decodes_addon_payload() {
        let raw: RawFilterConfig = serde_json::from_str(
            r#"{"language":"en","maxSize":"0","sort":"quality",
                "exclusion":["RIPS"],"exclusionKeywords":["3D"],
                "resultsPerQuality":5}"#,
        )
        .unwrap();
        assert_eq!(raw.max_size, Some(SizeValue::Text("0".into())));
        let config = FilterConfig::try_from(raw).unwrap();
        assert_eq!(config.max_size_bytes(), None);
        assert_eq!(config.excluded_keywords(), ["3D".to_string()]);
    }
}
