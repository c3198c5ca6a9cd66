use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::{ModelError, Result};
use crate::language::Language;

/// Kind of media a search is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "series" | "tv" => Ok(MediaKind::Series),
            other => Err(ModelError::UnknownMediaKind(other.to_string())),
        }
    }
}

/// A title in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalizedTitle {
    pub language: Language,
    pub title: String,
}

impl LocalizedTitle {
    pub fn new(language: Language, title: impl Into<String>) -> Self {
        Self {
            language,
            title: title.into(),
        }
    }
}

/// The thing being searched for, as produced by the metadata resolver.
///
/// Immutable once constructed. Series identities always carry normalized
/// `S{2-digit}` / `E{2-digit}` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaIdentity {
    kind: MediaKind,
    titles: Vec<LocalizedTitle>,
    year: Option<String>,
    season: Option<String>,
    episode: Option<String>,
    external_id: String,
}

impl MediaIdentity {
    pub fn movie(
        external_id: impl Into<String>,
        titles: Vec<LocalizedTitle>,
        year: Option<String>,
    ) -> Result<Self> {
        if titles.is_empty() {
            return Err(ModelError::MissingTitle);
        }
        Ok(Self {
            kind: MediaKind::Movie,
            titles,
            year,
            season: None,
            episode: None,
            external_id: external_id.into(),
        })
    }

    /// Build a series identity. `season` and `episode` accept `1`, `01`,
    /// `S1` or `s01` style markers.
    pub fn series(
        external_id: impl Into<String>,
        titles: Vec<LocalizedTitle>,
        season: &str,
        episode: &str,
    ) -> Result<Self> {
        if titles.is_empty() {
            return Err(ModelError::MissingTitle);
        }
        Ok(Self {
            kind: MediaKind::Series,
            titles,
            year: None,
            season: Some(normalize_marker('S', "season", season)?),
            episode: Some(normalize_marker('E', "episode", episode)?),
            external_id: external_id.into(),
        })
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn titles(&self) -> &[LocalizedTitle] {
        &self.titles
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn season(&self) -> Option<&str> {
        self.season.as_deref()
    }

    pub fn episode(&self) -> Option<&str> {
        self.episode.as_deref()
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn season_number(&self) -> Option<u32> {
        self.season.as_deref().and_then(marker_number)
    }

    pub fn episode_number(&self) -> Option<u32> {
        self.episode.as_deref().and_then(marker_number)
    }

    /// First title declared for `language`, if any.
    pub fn title_for(&self, language: Language) -> Option<&LocalizedTitle> {
        self.titles.iter().find(|t| t.language == language)
    }

    /// Same identity restricted to a single title variant.
    pub fn with_single_title(&self, title: LocalizedTitle) -> Self {
        Self {
            titles: vec![title],
            ..self.clone()
        }
    }
}

fn normalize_marker(
    prefix: char,
    field: &'static str,
    raw: &str,
) -> Result<String> {
    marker_number(raw)
        .map(|n| format!("{prefix}{n:02}"))
        .ok_or_else(|| ModelError::InvalidEpisodeMarker {
            field,
            value: raw.to_string(),
        })
}

/// Integer value of a marker such as `S01`, `e7` or `12`.
pub fn marker_number(raw: &str) -> Option<u32> {
    raw.trim()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()
}
