use std::collections::BTreeSet;

use crate::identity::MediaKind;

/// Torznab parameter advertising search by external (IMDb) id.
pub const IDENTITY_SEARCH_PARAM: &str = "imdbid";

/// One configured backend indexer and what it can search for.
///
/// Built once per registry refresh and shared read-only between concurrent
/// searches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexerDescriptor {
    pub id: String,
    pub title: String,
    /// Primary language subtag, e.g. `en` for an `en-US` indexer.
    pub language: String,
    /// Supported movie-search parameters; `None` when movie search is
    /// unavailable.
    pub movie_caps: Option<BTreeSet<String>>,
    /// Supported tv-search parameters; `None` when tv search is unavailable.
    pub series_caps: Option<BTreeSet<String>>,
}

impl IndexerDescriptor {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            language: language.into(),
            movie_caps: None,
            series_caps: None,
        }
    }

    pub fn with_movie_caps<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.movie_caps = Some(params.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_series_caps<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.series_caps = Some(params.into_iter().map(Into::into).collect());
        self
    }

    pub fn caps(&self, kind: MediaKind) -> Option<&BTreeSet<String>> {
        match kind {
            MediaKind::Movie => self.movie_caps.as_ref(),
            MediaKind::Series => self.series_caps.as_ref(),
        }
    }

    pub fn supports(&self, kind: MediaKind, param: &str) -> bool {
        self.caps(kind).is_some_and(|caps| caps.contains(param))
    }

    pub fn supports_identity_search(&self, kind: MediaKind) -> bool {
        self.supports(kind, IDENTITY_SEARCH_PARAM)
    }

    pub fn is_english(&self) -> bool {
        self.language == "en"
    }
}
