use std::collections::BTreeSet;

use crate::identity::MediaKind;
use crate::language::Language;
use crate::quality::{QualityTier, SpecTag};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// A release as returned by an indexer or the result cache, before
/// enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawCandidate {
    pub title: String,
    pub size_bytes: u64,
    /// Magnet URI when the indexer exposes one, download link otherwise.
    pub link: String,
    pub indexer_id: String,
    pub indexer_name: String,
    /// Always positive when present; non-positive counts are discarded at
    /// parse time.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seeders: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub info_hash: Option<String>,
    /// Availability as recorded by the result cache. Indexer results never
    /// carry it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub availability: Option<bool>,
}

impl RawCandidate {
    pub fn new(
        title: impl Into<String>,
        size_bytes: u64,
        link: impl Into<String>,
        indexer_id: impl Into<String>,
    ) -> Self {
        let indexer_id = indexer_id.into();
        Self {
            title: title.into(),
            size_bytes,
            link: link.into(),
            indexer_name: indexer_id.clone(),
            indexer_id,
            seeders: None,
            info_hash: None,
            availability: None,
        }
    }

    pub fn with_seeders(mut self, seeders: u32) -> Self {
        self.seeders = Some(seeders);
        self
    }

    pub fn with_indexer_name(mut self, name: impl Into<String>) -> Self {
        self.indexer_name = name.into();
        self
    }

    pub fn with_availability(mut self, available: bool) -> Self {
        self.availability = Some(available);
        self
    }

    pub fn is_magnet(&self) -> bool {
        self.link.starts_with("magnet:")
    }

    pub fn size_gib(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_GIB
    }
}

/// Attributes detected from a release title.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    pub quality: QualityTier,
    pub tags: BTreeSet<SpecTag>,
    pub language: Language,
}

/// A raw candidate enriched with detected attributes and the request's
/// media context. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnotatedCandidate {
    pub raw: RawCandidate,
    pub attributes: Attributes,
    pub kind: MediaKind,
    pub season: Option<String>,
    pub episode: Option<String>,
}

impl AnnotatedCandidate {
    pub fn title(&self) -> &str {
        &self.raw.title
    }

    pub fn size_bytes(&self) -> u64 {
        self.raw.size_bytes
    }

    pub fn quality(&self) -> QualityTier {
        self.attributes.quality
    }

    pub fn tags(&self) -> &BTreeSet<SpecTag> {
        &self.attributes.tags
    }

    pub fn language(&self) -> Language {
        self.attributes.language
    }

    /// Tags joined for display, e.g. `BLURAY,DTS`.
    pub fn tag_list(&self) -> String {
        self.attributes
            .tags
            .iter()
            .map(SpecTag::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}
