//! HTTP client for the shared result cache.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use torrex_model::{Language, LocalizedTitle, MediaIdentity, RawCandidate};
use tracing::{debug, instrument};
use url::Url;

use crate::error::CacheError;
use crate::ports::CandidateCache;

#[derive(Debug, Serialize)]
struct CacheQuery<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<&'a str>,
    #[serde(rename = "type")]
    kind: &'static str,
    language: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    season: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    episode: Option<&'a str>,
}

/// A cached release as stored by the cache service.
#[derive(Debug, Deserialize)]
struct CachedRecord {
    title: String,
    #[serde(default)]
    size: u64,
    #[serde(default, alias = "link")]
    magnet: Option<String>,
    #[serde(default)]
    indexer: Option<String>,
    #[serde(default)]
    seeders: Option<i64>,
    #[serde(default, alias = "infoHash")]
    hash: Option<String>,
    #[serde(default)]
    availability: Option<bool>,
}

impl CachedRecord {
    fn into_candidate(self) -> Option<RawCandidate> {
        if self.seeders.is_some_and(|s| s <= 0) {
            return None;
        }
        let link = self.magnet.filter(|l| !l.is_empty())?;
        let indexer = self.indexer.unwrap_or_else(|| "cache".to_string());
        let mut candidate =
            RawCandidate::new(self.title, self.size, link, indexer);
        if let Some(seeders) = self.seeders {
            candidate =
                candidate.with_seeders(u32::try_from(seeders).unwrap_or(u32::MAX));
        }
        candidate.info_hash = self.hash.map(|h| h.to_lowercase());
        candidate.availability = self.availability;
        Some(candidate)
    }
}

/// [`CandidateCache`] backed by the `getResult` endpoint.
///
/// Looks up the identity under its primary title and under its English
/// title, merging both answers.
#[derive(Debug, Clone)]
pub struct HttpCandidateCache {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpCandidateCache {
    /// Client for the cache at `base_url`; every request is bounded by
    /// `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let mut base = base_url.trim().to_string();
        if base.is_empty() {
            return Err(CacheError::NotConfigured);
        }
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|_| CacheError::NotConfigured)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    fn lookup_titles(identity: &MediaIdentity) -> Vec<&LocalizedTitle> {
        let mut titles: Vec<&LocalizedTitle> =
            identity.titles().first().into_iter().collect();
        if let Some(english) = identity.title_for(Language::En) {
            if !titles.contains(&english) {
                titles.push(english);
            }
        }
        titles
    }

    async fn fetch(
        &self,
        identity: &MediaIdentity,
        title: &LocalizedTitle,
    ) -> Result<Vec<CachedRecord>, CacheError> {
        let kind = identity.kind().as_str();
        let url = self
            .base_url
            .join(&format!("getResult/{kind}/"))
            .map_err(|_| CacheError::NotConfigured)?;
        let body = CacheQuery {
            title: &title.title,
            year: identity.year(),
            kind,
            language: title.language.code(),
            season: identity.season(),
            episode: identity.episode(),
        };

        let response = self.http.get(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CandidateCache for HttpCandidateCache {
    #[instrument(skip_all, fields(id = identity.external_id()))]
    async fn lookup(
        &self,
        identity: &MediaIdentity,
    ) -> Result<Vec<RawCandidate>, CacheError> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for title in Self::lookup_titles(identity) {
            let records = self.fetch(identity, title).await?;
            debug!(language = %title.language, count = records.len(), "cache answered");
            for candidate in records.into_iter().filter_map(CachedRecord::into_candidate) {
                if seen.insert(candidate.link.clone()) {
                    candidates.push(candidate);
                }
            }
        }
        Ok(candidates)
    }
}
