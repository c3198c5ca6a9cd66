//! Torznab (Jackett) transport and XML decoding.

use std::collections::BTreeSet;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;
use torrex_model::indexer::IndexerDescriptor;
use torrex_model::language::primary_subtag;
use torrex_model::RawCandidate;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::TorznabConfig;
use crate::error::{IndexerFailure, SearchError};
use crate::ports::{IndexerBackend, IndexerDirectory};
use crate::query::IndexerQuery;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("indexer element without an id attribute")]
    MissingIndexerId,
}

/// Parse the `t=indexers` capability document.
pub fn parse_indexers(xml: &[u8]) -> Result<Vec<IndexerDescriptor>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut indexers = Vec::new();
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<IndexerDescriptor> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = element_name(&e);
                if name == "indexer" {
                    let id = attribute(&e, b"id")?
                        .ok_or(FeedError::MissingIndexerId)?;
                    current = Some(IndexerDescriptor::new(id.clone(), id, ""));
                } else if let Some(indexer) = current.as_mut() {
                    apply_search_caps(indexer, &name, &e)?;
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if let Some(indexer) = current.as_mut() {
                    apply_search_caps(indexer, &element_name(&e), &e)?;
                }
            }
            Event::Text(e) => {
                if let (Some(indexer), Some(field)) =
                    (current.as_mut(), child_of(&path, "indexer"))
                {
                    let text = e.unescape()?;
                    match field {
                        "title" => indexer.title = text.trim().to_string(),
                        "language" => indexer.language = primary_subtag(&text),
                        _ => {}
                    }
                }
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some("indexer") {
                    if let Some(indexer) = current.take() {
                        debug!(
                            indexer = %indexer.id,
                            language = %indexer.language,
                            movie = indexer.movie_caps.is_some(),
                            tv = indexer.series_caps.is_some(),
                            "parsed indexer"
                        );
                        indexers.push(indexer);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(indexers)
}

fn apply_search_caps(
    indexer: &mut IndexerDescriptor,
    name: &str,
    e: &BytesStart<'_>,
) -> Result<(), FeedError> {
    let slot = match name {
        "movie-search" => &mut indexer.movie_caps,
        "tv-search" => &mut indexer.series_caps,
        _ => return Ok(()),
    };
    if attribute(e, b"available")?.as_deref() != Some("yes") {
        return Ok(());
    }
    let params = attribute(e, b"supportedParams")?.unwrap_or_default();
    *slot = Some(
        params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>(),
    );
    Ok(())
}

/// Parse a torznab result feed into raw candidates.
///
/// Items with a non-positive seeder count or without any usable link are
/// dropped. `indexer_id` is used when an item does not name its indexer.
pub fn parse_search_results(
    xml: &[u8],
    indexer_id: &str,
) -> Result<Vec<RawCandidate>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut candidates = Vec::new();
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<ItemBuilder> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = element_name(&e);
                if name == "item" {
                    current = Some(ItemBuilder::default());
                } else if let Some(item) = current.as_mut() {
                    if name == "jackettindexer" {
                        item.indexer_id = attribute(&e, b"id")?;
                    } else {
                        item.read_element(&e)?;
                    }
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    item.read_element(&e)?;
                }
            }
            Event::Text(e) => {
                if let (Some(item), Some(field)) =
                    (current.as_mut(), child_of(&path, "item"))
                {
                    let text = e.unescape()?.trim().to_string();
                    item.read_text(field, text);
                }
            }
            Event::CData(e) => {
                if let (Some(item), Some(field)) =
                    (current.as_mut(), child_of(&path, "item"))
                {
                    let text = String::from_utf8_lossy(&e).trim().to_string();
                    item.read_text(field, text);
                }
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some("item") {
                    if let Some(candidate) = current
                        .take()
                        .and_then(|item| item.build(indexer_id))
                    {
                        candidates.push(candidate);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(candidates)
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    size: Option<u64>,
    link: Option<String>,
    enclosure: Option<String>,
    magnet: Option<String>,
    indexer_id: Option<String>,
    indexer_name: Option<String>,
    seeders: Option<i64>,
    info_hash: Option<String>,
}

impl ItemBuilder {
    fn read_element(&mut self, e: &BytesStart<'_>) -> Result<(), FeedError> {
        match e.local_name().as_ref() {
            b"attr" => {
                let (Some(name), Some(value)) =
                    (attribute(e, b"name")?, attribute(e, b"value")?)
                else {
                    return Ok(());
                };
                match name.as_str() {
                    "seeders" => self.seeders = value.trim().parse().ok(),
                    "magneturl" if !value.is_empty() => self.magnet = Some(value),
                    "infohash" if !value.is_empty() => {
                        self.info_hash = Some(value.to_lowercase())
                    }
                    "size" if self.size.is_none() => {
                        self.size = value.trim().parse().ok()
                    }
                    _ => {}
                }
            }
            b"enclosure" => self.enclosure = attribute(e, b"url")?,
            _ => {}
        }
        Ok(())
    }

    fn read_text(&mut self, field: &str, text: String) {
        if text.is_empty() {
            return;
        }
        match field {
            "title" => self.title = Some(text),
            "size" => self.size = text.parse().ok(),
            "link" => self.link = Some(text),
            "jackettindexer" => self.indexer_name = Some(text),
            _ => {}
        }
    }

    fn build(self, fallback_indexer: &str) -> Option<RawCandidate> {
        if self.seeders.is_some_and(|s| s <= 0) {
            return None;
        }
        let link = self.magnet.or(self.link).or(self.enclosure)?;
        let indexer_id = self
            .indexer_id
            .unwrap_or_else(|| fallback_indexer.to_string());

        let size = self.size.unwrap_or(0);
        let mut candidate =
            RawCandidate::new(self.title?, size, link, indexer_id);
        if let Some(name) = self.indexer_name {
            candidate = candidate.with_indexer_name(name);
        }
        if let Some(seeders) = self.seeders {
            let seeders = u32::try_from(seeders).unwrap_or(u32::MAX);
            candidate = candidate.with_seeders(seeders);
        }
        candidate.info_hash = self.info_hash;
        Some(candidate)
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn attribute(
    e: &BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>, FeedError> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Name of the innermost element when it is a direct child of `parent`.
fn child_of<'a>(path: &'a [String], parent: &str) -> Option<&'a str> {
    match path {
        [.., p, child] if p == parent => Some(child.as_str()),
        _ => None,
    }
}

/// HTTP client for a Jackett instance.
#[derive(Debug, Clone)]
pub struct TorznabClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl TorznabClient {
    pub fn new(config: &TorznabConfig) -> Result<Self, SearchError> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            SearchError::BackendUnavailable(format!(
                "invalid torznab base url '{}': {e}",
                config.base_url
            ))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SearchError::BackendUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, indexer_id: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(&format!(
            "api/v2.0/indexers/{indexer_id}/results/torznab/api"
        ))
    }
}

#[async_trait]
impl IndexerDirectory for TorznabClient {
    #[instrument(skip_all)]
    async fn list_indexers(
        &self,
    ) -> Result<Vec<IndexerDescriptor>, SearchError> {
        let unavailable = |e: &dyn std::fmt::Display| {
            SearchError::BackendUnavailable(e.to_string())
        };

        let url = self.endpoint("all").map_err(|e| unavailable(&e))?;
        let response = self
            .http
            .get(url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("t", "indexers"),
                ("configured", "true"),
            ])
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::BackendUnavailable(format!(
                "indexer directory returned {status}"
            )));
        }
        let body = response.bytes().await.map_err(|e| unavailable(&e))?;
        let indexers = parse_indexers(&body).map_err(|e| unavailable(&e))?;
        info!(count = indexers.len(), "loaded indexers");
        Ok(indexers)
    }
}

#[async_trait]
impl IndexerBackend for TorznabClient {
    async fn search(
        &self,
        indexer: &IndexerDescriptor,
        query: &IndexerQuery,
    ) -> Result<Vec<RawCandidate>, IndexerFailure> {
        let url = self
            .endpoint(&indexer.id)
            .map_err(|e| IndexerFailure::Transport(e.to_string()))?;
        let response = self
            .http
            .get(url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(query.params())
            .send()
            .await
            .map_err(|e| IndexerFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexerFailure::Status(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| IndexerFailure::Transport(e.to_string()))?;
        parse_search_results(&body, &indexer.id)
            .map_err(|e| IndexerFailure::Parse(e.to_string()))
    }
}
