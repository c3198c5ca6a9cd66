//! Opaque `/playback` deep links.
//!
//! A link carries everything the debrid resolver needs to start playback
//! once the user picks a result: the magnet (or download link), the media
//! kind and, for series, the episode.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use torrex_model::{AnnotatedCandidate, MediaKind};

#[derive(Error, Debug)]
pub enum DeepLinkError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid playback payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Payload of the query segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackQuery {
    pub magnet: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
}

impl PlaybackQuery {
    pub fn for_candidate(candidate: &AnnotatedCandidate) -> Self {
        let series = candidate.kind == MediaKind::Series;
        Self {
            magnet: candidate.raw.link.clone(),
            kind: candidate.kind,
            season: candidate.season.clone().filter(|_| series),
            episode: candidate.episode.clone().filter(|_| series),
        }
    }
}

/// Serialize a query as JSON, base64 encode it and escape the padding so
/// the segment survives unescaped path handling.
pub fn encode_query(query: &PlaybackQuery) -> Result<String, DeepLinkError> {
    let json = serde_json::to_vec(query)?;
    Ok(STANDARD.encode(json).replace('=', "%3D"))
}

pub fn decode_query(segment: &str) -> Result<PlaybackQuery, DeepLinkError> {
    let bytes = STANDARD.decode(segment.replace("%3D", "="))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Builds `{host}/playback/{config}/{query}/{title}` links.
#[derive(Debug, Clone)]
pub struct DeepLinkCodec {
    playback_host: String,
    config_token: String,
}

impl DeepLinkCodec {
    pub fn new(
        playback_host: impl Into<String>,
        config_token: impl Into<String>,
    ) -> Self {
        let playback_host: String = playback_host.into();
        Self {
            playback_host: playback_host.trim_end_matches('/').to_string(),
            config_token: config_token.into(),
        }
    }

    pub fn link(
        &self,
        candidate: &AnnotatedCandidate,
    ) -> Result<String, DeepLinkError> {
        let query = encode_query(&PlaybackQuery::for_candidate(candidate))?;
        let title = urlencoding::encode(&candidate.title().replace(' ', "."))
            .into_owned();
        Ok(format!(
            "{}/playback/{}/{}/{}",
            self.playback_host, self.config_token, query, title
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::annotate;
    use torrex_model::{Language, LocalizedTitle, MediaIdentity, RawCandidate};

    #[test]
    fn series_link_carries_episode() {
        let identity = MediaIdentity::series(
            "tt1",
            vec![LocalizedTitle::new(Language::En, "Show")],
            "1",
            "2",
        )
        .unwrap();
        let candidate = annotate(
            RawCandidate::new("Show S01E02 1080p", 1, "magnet:?xt=urn:btih:abc", "a"),
            &identity,
            None,
        );
        let codec = DeepLinkCodec::new("https://addon.example/", "CONF");
        let link = codec.link(&candidate).unwrap();

        let rest = link
            .strip_prefix("https://addon.example/playback/CONF/")
            .unwrap();
        let (query, title) = rest.rsplit_once('/').unwrap();
        assert_eq!(title, "Show.S01E02.1080p");
        assert!(!query.contains('='));

        let decoded = decode_query(query).unwrap();
        assert_eq!(decoded.magnet, "magnet:?xt=urn:btih:abc");
        assert_eq!(decoded.kind, MediaKind::Series);
        assert_eq!(decoded.season.as_deref(), Some("S01"));
        assert_eq!(decoded.episode.as_deref(), Some("E02"));
    }

    #[test]
    fn movie_payload_omits_episode_fields() {
        let query = PlaybackQuery {
            magnet: "magnet:?xt=1".into(),
            kind: MediaKind::Movie,
            season: None,
            episode: None,
        };
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(json, r#"{"magnet":"magnet:?xt=1","type":"movie"}"#);
    }

    #[test]
    fn garbage_segment_is_rejected() {
        assert!(matches!(
            decode_query("not base64!"),
            Err(DeepLinkError::Base64(_))
        ));
    }
}
