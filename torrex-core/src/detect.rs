//! Release title attribute detection.
//!
//! Every function here is a pure function of its inputs. The regex tables
//! are compiled once on first use and never mutated, so detection is safe to
//! run from any number of tasks at once.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use torrex_model::{
    AnnotatedCandidate, Attributes, Language, MediaIdentity, QualityTier,
    RawCandidate, SpecTag,
};

fn word_pattern(alternatives: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{alternatives})\b"))
        .expect("static detection pattern must compile")
}

/// Resolution tiers in priority order; the first match wins.
static QUALITY_PATTERNS: Lazy<Vec<(QualityTier, Regex)>> = Lazy::new(|| {
    [
        (QualityTier::UltraHd, r"2160p|4k|uhd"),
        (QualityTier::FullHd, r"1080p"),
        (QualityTier::Hd, r"720p"),
        (QualityTier::Sd, r"480p"),
    ]
    .into_iter()
    .map(|(tier, pattern)| (tier, word_pattern(pattern)))
    .collect()
});

/// Tags are tested independently; a title may carry several.
static SPEC_PATTERNS: Lazy<Vec<(SpecTag, Regex)>> = Lazy::new(|| {
    [
        (SpecTag::Hdr, r"HDR|HDR10|HDR10PLUS|HDR10\+"),
        (SpecTag::Dts, r"DTS|DTS-HD"),
        (SpecTag::Ddp, r"DDP|DDP5\.1|DDP7\.1"),
        (SpecTag::Dd, r"DD|DD5\.1|DD7\.1"),
        (SpecTag::Sdr, r"SDR|SDRIP"),
        (SpecTag::WebDl, r"WEBDL|WEB-DL|WEB"),
        (SpecTag::BluRay, r"BLURAY|BLU-RAY|BD"),
        (SpecTag::DvdRip, r"DVDRIP|DVDR"),
        (SpecTag::Cam, r"CAM|CAMRIP|CAM-RIP"),
        (SpecTag::Ts, r"TS|TELESYNC"),
        (SpecTag::Tc, r"TC|TELECINE"),
        (SpecTag::R5, r"R5|R5LINE|R5-LINE"),
        (SpecTag::DvdScr, r"DVDSCR|DVD-SCR"),
        (SpecTag::HdTv, r"HDTV|HDTVRIP|HDTV-RIP"),
        (SpecTag::PdTv, r"PDTV|PDTVRIP|PDTV-RIP"),
        (SpecTag::Dsr, r"DSR|DSRRIP|DSR-RIP"),
        (SpecTag::Workprint, r"WORKPRINT|WP"),
        (SpecTag::VhsRip, r"VHSRIP|VHS-RIP"),
        (SpecTag::VodRip, r"VODRIP|VOD-RIP"),
        (SpecTag::TvRip, r"TVRIP|TV-RIP"),
        (SpecTag::WebRip, r"WEBRIP|WEB-RIP"),
        (SpecTag::BrRip, r"BRRIP|BR-RIP"),
        (SpecTag::BdRip, r"BDRIP|BD-RIP"),
        (SpecTag::HdCam, r"HDCAM|HD-CAM"),
        (SpecTag::HdRip, r"HDRIP|HD-RIP"),
    ]
    .into_iter()
    .map(|(tag, pattern)| (tag, word_pattern(pattern)))
    .collect()
});

/// Audio language markers. `Multi` comes first so dual-audio releases that
/// also name one of their languages are reported as multi.
static LANGUAGE_PATTERNS: Lazy<Vec<(Language, Regex)>> = Lazy::new(|| {
    [
        (Language::Multi, r"MULTI|MULTI-?AUDIO|DUAL-?AUDIO"),
        (Language::Fr, r"FRENCH|TRUEFRENCH|VFF|VFQ|VFI|VF2"),
        (Language::Ru, r"RUS|RUSSIAN"),
        (Language::Es, r"SPANISH|ESPANOL|CASTELLANO|LATINO"),
        (Language::De, r"GERMAN|DEUTSCH"),
        (Language::It, r"ITALIAN|ITA"),
        (Language::Pt, r"PORTUGUESE|PT-BR|DUBLADO"),
        (Language::Nl, r"DUTCH|FLEMISH"),
        (Language::In, r"HINDI|TAMIL|TELUGU"),
        (Language::En, r"ENGLISH|ENG"),
    ]
    .into_iter()
    .map(|(language, pattern)| (language, word_pattern(pattern)))
    .collect()
});

/// Resolution tier of a release title; `Unknown` when no token matches.
pub fn detect_quality(title: &str) -> QualityTier {
    QUALITY_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(title))
        .map(|(tier, _)| *tier)
        .unwrap_or(QualityTier::Unknown)
}

pub fn detect_tags(title: &str) -> BTreeSet<SpecTag> {
    SPEC_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(title))
        .map(|(tag, _)| *tag)
        .collect()
}

/// Audio language of a release. Without an explicit marker the release is
/// assumed to be in `fallback`, or `Unspecified` when there is none.
pub fn detect_language(title: &str, fallback: Option<Language>) -> Language {
    LANGUAGE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(title))
        .map(|(language, _)| *language)
        .or(fallback)
        .unwrap_or(Language::Unspecified)
}

pub fn detect(title: &str, fallback_language: Option<Language>) -> Attributes {
    Attributes {
        quality: detect_quality(title),
        tags: detect_tags(title),
        language: detect_language(title, fallback_language),
    }
}

/// Enrich a raw candidate with detected attributes and the media context
/// of the request it belongs to.
pub fn annotate(
    raw: RawCandidate,
    identity: &MediaIdentity,
    fallback_language: Option<Language>,
) -> AnnotatedCandidate {
    let attributes = detect(&raw.title, fallback_language);
    AnnotatedCandidate {
        raw,
        attributes,
        kind: identity.kind(),
        season: identity.season().map(str::to_owned),
        episode: identity.episode().map(str::to_owned),
    }
}
