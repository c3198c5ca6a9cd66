//! Filter & rank pipeline.
//!
//! An ordered list of reducers over annotated candidates. Every reducer is
//! skipped when its setting is absent, preserves the relative order of the
//! candidates it keeps, and only uses stable sorts. Running the pipeline
//! on its own output with the same configuration is a no-op.

use std::collections::HashMap;

use torrex_model::{
    AnnotatedCandidate, FilterConfig, Language, MediaIdentity, MediaKind,
    QualityExclusion, QualityTier, SortMode,
};
use regex::Regex;
use tracing::{debug, warn};

/// Media context of the request being filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub kind: MediaKind,
    /// Normalized season marker (`S01`), series only.
    pub season: Option<String>,
    /// Normalized episode marker (`E02`), series only.
    pub episode: Option<String>,
    /// Language the request was made in, if any.
    pub language: Option<Language>,
}

impl RequestContext {
    /// Context of a request for `identity` made in `language`.
    pub fn from_identity(
        identity: &MediaIdentity,
        language: Option<Language>,
    ) -> Self {
        Self {
            kind: identity.kind(),
            season: identity.season().map(str::to_owned),
            episode: identity.episode().map(str::to_owned),
            language,
        }
    }
}

/// The reducer chain, configured by one validated [`FilterConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FilterPipeline<'a> {
    config: &'a FilterConfig,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(config: &'a FilterConfig) -> Self {
        Self { config }
    }

    /// Apply season/episode, language, size, keyword, quality exclusion
    /// and per-quality reducers in that order, then sort.
    pub fn run(
        &self,
        candidates: Vec<AnnotatedCandidate>,
        ctx: &RequestContext,
    ) -> Vec<AnnotatedCandidate> {
        let config = self.config;
        let mut candidates = candidates;

        if let (MediaKind::Series, Some(season), Some(episode)) =
            (ctx.kind, ctx.season.as_deref(), ctx.episode.as_deref())
        {
            let relaxed = config
                .language()
                .or(ctx.language)
                .is_some_and(|l| l.uses_relaxed_episode_matching());
            let matcher = EpisodeMatcher::new(season, episode, relaxed);
            candidates =
                step("season_episode", candidates, |c| matcher.matches(c.title()));
        }

        if let Some(language) = config.language() {
            candidates = step("language", candidates, |c| {
                matches!(c.language(), Language::Multi | Language::Unspecified)
                    || c.language() == language
            });
        }

        if let (MediaKind::Movie, Some(max)) = (ctx.kind, config.max_size_bytes())
        {
            candidates = step("max_size", candidates, |c| c.size_bytes() <= max);
        }

        if !config.excluded_keywords().is_empty() {
            candidates = step("exclusion_keywords", candidates, |c| {
                let title = c.title().to_uppercase();
                !config
                    .excluded_keywords()
                    .iter()
                    .any(|keyword| title.contains(keyword.as_str()))
            });
        }

        if !config.excluded_qualities().is_empty() {
            candidates = step("quality_exclusion", candidates, |c| {
                !is_excluded(c, config)
            });
        }

        if let Some(limit) = config.results_per_quality() {
            let mut taken: HashMap<QualityTier, usize> = HashMap::new();
            candidates = step("results_per_quality", candidates, |c| {
                let count = taken.entry(c.quality()).or_default();
                *count += 1;
                *count <= limit.get()
            });
        }

        sort_candidates(&mut candidates, config.sort());
        debug!(sort = %config.sort(), count = candidates.len(), "pipeline done");
        candidates
    }
}

fn step(
    name: &'static str,
    candidates: Vec<AnnotatedCandidate>,
    mut keep: impl FnMut(&AnnotatedCandidate) -> bool,
) -> Vec<AnnotatedCandidate> {
    let before = candidates.len();
    let kept: Vec<_> = candidates.into_iter().filter(|c| keep(c)).collect();
    debug!(step = name, before, after = kept.len(), "pipeline step");
    kept
}

fn is_excluded(candidate: &AnnotatedCandidate, config: &FilterConfig) -> bool {
    let excluded = config.excluded_qualities();
    excluded.contains(&QualityExclusion::Tier(candidate.quality()))
        || excluded.iter().any(|exclusion| {
            candidate.tags().iter().any(|tag| exclusion.excludes_tag(*tag))
        })
}

/// Stable sort by `mode`. Quality sort ranks tiers best first and breaks
/// ties by size, largest first.
pub fn sort_candidates(candidates: &mut [AnnotatedCandidate], mode: SortMode) {
    match mode {
        SortMode::Quality => candidates.sort_by(|a, b| {
            a.quality()
                .cmp(&b.quality())
                .then_with(|| b.size_bytes().cmp(&a.size_bytes()))
        }),
        SortMode::SizeAsc => candidates.sort_by_key(|c| c.size_bytes()),
        SortMode::SizeDesc => {
            candidates.sort_by(|a, b| b.size_bytes().cmp(&a.size_bytes()))
        }
    }
}

/// Compiled season/episode patterns for one request.
///
/// Holds an ordered chain of alternatives; a title matches when every
/// pattern of any alternative matches. The contiguous `S01E02` form always
/// counts. Relaxed languages also accept an isolated `S01` with `E02`
/// elsewhere in the title, and finally `S1` with `E02` elsewhere. A marker
/// followed by another digit (`S11`, `E021`) never counts.
#[derive(Debug, Clone)]
pub struct EpisodeMatcher {
    alternatives: Vec<Vec<Regex>>,
}

impl EpisodeMatcher {
    /// Compile the patterns for `season`/`episode`; `relaxed` enables the
    /// split and short-season forms.
    pub fn new(season: &str, episode: &str, relaxed: bool) -> Self {
        let season = regex::escape(&season.trim().to_ascii_uppercase());
        let episode = regex::escape(&episode.trim().to_ascii_uppercase());
        let episode_marker = format!(r"(?i){episode}(?:\D|$)");

        let mut chain = vec![vec![format!(r"(?i){season}{episode}(?:\D|$)")]];
        if relaxed {
            chain.push(vec![format!(r"(?i)\b{season}\b"), episode_marker.clone()]);
            let short_season = format!(
                "S{}",
                season.trim_start_matches('S').trim_start_matches('0')
            );
            if short_season.len() > 1 {
                chain.push(vec![
                    format!(r"(?i)\b{short_season}(?:\D|$)"),
                    episode_marker,
                ]);
            }
        }

        let alternatives = chain
            .into_iter()
            .filter_map(|patterns| {
                patterns
                    .iter()
                    .map(|pattern| match Regex::new(pattern) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(pattern = %pattern, error = %e, "skipping episode pattern");
                            None
                        }
                    })
                    .collect::<Option<Vec<_>>>()
            })
            .collect();
        Self { alternatives }
    }

    pub fn matches(&self, title: &str) -> bool {
        self.alternatives
            .iter()
            .any(|patterns| patterns.iter().all(|re| re.is_match(title)))
    }
}

/// Whether a release title covers `season`/`episode` (`S01`/`E02`).
///
/// One-off form of [`EpisodeMatcher`]; the pipeline compiles the matcher
/// once per request.
pub fn matches_episode(
    title: &str,
    season: &str,
    episode: &str,
    relaxed: bool,
) -> bool {
    EpisodeMatcher::new(season, episode, relaxed).matches(title)
}
