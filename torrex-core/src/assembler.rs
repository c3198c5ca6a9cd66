//! Maps ranked candidates to stream entries, resolving availability with a
//! bounded worker pool.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use torrex_model::{
    AnnotatedCandidate, Availability, RankedResult, StreamResponse,
};
use tracing::{debug, info, instrument, warn};

use crate::config::AssemblerConfig;
use crate::deeplink::DeepLinkCodec;
use crate::error::AvailabilityError;
use crate::ports::AvailabilityResolver;

pub const AUTH_BLOCKED_NAME: &str = "AUTH_BLOCKED";
const AUTH_BLOCKED_TITLE: &str = "New connection on your debrid account.\r\n\
                                  Please authorize the connection\r\n\
                                  on your email";

/// Where availability comes from.
#[derive(Clone)]
pub enum AvailabilityMode {
    /// Ask the debrid/cache collaborator for every candidate.
    Checked(Arc<dyn AvailabilityResolver>),
    /// Trust the availability recorded on the candidate itself; candidates
    /// without one are dropped.
    Trusted,
}

impl std::fmt::Debug for AvailabilityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvailabilityMode::Checked(_) => f.write_str("Checked"),
            AvailabilityMode::Trusted => f.write_str("Trusted"),
        }
    }
}

/// Final response plus what was dropped on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    pub response: StreamResponse,
    pub check_failures: usize,
    pub dropped_unavailable: usize,
}

#[derive(Debug, Clone)]
pub struct ResultAssembler {
    links: DeepLinkCodec,
    max_parallel_checks: usize,
    keep_uncached: bool,
}

impl ResultAssembler {
    pub fn new(config: &AssemblerConfig) -> Self {
        Self {
            links: DeepLinkCodec::new(
                config.playback_host.clone(),
                config.config_token.clone(),
            ),
            max_parallel_checks: config.max_parallel_checks.max(1),
            keep_uncached: config.keep_uncached,
        }
    }

    /// Resolve availability for every candidate and build the response.
    ///
    /// Results keep the pipeline order, with available-now entries moved
    /// ahead of on-demand ones. The first `AuthRequired` answer ends the
    /// batch: outstanding checks are dropped and a single notice is
    /// returned instead.
    #[instrument(skip_all, fields(candidates = candidates.len(), mode = ?mode))]
    pub async fn assemble(
        &self,
        candidates: Vec<AnnotatedCandidate>,
        mode: &AvailabilityMode,
    ) -> AssemblyReport {
        let mut checks = stream::iter(candidates)
            .map(|candidate| async move {
                let availability = resolve(&candidate, mode).await;
                (candidate, availability)
            })
            .buffered(self.max_parallel_checks);

        let mut entries: Vec<(bool, RankedResult)> = Vec::new();
        let mut check_failures = 0;
        let mut dropped_unavailable = 0;

        while let Some((candidate, availability)) = checks.next().await {
            let available_now = match availability {
                Ok(Some(Availability::Available)) => true,
                Ok(Some(Availability::Unavailable)) if self.keep_uncached => {
                    false
                }
                Ok(Some(Availability::Unavailable)) | Ok(None) => {
                    dropped_unavailable += 1;
                    continue;
                }
                Ok(Some(Availability::AuthRequired)) => {
                    info!("debrid connection awaiting authorization");
                    return AssemblyReport {
                        response: StreamResponse::AuthRequired(auth_notice()),
                        check_failures,
                        dropped_unavailable,
                    };
                }
                Err(e) => {
                    warn!(title = candidate.title(), error = %e, "availability check failed");
                    check_failures += 1;
                    continue;
                }
            };

            match self.render(&candidate, available_now) {
                Ok(result) => entries.push((available_now, result)),
                Err(e) => {
                    warn!(title = candidate.title(), error = %e, "could not build deep link");
                    check_failures += 1;
                }
            }
        }

        entries.sort_by_key(|(available_now, _)| !*available_now);
        debug!(
            results = entries.len(),
            check_failures, dropped_unavailable, "assembled streams"
        );

        AssemblyReport {
            response: StreamResponse::from_streams(
                entries.into_iter().map(|(_, result)| result).collect(),
            ),
            check_failures,
            dropped_unavailable,
        }
    }

    fn render(
        &self,
        candidate: &AnnotatedCandidate,
        available_now: bool,
    ) -> Result<RankedResult, crate::deeplink::DeepLinkError> {
        Ok(RankedResult {
            name: display_name(candidate, available_now),
            title: display_title(candidate),
            url: self.links.link(candidate)?,
        })
    }
}

async fn resolve(
    candidate: &AnnotatedCandidate,
    mode: &AvailabilityMode,
) -> Result<Option<Availability>, AvailabilityError> {
    match mode {
        AvailabilityMode::Checked(resolver) => {
            resolver.check(candidate).await.map(Some)
        }
        AvailabilityMode::Trusted => Ok(candidate.raw.availability.map(
            |available| {
                if available {
                    Availability::Available
                } else {
                    Availability::Unavailable
                }
            },
        )),
    }
}

/// `+YTS (1080p - BLURAY,DTS)`; `-` marks on-demand results.
pub fn display_name(candidate: &AnnotatedCandidate, available_now: bool) -> String {
    let marker = if available_now { '+' } else { '-' };
    let indexer = &candidate.raw.indexer_name;
    if candidate.tags().is_empty() {
        format!("{marker}{indexer} ({})", candidate.quality())
    } else {
        format!(
            "{marker}{indexer} ({} - {})",
            candidate.quality(),
            candidate.tag_list()
        )
    }
}

pub fn display_title(candidate: &AnnotatedCandidate) -> String {
    let seeders = candidate
        .raw
        .seeders
        .map_or_else(|| "?".to_string(), |s| s.to_string());
    format!(
        "{}\r\n{}   👥 {}   📂 {:.2}GB",
        candidate.title(),
        candidate.language().flag(),
        seeders,
        candidate.raw.size_gib()
    )
}

fn auth_notice() -> RankedResult {
    RankedResult {
        name: AUTH_BLOCKED_NAME.to_string(),
        title: AUTH_BLOCKED_TITLE.to_string(),
        url: "#".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::annotate;
    use crate::ports::MockAvailabilityResolver;
    use torrex_model::{Language, LocalizedTitle, MediaIdentity, RawCandidate};

    const GIB: u64 = 1024 * 1024 * 1024;

    fn candidate(title: &str, link: &str) -> AnnotatedCandidate {
        let identity = MediaIdentity::movie(
            "tt1",
            vec![LocalizedTitle::new(Language::En, "Movie")],
            None,
        )
        .unwrap();
        let raw = RawCandidate::new(title, 3 * GIB / 2, link, "yts")
            .with_indexer_name("YTS")
            .with_seeders(12);
        annotate(raw, &identity, Some(Language::En))
    }

    fn assembler(keep_uncached: bool) -> ResultAssembler {
        ResultAssembler::new(&AssemblerConfig {
            max_parallel_checks: 2,
            keep_uncached,
            playback_host: "http://addon".into(),
            config_token: "cfg".into(),
        })
    }

    #[test]
    fn display_fields() {
        let c = candidate("Movie.2020.1080p.BluRay.DTS", "magnet:?xt=1");
        assert_eq!(display_name(&c, true), "+YTS (1080p - DTS,BLURAY)");
        assert_eq!(
            display_title(&c),
            "Movie.2020.1080p.BluRay.DTS\r\n🇬🇧   👥 12   📂 1.50GB"
        );
        let plain = candidate("Movie.2020.720p", "magnet:?xt=2");
        assert_eq!(display_name(&plain, false), "-YTS (720p)");
    }

    #[tokio::test]
    async fn failed_checks_drop_only_their_candidate() {
        let mut resolver = MockAvailabilityResolver::new();
        resolver.expect_check().returning(|c| match c.raw.link.as_str() {
            "magnet:?xt=bad" => {
                Err(AvailabilityError::Transport("reset".into()))
            }
            "magnet:?xt=cold" => Ok(Availability::Unavailable),
            _ => Ok(Availability::Available),
        });
        let mode = AvailabilityMode::Checked(Arc::new(resolver));

        let report = assembler(false)
            .assemble(
                vec![
                    candidate("A.1080p", "magnet:?xt=good"),
                    candidate("B.1080p", "magnet:?xt=bad"),
                    candidate("C.1080p", "magnet:?xt=cold"),
                ],
                &mode,
            )
            .await;

        assert_eq!(report.check_failures, 1);
        assert_eq!(report.dropped_unavailable, 1);
        let names: Vec<&str> =
            report.response.results().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("A.1080p"));
        assert!(report.response.results()[0].url.starts_with("http://addon/playback/cfg/"));
    }

    #[tokio::test]
    async fn auth_required_short_circuits_the_batch() {
        let mut resolver = MockAvailabilityResolver::new();
        resolver.expect_check().returning(|c| {
            if c.raw.link == "magnet:?xt=2" {
                Ok(Availability::AuthRequired)
            } else {
                Ok(Availability::Available)
            }
        });
        let mode = AvailabilityMode::Checked(Arc::new(resolver));

        let report = assembler(false)
            .assemble(
                vec![
                    candidate("A.1080p", "magnet:?xt=1"),
                    candidate("B.1080p", "magnet:?xt=2"),
                    candidate("C.1080p", "magnet:?xt=3"),
                ],
                &mode,
            )
            .await;

        let StreamResponse::AuthRequired(notice) = report.response else {
            panic!("expected auth notice, got {:?}", report.response);
        };
        assert_eq!(notice.name, AUTH_BLOCKED_NAME);
        assert_eq!(notice.url, "#");
    }

    #[tokio::test]
    async fn trusted_mode_uses_candidate_data_and_orders_available_first() {
        let mut cold = candidate("Cold.2160p", "magnet:?xt=cold");
        cold.raw.availability = Some(false);
        let mut hot = candidate("Hot.720p", "magnet:?xt=hot");
        hot.raw.availability = Some(true);
        let unknown = candidate("Unknown.1080p", "magnet:?xt=unknown");

        let report = assembler(true)
            .assemble(vec![cold, unknown, hot], &AvailabilityMode::Trusted)
            .await;

        let names: Vec<&str> =
            report.response.results().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["+YTS (720p)", "-YTS (4k)"]);
        assert_eq!(report.dropped_unavailable, 1);
    }

    #[tokio::test]
    async fn nothing_available_means_no_results() {
        let report = assembler(false)
            .assemble(
                vec![candidate("A.1080p", "magnet:?xt=1")],
                &AvailabilityMode::Trusted,
            )
            .await;
        assert_eq!(report.response, StreamResponse::NoResults);
    }
}
