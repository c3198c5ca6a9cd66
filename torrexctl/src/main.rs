//! `torrexctl`: query a Jackett instance through the Torrex engine from the
//! command line.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::{Value, json};
use torrex_core::model::{
    AnnotatedCandidate, Availability, Language, LocalizedTitle, MediaIdentity,
    MediaKind, RawFilterConfig, StreamResponse,
};
use torrex_core::{
    AvailabilityError, AvailabilityMode, AvailabilityResolver, Engine,
    SearchRequest, deeplink, detect,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ConfigLoad, ConfigLoader};

#[derive(Parser, Debug)]
#[command(name = "torrexctl")]
#[command(about = "Search torrent indexers through Jackett and rank the results")]
struct Cli {
    /// Path to a torrex.toml file (overrides TORREX_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Alternate .env file to load before reading the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the configured indexers and their search capabilities
    Indexers,
    /// Search every indexer and print the ranked streams
    Search(SearchArgs),
    /// Print the attributes detected in a release title
    Detect {
        /// Release title, e.g. Movie.2020.1080p.BluRay.x264
        title: String,
        /// Language assumed when the title names none
        #[arg(long)]
        language: Option<Language>,
    },
    /// Decode the query segment of a playback deep link
    DecodeLink {
        /// Base64 segment between the config token and the file name
        query: String,
    },
}

#[derive(ClapArgs, Debug)]
struct SearchArgs {
    /// movie or series
    #[arg(long, default_value = "movie")]
    kind: MediaKind,

    /// Localized title as LANG=TITLE; repeat for each language
    #[arg(long = "title", required = true, value_parser = parse_title)]
    titles: Vec<LocalizedTitle>,

    /// IMDb id of the media, e.g. tt0133093
    #[arg(long)]
    imdb: String,

    #[arg(long)]
    year: Option<String>,

    /// Season marker for series (1, 01 or S01)
    #[arg(long, required_if_eq("kind", "series"))]
    season: Option<String>,

    /// Episode marker for series (2, 02 or E02)
    #[arg(long, required_if_eq("kind", "series"))]
    episode: Option<String>,

    /// Request language used as fallback for undetected titles
    #[arg(long)]
    language: Option<Language>,

    /// Filter payload as JSON, e.g. '{"sort":"sizeDesc","resultsPerQuality":2}'
    #[arg(long, value_parser = parse_filter)]
    filter: Option<RawFilterConfig>,

    /// Treat every live result as uncached and list it as on-demand
    #[arg(long, default_value_t = false)]
    assume_uncached: bool,
}

/// Availability collaborator for offline runs: nothing is cached.
struct NothingCached;

#[async_trait]
impl AvailabilityResolver for NothingCached {
    async fn check(
        &self,
        _candidate: &AnnotatedCandidate,
    ) -> Result<Availability, AvailabilityError> {
        Ok(Availability::Unavailable)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,torrex_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = match cli.command {
        Command::Detect { title, language } => {
            serde_json::to_value(detect(&title, language))?
        }
        Command::DecodeLink { query } => serde_json::to_value(
            deeplink::decode_query(&query).context("invalid deep link")?,
        )?,
        Command::Indexers => {
            let load = load_config(cli.config, cli.env_file)?;
            let engine = Engine::from_config(&load.config)
                .context("failed to build engine")?;
            let indexers = engine
                .list_indexers()
                .await
                .context("failed to list indexers")?;
            serde_json::to_value(indexers.as_ref())?
        }
        Command::Search(args) => {
            let mut load = load_config(cli.config, cli.env_file)?;
            if args.assume_uncached {
                load.config.assembler.keep_uncached = true;
            }
            let engine = Engine::from_config(&load.config)
                .context("failed to build engine")?;
            run_search(&engine, args).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(
    config: Option<PathBuf>,
    env_file: Option<PathBuf>,
) -> Result<ConfigLoad> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = env_file {
        loader = loader.with_env_file(path);
    }
    let load = loader.load().context("failed to load configuration")?;

    if load.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &load.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }
    for warning in &load.warnings {
        warn!(message = %warning, "configuration warning");
    }
    Ok(load)
}

async fn run_search(engine: &Engine, args: SearchArgs) -> Result<Value> {
    let identity = match args.kind {
        MediaKind::Movie => {
            MediaIdentity::movie(args.imdb, args.titles, args.year)?
        }
        MediaKind::Series => {
            let season = args.season.unwrap_or_default();
            let episode = args.episode.unwrap_or_default();
            let identity =
                MediaIdentity::series(args.imdb, args.titles, &season, &episode)?;
            match args.year {
                Some(year) => identity.with_year(year),
                None => identity,
            }
        }
    };

    let mut request =
        SearchRequest::new(identity).with_filter(args.filter.unwrap_or_default());
    if let Some(language) = args.language {
        request = request.with_language(language);
    }
    if args.assume_uncached {
        request = request
            .with_availability(AvailabilityMode::Checked(Arc::new(NothingCached)));
    }

    let report = engine.search(request).await.context("search failed")?;

    let errors: Vec<Value> = report
        .indexer_errors
        .iter()
        .map(|err| {
            json!({
                "indexer": err.indexer_id,
                "language": err.language,
                "error": err.cause.to_string(),
            })
        })
        .collect();
    let (status, streams) = match &report.response {
        StreamResponse::Streams(streams) => ("streams", streams.as_slice()),
        StreamResponse::AuthRequired(notice) => {
            ("auth_required", std::slice::from_ref(notice))
        }
        StreamResponse::NoResults => ("no_results", &[][..]),
    };

    Ok(json!({
        "status": status,
        "source": format!("{:?}", report.source).to_lowercase(),
        "candidates_found": report.candidates_found,
        "candidates_kept": report.candidates_kept,
        "check_failures": report.check_failures,
        "dropped_unavailable": report.dropped_unavailable,
        "indexer_errors": errors,
        "streams": streams,
    }))
}

fn parse_title(raw: &str) -> Result<LocalizedTitle, String> {
    let (language, title) = match raw.split_once('=') {
        Some((tag, title)) => {
            (Language::from_tag(tag).map_err(|e| e.to_string())?, title)
        }
        None => (Language::En, raw),
    };
    let title = title.trim();
    if title.is_empty() {
        return Err("title must not be empty".to_string());
    }
    Ok(LocalizedTitle::new(language, title))
}

fn parse_filter(raw: &str) -> Result<RawFilterConfig, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid filter JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_default_to_english() {
        assert_eq!(
            parse_title("The Matrix").unwrap(),
            LocalizedTitle::new(Language::En, "The Matrix")
        );
        assert_eq!(
            parse_title("fr-FR=La Matrice").unwrap(),
            LocalizedTitle::new(Language::Fr, "La Matrice")
        );
        assert!(parse_title("xx=Nope").is_err());
        assert!(parse_title("en= ").is_err());
    }

    #[test]
    fn filter_json_uses_wire_names() {
        let filter =
            parse_filter(r#"{"sort":"sizeDesc","resultsPerQuality":2}"#).unwrap();
        assert_eq!(filter.sort.as_deref(), Some("sizeDesc"));
        assert_eq!(filter.results_per_quality, Some(2));
        assert!(parse_filter("{").is_err());
    }

    #[test]
    fn series_search_requires_markers() {
        let err = Cli::try_parse_from([
            "torrexctl", "search", "--kind", "series", "--title", "Show",
            "--imdb", "tt1",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "torrexctl", "search", "--kind", "series", "--title", "Show",
            "--imdb", "tt1", "--season", "1", "--episode", "2",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Search(_)));
    }
}
