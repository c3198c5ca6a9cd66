use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use torrex_core::EngineConfig;
use url::Url;

const DEFAULT_CONFIG_LOCATIONS: &[&str] =
    &["torrex.toml", "config/torrex.toml"];

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file {} does not exist", path.display())]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("invalid URL for {field}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

/// Values read from the process environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub jackett_host: Option<String>,
    pub jackett_api_key: Option<String>,
    pub disable_identity_search: Option<String>,
    pub indexer_timeout_ms: Option<String>,
    pub cache_url: Option<String>,
    pub playback_host: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            config_path: get("TORREX_CONFIG").map(PathBuf::from),
            jackett_host: get("JACKETT_HOST"),
            jackett_api_key: get("JACKETT_API_KEY"),
            disable_identity_search: get("DISABLE_JACKETT_IMDB_SEARCH"),
            indexer_timeout_ms: get("TORREX_INDEXER_TIMEOUT_MS"),
            cache_url: get("TORREX_CACHE_URL"),
            playback_host: get("TORREX_PLAYBACK_HOST"),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: EngineConfig,
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
    pub warnings: Vec<String>,
}

/// Layers `.env`, an optional TOML file and environment overrides into an
/// [`EngineConfig`].
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => tolerate_missing(dotenvy::from_path(path))?,
            None => tolerate_missing(dotenvy::dotenv())?,
        };
        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Same as [`ConfigLoader::load`] without touching `.env` or the
    /// process environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (config, config_path) = self.load_file_config(&env)?;
        let mut warnings = Vec::new();
        if config_path.is_none() {
            warnings.push(
                "no torrex.toml found; using defaults and environment".to_string(),
            );
        }

        let config = apply_env(config.unwrap_or_default(), &env)?;
        validate(&config, &mut warnings)?;

        Ok(ConfigLoad {
            config,
            config_path,
            env_file_loaded: false,
            warnings,
        })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<EngineConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let config = read_toml(&path)?;
        Ok((Some(config), Some(path)))
    }
}

fn tolerate_missing<T>(
    result: Result<T, dotenvy::Error>,
) -> Result<bool, ConfigLoadError> {
    match result {
        Ok(_) => Ok(true),
        Err(dotenvy::Error::Io(_)) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn read_toml(path: &Path) -> Result<EngineConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env(
    mut config: EngineConfig,
    env: &EnvConfig,
) -> Result<EngineConfig, ConfigLoadError> {
    if let Some(host) = &env.jackett_host {
        config.torznab.base_url = host.clone();
    }
    if let Some(key) = &env.jackett_api_key {
        config.torznab.api_key = key.clone();
    }
    if let Some(raw) = &env.disable_identity_search {
        config.torznab.disable_identity_search =
            parse_bool(raw).ok_or_else(|| ConfigLoadError::InvalidEnv {
                key: "DISABLE_JACKETT_IMDB_SEARCH",
                value: raw.clone(),
            })?;
    }
    if let Some(raw) = &env.indexer_timeout_ms {
        config.fanout.indexer_timeout_ms =
            raw.trim().parse().map_err(|_| ConfigLoadError::InvalidEnv {
                key: "TORREX_INDEXER_TIMEOUT_MS",
                value: raw.clone(),
            })?;
    }
    if let Some(url) = &env.cache_url {
        config.cache.enabled = true;
        config.cache.url = Some(url.clone());
    }
    if let Some(host) = &env.playback_host {
        config.assembler.playback_host = host.clone();
    }
    Ok(config)
}

fn validate(
    config: &EngineConfig,
    warnings: &mut Vec<String>,
) -> Result<(), ConfigLoadError> {
    Url::parse(&config.torznab.base_url).map_err(|source| {
        ConfigLoadError::InvalidUrl {
            field: "torznab.base_url",
            source,
        }
    })?;
    Url::parse(&config.assembler.playback_host).map_err(|source| {
        ConfigLoadError::InvalidUrl {
            field: "assembler.playback_host",
            source,
        }
    })?;
    if let Some(url) = config.cache.active_url() {
        Url::parse(url).map_err(|source| ConfigLoadError::InvalidUrl {
            field: "cache.url",
            source,
        })?;
    } else if config.cache.enabled {
        warnings.push("cache enabled without a url; cache disabled".to_string());
    }

    if config.fanout.indexer_timeout_ms == 0 {
        return Err(ConfigLoadError::Zero {
            field: "fanout.indexer_timeout_ms",
        });
    }
    if config.torznab.request_timeout_ms == 0 {
        return Err(ConfigLoadError::Zero {
            field: "torznab.request_timeout_ms",
        });
    }
    if config.assembler.max_parallel_checks == 0 {
        return Err(ConfigLoadError::Zero {
            field: "assembler.max_parallel_checks",
        });
    }
    if config.cache.enabled && config.cache.timeout_ms == 0 {
        return Err(ConfigLoadError::Zero {
            field: "cache.timeout_ms",
        });
    }
    if config.torznab.api_key.is_empty() {
        warnings.push("JACKETT_API_KEY is not set".to_string());
    }
    if config.assembler.config_token.trim().is_empty() {
        warnings.push(
            "assembler.config_token is empty; playback links will carry an empty segment"
                .to_string(),
        );
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use torrex_core::TorznabConfig;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|key| map.get(key).cloned())
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torrex.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn file_values_are_overridden_by_environment() {
        let (_dir, path) = write_config(
            r#"
            [torznab]
            base_url = "http://jackett:9117"
            api_key = "from-file"

            [fanout]
            indexer_timeout_ms = 4000

            [assembler]
            config_token = "cfg"
            "#,
        );
        let load = ConfigLoader::new()
            .with_config_path(&path)
            .load_with_env(env(&[
                ("JACKETT_API_KEY", "from-env"),
                ("DISABLE_JACKETT_IMDB_SEARCH", "true"),
            ]))
            .unwrap();

        assert_eq!(load.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(load.config.torznab.base_url, "http://jackett:9117");
        assert_eq!(load.config.torznab.api_key, "from-env");
        assert!(load.config.torznab.disable_identity_search);
        assert_eq!(
            load.config.fanout.indexer_timeout(),
            Duration::from_secs(4)
        );
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn cache_url_in_environment_enables_cache() {
        let (_dir, path) = write_config("");
        let load = ConfigLoader::new()
            .with_config_path(&path)
            .load_with_env(env(&[
                ("JACKETT_API_KEY", "k"),
                ("TORREX_CACHE_URL", "http://cache:3000/"),
            ]))
            .unwrap();
        assert_eq!(load.config.cache.active_url(), Some("http://cache:3000/"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new()
            .with_config_path(dir.path().join("absent.toml"))
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn env_config_path_is_used_when_no_flag_given() {
        let (_dir, path) = write_config("[assembler]\nconfig_token = \"abc\"\n");
        let path_str = path.to_string_lossy().into_owned();
        let load = ConfigLoader::new()
            .load_with_env(env(&[("TORREX_CONFIG", &path_str)]))
            .unwrap();
        assert_eq!(load.config.assembler.config_token, "abc");
    }

    #[test]
    fn malformed_toml_reports_path() {
        let (_dir, path) = write_config("[torznab\nbase_url = 1");
        let err = ConfigLoader::new()
            .with_config_path(&path)
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        match err {
            ConfigLoadError::Parse { path: reported, .. } => {
                assert_eq!(reported, path)
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let (_dir, path) = write_config("");
        let loader = ConfigLoader::new().with_config_path(&path);

        let err = loader
            .load_with_env(env(&[("TORREX_INDEXER_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnv {
                key: "TORREX_INDEXER_TIMEOUT_MS",
                ..
            }
        ));

        let err = loader
            .load_with_env(env(&[("TORREX_INDEXER_TIMEOUT_MS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Zero { .. }));

        let err = loader
            .load_with_env(env(&[("JACKETT_HOST", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidUrl { .. }));
    }

    #[test]
    fn missing_api_key_only_warns() {
        let (_dir, path) = write_config("");
        let load = ConfigLoader::new()
            .with_config_path(&path)
            .load_with_env(EnvConfig::default())
            .unwrap();
        assert_eq!(load.config.torznab, TorznabConfig::default());
        assert!(load.warnings.iter().any(|w| w.contains("JACKETT_API_KEY")));
    }

    #[test]
    fn empty_config_token_only_warns() {
        let (_dir, path) = write_config("");
        let load = ConfigLoader::new()
            .with_config_path(&path)
            .load_with_env(env(&[("JACKETT_API_KEY", "k")]))
            .unwrap();
        assert_eq!(load.warnings.len(), 1);
        assert!(load.warnings[0].contains("config_token"));

        let (_dir, path) = write_config("[assembler]\nconfig_token = \"abc\"\n");
        let load = ConfigLoader::new()
            .with_config_path(&path)
            .load_with_env(env(&[("JACKETT_API_KEY", "k")]))
            .unwrap();
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn enabled_cache_needs_a_timeout() {
        let (_dir, path) = write_config(
            "[cache]\nenabled = true\nurl = \"http://cache/\"\ntimeout_ms = 0\n",
        );
        let err = ConfigLoader::new()
            .with_config_path(&path)
            .load_with_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Zero {
                field: "cache.timeout_ms"
            }
        ));
    }
}
