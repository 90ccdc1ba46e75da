mod file_config;

pub use file_config::{DetailApiConfig, FileConfig, RetryConfig, SearchApiConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_SEARCH_API_URL: &str = "https://imdb8.p.rapidapi.com/v2/search-advance";
pub const DEFAULT_SEARCH_API_HOST: &str = "imdb8.p.rapidapi.com";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub batch_size: usize,
    pub workers: usize,
    pub detail_api_url: Option<String>,
    pub detail_api_key: Option<String>,
    pub search_api_key: Option<String>,
    pub max_retries: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            detail_api_url: None,
            detail_api_key: None,
            search_api_key: None,
            max_retries: RetrySettings::default().max_retries,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub enrichment: EnrichmentSettings,
    pub retry: RetrySettings,
    /// Present when a detail API base URL was configured.
    pub detail_api: Option<DetailApiSettings>,
    /// Present when a search API key was configured.
    pub search_api: Option<SearchApiSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSettings {
    /// Maximum number of pending titles claimed per run.
    pub batch_size: usize,
    /// Number of worker threads.
    pub workers: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailApiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// 0 disables throttling.
    pub min_request_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchApiSettings {
    pub url: String,
    pub host: String,
    pub api_key: String,
    pub page_size: u32,
    pub min_ratings_count: u32,
    pub language: String,
    pub title_type: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db or in config file")
            })?;

        let enrichment = EnrichmentSettings {
            batch_size: file.batch_size.unwrap_or(cli.batch_size),
            workers: file.workers.unwrap_or(cli.workers),
        };
        if enrichment.batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }
        if enrichment.workers == 0 {
            bail!("workers must be greater than 0");
        }

        let retry_file = file.retry.unwrap_or_default();
        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_retries: retry_file.max_retries.unwrap_or(cli.max_retries),
            initial_backoff_ms: retry_file
                .initial_backoff_ms
                .unwrap_or(retry_defaults.initial_backoff_ms),
            max_backoff_ms: retry_file
                .max_backoff_ms
                .unwrap_or(retry_defaults.max_backoff_ms),
            backoff_multiplier: retry_file
                .backoff_multiplier
                .unwrap_or(retry_defaults.backoff_multiplier),
        };
        if retry.backoff_multiplier < 1.0 {
            bail!("retry.backoff_multiplier must be at least 1.0");
        }

        let detail_file = file.detail_api.unwrap_or_default();
        let detail_api = detail_file
            .base_url
            .or_else(|| cli.detail_api_url.clone())
            .map(|base_url| DetailApiSettings {
                base_url,
                api_key: detail_file.api_key.or_else(|| cli.detail_api_key.clone()),
                timeout_secs: detail_file.timeout_secs.unwrap_or(30),
                min_request_interval_ms: detail_file.min_request_interval_ms.unwrap_or(0),
            });

        let search_file = file.search_api.unwrap_or_default();
        let search_api = search_file
            .api_key
            .or_else(|| cli.search_api_key.clone())
            .map(|api_key| SearchApiSettings {
                url: search_file
                    .url
                    .unwrap_or_else(|| DEFAULT_SEARCH_API_URL.to_string()),
                host: search_file
                    .host
                    .unwrap_or_else(|| DEFAULT_SEARCH_API_HOST.to_string()),
                api_key,
                page_size: search_file.page_size.unwrap_or(1000),
                min_ratings_count: search_file.min_ratings_count.unwrap_or(1000),
                language: search_file.language.unwrap_or_else(|| "en".to_string()),
                title_type: search_file.title_type.unwrap_or_else(|| "movie".to_string()),
            });

        Ok(Self {
            db_path,
            enrichment,
            retry,
            detail_api,
            search_api,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cli_with_db() -> CliConfig {
        CliConfig {
            db_path: Some(PathBuf::from("/tmp/movies.db")),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&cli_with_db(), None).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/movies.db"));
        assert_eq!(config.enrichment, EnrichmentSettings::default());
        assert_eq!(config.enrichment.batch_size, 200);
        assert_eq!(config.enrichment.workers, 5);
        assert_eq!(config.retry, RetrySettings::default());
        // Retrying is opt-in
        assert_eq!(config.retry.max_retries, 0);
        assert!(config.detail_api.is_none());
        assert!(config.search_api.is_none());
    }

    #[test]
    fn test_resolve_requires_db_path() {
        let err = AppConfig::resolve(&CliConfig::default(), None).unwrap_err();
        assert!(err.to_string().contains("db_path"));
    }

    #[test]
    fn test_resolve_rejects_zero_workers() {
        let cli = CliConfig {
            workers: 0,
            ..cli_with_db()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_file_overrides_cli() {
        let cli = CliConfig {
            detail_api_url: Some("http://cli-host".to_string()),
            detail_api_key: Some("cli-key".to_string()),
            ..cli_with_db()
        };
        let file = FileConfig {
            db_path: Some("/data/file.db".to_string()),
            workers: Some(8),
            detail_api: Some(DetailApiConfig {
                base_url: Some("http://file-host".to_string()),
                min_request_interval_ms: Some(250),
                ..Default::default()
            }),
            retry: Some(RetryConfig {
                max_retries: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/data/file.db"));
        assert_eq!(config.enrichment.workers, 8);
        assert_eq!(config.enrichment.batch_size, 200);
        assert_eq!(config.retry.max_retries, 0);

        let detail = config.detail_api.unwrap();
        assert_eq!(detail.base_url, "http://file-host");
        // Not set in the file, so the CLI value is kept
        assert_eq!(detail.api_key.as_deref(), Some("cli-key"));
        assert_eq!(detail.min_request_interval_ms, 250);
        assert_eq!(detail.timeout_secs, 30);
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
db_path = "/data/movies.db"
batch_size = 50

[search_api]
api_key = "secret"
page_size = 250

[retry]
initial_backoff_ms = 100
"#
        )
        .unwrap();

        let file_config = FileConfig::load(file.path()).unwrap();
        let config = AppConfig::resolve(&CliConfig::default(), Some(file_config)).unwrap();

        assert_eq!(config.enrichment.batch_size, 50);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        let search = config.search_api.unwrap();
        assert_eq!(search.api_key, "secret");
        assert_eq!(search.page_size, 250);
        assert_eq!(search.url, DEFAULT_SEARCH_API_URL);
        assert_eq!(search.host, DEFAULT_SEARCH_API_HOST);
        assert_eq!(search.language, "en");
    }
}
