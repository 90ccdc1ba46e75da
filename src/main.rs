use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movie_catalog_enricher::config::{self, AppConfig, CliConfig, FileConfig, RetrySettings};
use movie_catalog_enricher::discovery::{discover_titles, SearchApiClient};
use movie_catalog_enricher::export::export_roles_csv;
use movie_catalog_enricher::{
    EnrichmentRunner, HttpDetailFetcher, MovieStore, RetryPolicy, SqliteMovieStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(version, about = "Discover and enrich a local movie database")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite movie database file.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Maximum number of pending titles enriched per run.
    #[clap(long, global = true, default_value_t = config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of enrichment worker threads.
    #[clap(long, global = true, default_value_t = config::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Base URL of the title detail API.
    #[clap(long, global = true)]
    pub detail_api_url: Option<String>,

    /// API key sent to the title detail API.
    #[clap(long, global = true)]
    pub detail_api_key: Option<String>,

    /// RapidAPI key for the title search API.
    #[clap(long, global = true)]
    pub search_api_key: Option<String>,

    /// Retries for a detail lookup that failed transiently. 0 disables retrying.
    #[clap(long, global = true, default_value_t = RetrySettings::default().max_retries)]
    pub max_retries: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the database with titles released in a range of years.
    Discover {
        #[clap(long)]
        start_year: i32,
        #[clap(long)]
        end_year: i32,
    },

    /// Enrich one batch of pending titles with metadata and cast.
    Enrich {
        /// Keep running batches until nothing is pending.
        #[clap(long)]
        until_drained: bool,

        /// Upper bound on batches when running until drained.
        #[clap(long, default_value_t = 100)]
        max_runs: usize,
    },

    /// Write every role joined with its person and title to a CSV file.
    Export {
        #[clap(long, short, value_parser = parse_path)]
        output: PathBuf,
    },

    /// Show row counts of the database.
    Stats,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db.clone(),
            batch_size: self.batch_size,
            workers: self.workers,
            detail_api_url: self.detail_api_url.clone(),
            detail_api_key: self.detail_api_key.clone(),
            search_api_key: self.search_api_key.clone(),
            max_retries: self.max_retries,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    match cli_args.command {
        Command::Discover {
            start_year,
            end_year,
        } => {
            let search_settings = app_config.search_api.clone().context(
                "Discovery needs a search API key (--search-api-key or [search_api] in config)",
            )?;
            let store = SqliteMovieStore::new(&app_config.db_path)?;
            let client = SearchApiClient::new(search_settings)?;
            let report = discover_titles(&client, &store, start_year, end_year)?;
            store.flush()?;
            println!(
                "{} titles found, {} new",
                report.titles_seen, report.titles_inserted
            );
        }
        Command::Enrich {
            until_drained,
            max_runs,
        } => {
            let detail_settings = app_config.detail_api.as_ref().context(
                "Enrichment needs a detail API URL (--detail-api-url or [detail_api] in config)",
            )?;
            let store = Arc::new(SqliteMovieStore::new(&app_config.db_path)?);
            let fetcher = Arc::new(HttpDetailFetcher::new(detail_settings)?);
            let runner = EnrichmentRunner::new(
                store,
                fetcher,
                app_config.enrichment.clone(),
                RetryPolicy::new(&app_config.retry),
            );

            let reports = if until_drained {
                runner.run_until_drained(max_runs)?
            } else {
                vec![runner.run_once()?]
            };
            for report in &reports {
                println!("{}", report);
            }
        }
        Command::Export { output } => {
            let rows = export_roles_csv(&app_config.db_path, &output)?;
            println!("{} roles written to {}", rows, output.display());
        }
        Command::Stats => {
            let store = SqliteMovieStore::new(&app_config.db_path)?;
            let stats = store.get_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
