//! Store and detail fixtures.

use movie_catalog_enricher::config::EnrichmentSettings;
use movie_catalog_enricher::detail_fetcher::{CastEntry, TitleDetail};
use movie_catalog_enricher::movie_store::{DiscoveredTitle, MovieStore, SqliteMovieStore};
use std::sync::Arc;
use tempfile::TempDir;

/// A fresh store in a temp dir seeded with identifier-only titles.
/// The `TempDir` must outlive the store.
pub fn create_seeded_store(title_ids: &[&str]) -> (Arc<SqliteMovieStore>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteMovieStore::new(temp_dir.path().join("movies.db"))
        .expect("Failed to create movie store");
    let titles: Vec<DiscoveredTitle> = title_ids
        .iter()
        .map(|id| DiscoveredTitle {
            id: id.to_string(),
            title: String::new(),
        })
        .collect();
    store.seed_titles(&titles).expect("Failed to seed titles");
    (Arc::new(store), temp_dir)
}

pub fn cast(entries: &[(&str, &str, &str)]) -> Vec<CastEntry> {
    entries
        .iter()
        .map(|(id, name, role)| CastEntry::new(*id, *name, *role))
        .collect()
}

pub fn detail_with_cast(title: &str, cast: Vec<CastEntry>) -> TitleDetail {
    TitleDetail {
        title: Some(title.to_string()),
        year: Some(1999),
        genres: vec!["Drama".to_string()],
        directors: vec!["Some Director".to_string()],
        rating: Some(7.1),
        votes: Some(4200),
        runtime: Some(101.0),
        cast,
    }
}

pub fn run_settings(batch_size: usize, workers: usize) -> EnrichmentSettings {
    EnrichmentSettings {
        batch_size,
        workers,
    }
}
