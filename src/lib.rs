//! Movie Catalog Enricher Library
//!
//! Discovers movie titles, enriches them with cast and metadata from a detail
//! API, and exports the resulting role join.

pub mod config;
pub mod detail_fetcher;
pub mod discovery;
pub mod enrichment;
pub mod export;
pub mod movie_store;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use detail_fetcher::{DetailFetcher, FetchError, HttpDetailFetcher};
pub use enrichment::{EnrichmentRunner, RetryPolicy, RunReport};
pub use movie_store::{MovieStore, SqliteMovieStore};
