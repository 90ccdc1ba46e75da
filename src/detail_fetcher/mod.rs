//! Per-title detail lookup against an external movie database.
//!
//! The enrichment pool only sees the [`DetailFetcher`] trait; [`HttpDetailFetcher`]
//! is the production adapter.

mod error;
mod http;
mod models;
mod role_label;

pub use error::FetchError;
pub use http::HttpDetailFetcher;
pub use models::{CastEntry, TitleDetail};
pub use role_label::coerce_role_label;

/// Stateless adapter returning the detail record of one title.
///
/// Implementations block the calling worker for the duration of the lookup.
pub trait DetailFetcher: Send + Sync {
    fn fetch_detail(&self, title_id: &str) -> Result<TitleDetail, FetchError>;
}
