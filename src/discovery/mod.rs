//! Bulk discovery of title identifiers by release year.
//!
//! Discovery only seeds identifier-only title rows; everything else is filled
//! in later by enrichment.

mod search_api;

pub use search_api::SearchApiClient;

use crate::movie_store::{DiscoveredTitle, MovieStore};
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub titles: Vec<DiscoveredTitle>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// A paginated title search, one release year at a time.
pub trait TitleSearchSource {
    /// `cursor` is `None` for the first page of a year.
    fn search_page(&self, year: i32, cursor: Option<&str>) -> Result<SearchPage>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub years: usize,
    pub pages: usize,
    pub titles_seen: usize,
    /// Titles that were not in the store yet.
    pub titles_inserted: usize,
}

/// Crawl every year in `start_year..=end_year` and seed the results into `store`.
pub fn discover_titles(
    source: &dyn TitleSearchSource,
    store: &dyn MovieStore,
    start_year: i32,
    end_year: i32,
) -> Result<DiscoveryReport> {
    let mut report = DiscoveryReport::default();

    for year in start_year..=end_year {
        report.years += 1;
        let mut cursor: Option<String> = None;
        let mut year_titles = 0;

        loop {
            let page = source
                .search_page(year, cursor.as_deref())
                .with_context(|| format!("Title search failed for year {}", year))?;
            report.pages += 1;

            if page.titles.is_empty() {
                break;
            }

            year_titles += page.titles.len();
            report.titles_seen += page.titles.len();
            report.titles_inserted += store.seed_titles(&page.titles)?;
            debug!(
                "Year {}: page {} with {} titles",
                year,
                report.pages,
                page.titles.len()
            );

            match page.end_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => break,
            }
        }

        info!("Discovered {} titles released in {}", year_titles, year);
    }

    if report.titles_seen == 0 {
        warn!(
            "Discovery found no titles between {} and {}",
            start_year, end_year
        );
    } else {
        info!(
            "Discovery finished: {} titles seen, {} new, {} pages over {} years",
            report.titles_seen, report.titles_inserted, report.pages, report.years
        );
    }

    Ok(report)
}
