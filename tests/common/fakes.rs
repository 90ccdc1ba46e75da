//! In-memory detail fetchers.

use movie_catalog_enricher::detail_fetcher::{CastEntry, DetailFetcher, FetchError, TitleDetail};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Answers from a fixed table; unknown IDs are unavailable.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, Result<TitleDetail, FetchError>>,
    panicking: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn with_detail(mut self, title_id: &str, detail: TitleDetail) -> Self {
        self.responses.insert(title_id.to_string(), Ok(detail));
        self
    }

    pub fn with_error(mut self, title_id: &str, error: FetchError) -> Self {
        self.responses.insert(title_id.to_string(), Err(error));
        self
    }

    /// Lookups of `title_id` panic instead of returning.
    pub fn with_panic(mut self, title_id: &str) -> Self {
        self.panicking.insert(title_id.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DetailFetcher for ScriptedFetcher {
    fn fetch_detail(&self, title_id: &str) -> Result<TitleDetail, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(title_id) {
            panic!("detail source crashed on {}", title_id);
        }
        self.responses
            .get(title_id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::DetailUnavailable(title_id.to_string())))
    }
}

/// Every title has the same cast; each lookup blocks for `delay` so that
/// workers overlap.
pub struct SlowFetcher {
    pub cast: Vec<CastEntry>,
    pub delay: Duration,
}

impl DetailFetcher for SlowFetcher {
    fn fetch_detail(&self, title_id: &str) -> Result<TitleDetail, FetchError> {
        thread::sleep(self.delay);
        Ok(TitleDetail {
            title: Some(format!("Movie {}", title_id)),
            cast: self.cast.clone(),
            ..Default::default()
        })
    }
}
