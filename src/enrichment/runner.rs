//! Run coordinator: one batch per run, timed and summarized.

use super::pool::{EnrichmentPool, PoolTally};
use super::retry_policy::RetryPolicy;
use crate::config::EnrichmentSettings;
use crate::detail_fetcher::DetailFetcher;
use crate::movie_store::MovieStore;
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Outcome of one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Titles claimed by the selector.
    pub batch_size: usize,
    /// Titles whose merge committed.
    pub processed: usize,
    pub persons_inserted: usize,
    pub roles_inserted: usize,
    pub unavailable: usize,
    pub transient_failures: usize,
    pub invalid_responses: usize,
    pub merge_failures: usize,
    /// Titles whose processing panicked.
    pub panics: usize,
    /// Wall time of the pool phase only.
    pub elapsed: Duration,
}

impl RunReport {
    fn from_tally(batch_size: usize, tally: PoolTally, elapsed: Duration) -> Self {
        Self {
            batch_size,
            processed: tally.processed,
            persons_inserted: tally.persons_inserted,
            roles_inserted: tally.roles_inserted,
            unavailable: tally.unavailable,
            transient_failures: tally.transient_failures,
            invalid_responses: tally.invalid_responses,
            merge_failures: tally.merge_failures,
            panics: tally.panics,
            elapsed,
        }
    }

    pub fn failed(&self) -> usize {
        self.unavailable
            + self.transient_failures
            + self.invalid_responses
            + self.merge_failures
            + self.panics
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} titles processed in {:.2} min, {} persons and {} roles inserted, \
             {} unavailable, {} transient, {} invalid, {} merge failures, {} panics",
            self.processed,
            self.batch_size,
            self.elapsed.as_secs_f64() / 60.0,
            self.persons_inserted,
            self.roles_inserted,
            self.unavailable,
            self.transient_failures,
            self.invalid_responses,
            self.merge_failures,
            self.panics
        )
    }
}

pub struct EnrichmentRunner {
    store: Arc<dyn MovieStore>,
    fetcher: Arc<dyn DetailFetcher>,
    settings: EnrichmentSettings,
    retry: RetryPolicy,
}

impl EnrichmentRunner {
    pub fn new(
        store: Arc<dyn MovieStore>,
        fetcher: Arc<dyn DetailFetcher>,
        settings: EnrichmentSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            fetcher,
            settings,
            retry,
        }
    }

    /// Select one batch of pending titles, enrich it and flush the store.
    ///
    /// Only a failure to select the batch is returned as an error. Per-title
    /// failures end up in the report and leave those titles pending.
    pub fn run_once(&self) -> Result<RunReport> {
        let batch = self
            .store
            .get_pending_title_ids(self.settings.batch_size)
            .context("Failed to select pending titles")?;

        info!(
            "Enriching {} pending titles with {} workers",
            batch.len(),
            self.settings.workers
        );

        let pool = EnrichmentPool::new(
            self.store.as_ref(),
            self.fetcher.as_ref(),
            &self.retry,
            self.settings.workers,
        );
        let start = Instant::now();
        let tally = pool.drain(&batch);
        let report = RunReport::from_tally(batch.len(), tally, start.elapsed());

        if let Err(e) = self.store.flush() {
            error!("Failed to flush movie store: {:#}", e);
        }

        info!("Enrichment run finished: {}", report);
        Ok(report)
    }

    /// Repeat [`Self::run_once`] until nothing is pending, a run makes no
    /// progress, or `max_runs` runs were made.
    pub fn run_until_drained(&self, max_runs: usize) -> Result<Vec<RunReport>> {
        let mut reports = Vec::new();
        while reports.len() < max_runs {
            let report = self.run_once()?;
            let batch_size = report.batch_size;
            let processed = report.processed;
            reports.push(report);

            if batch_size == 0 {
                info!("No pending titles left");
                break;
            }
            if processed == 0 {
                warn!(
                    "Run processed none of its {} titles, stopping to avoid retrying them forever",
                    batch_size
                );
                break;
            }
        }
        Ok(reports)
    }
}
