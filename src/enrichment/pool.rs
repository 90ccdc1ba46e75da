//! Fixed-size worker pool draining one batch of title IDs.
//!
//! Workers claim IDs from a shared cursor, so every ID is handled exactly once
//! per batch. Each worker keeps its own tally; tallies are summed after join.

use super::retry_policy::RetryPolicy;
use crate::detail_fetcher::{DetailFetcher, FetchError, TitleDetail};
use crate::movie_store::{MovieStore, Person, StagedRole, TitleEnrichment, TitleMetadata};
use anyhow::Result;
use std::collections::HashSet;
use std::ops::AddAssign;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, error, warn};

/// Per-item counters accumulated by the workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolTally {
    /// Titles whose merge committed.
    pub processed: usize,
    pub persons_inserted: usize,
    pub roles_inserted: usize,
    pub unavailable: usize,
    /// Transient failures that outlived the retry policy.
    pub transient_failures: usize,
    pub invalid_responses: usize,
    pub merge_failures: usize,
    /// Titles whose processing panicked.
    pub panics: usize,
}

impl PoolTally {
    fn record_fetch_failure(&mut self, error: &FetchError) {
        match error {
            FetchError::DetailUnavailable(_) => self.unavailable += 1,
            FetchError::TransientFetchError(_) => self.transient_failures += 1,
            FetchError::InvalidResponse(_) => self.invalid_responses += 1,
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

impl AddAssign for PoolTally {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.persons_inserted += other.persons_inserted;
        self.roles_inserted += other.roles_inserted;
        self.unavailable += other.unavailable;
        self.transient_failures += other.transient_failures;
        self.invalid_responses += other.invalid_responses;
        self.merge_failures += other.merge_failures;
        self.panics += other.panics;
    }
}

/// Turn a fetched detail record into the rows to merge for `title_id`.
///
/// Positions follow cast order starting at 1. A person is staged for insertion
/// only if the store does not know it yet and it was not already staged for
/// this title; the check is advisory, the merge absorbs any later conflict.
pub fn stage_enrichment(
    store: &dyn MovieStore,
    title_id: &str,
    detail: TitleDetail,
) -> Result<TitleEnrichment> {
    let metadata = TitleMetadata {
        title: detail.title,
        genre: join_non_empty(&detail.genres),
        year: detail.year,
        director: join_non_empty(&detail.directors),
        rating: detail.rating,
        votes: detail.votes,
        runtime: detail.runtime,
    };

    let mut seen = HashSet::new();
    let mut new_persons = Vec::new();
    let mut roles = Vec::with_capacity(detail.cast.len());

    for (index, entry) in detail.cast.into_iter().enumerate() {
        if seen.insert(entry.person_id.clone()) && !store.person_exists(&entry.person_id)? {
            new_persons.push(Person {
                id: entry.person_id.clone(),
                name: entry.name,
            });
        }
        roles.push(StagedRole {
            person_id: entry.person_id,
            role_label: entry.role,
            position: index as u32 + 1,
        });
    }

    Ok(TitleEnrichment {
        title_id: title_id.to_string(),
        metadata,
        new_persons,
        roles,
    })
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = cause.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown cause"
    }
}

fn join_non_empty(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

pub struct EnrichmentPool<'a> {
    store: &'a dyn MovieStore,
    fetcher: &'a dyn DetailFetcher,
    retry: &'a RetryPolicy,
    workers: usize,
}

impl<'a> EnrichmentPool<'a> {
    pub fn new(
        store: &'a dyn MovieStore,
        fetcher: &'a dyn DetailFetcher,
        retry: &'a RetryPolicy,
        workers: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            retry,
            workers: workers.max(1),
        }
    }

    /// Process every ID of `batch` and return once all workers are done.
    pub fn drain(&self, batch: &[String]) -> PoolTally {
        let cursor = AtomicUsize::new(0);
        let worker_count = self.workers.min(batch.len());

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(worker_count);
            for index in 0..worker_count {
                let cursor = &cursor;
                let spawned = thread::Builder::new()
                    .name(format!("enrich-worker-{}", index))
                    .spawn_scoped(scope, move || self.worker_loop(cursor, batch));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => error!("Failed to spawn enrichment worker {}: {}", index, e),
                }
            }

            let mut total = PoolTally::default();
            if handles.is_empty() && worker_count > 0 {
                warn!("No enrichment worker could be spawned, processing batch inline");
                total += self.worker_loop(&cursor, batch);
            }
            for handle in handles {
                match handle.join() {
                    Ok(tally) => total += tally,
                    Err(_) => error!("Enrichment worker panicked, its counters are lost"),
                }
            }
            total
        })
    }

    fn worker_loop(&self, cursor: &AtomicUsize, batch: &[String]) -> PoolTally {
        let mut tally = PoolTally::default();
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(title_id) = batch.get(index) else {
                break;
            };
            // A panic is confined to the title being processed; counters for
            // earlier titles stay in `tally`.
            let mut item_tally = PoolTally::default();
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| self.enrich_title(title_id, &mut item_tally)));
            match outcome {
                Ok(()) => tally += item_tally,
                Err(cause) => {
                    warn!(
                        "Enrichment of {} panicked: {}",
                        title_id,
                        panic_message(cause.as_ref())
                    );
                    tally.panics += 1;
                }
            }
        }
        tally
    }

    fn enrich_title(&self, title_id: &str, tally: &mut PoolTally) {
        let detail = match self.fetch_with_retry(title_id) {
            Ok(detail) => detail,
            Err(e) => {
                warn!("Detail fetch failed for {} ({}): {}", title_id, e.as_str(), e);
                tally.record_fetch_failure(&e);
                return;
            }
        };

        let enrichment = match stage_enrichment(self.store, title_id, detail) {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("Failed to stage enrichment for {}: {:#}", title_id, e);
                tally.merge_failures += 1;
                return;
            }
        };

        match self.store.apply_enrichment(&enrichment) {
            Ok(outcome) => {
                debug!(
                    "Merged {}: {} new persons, {} roles",
                    title_id, outcome.persons_inserted, outcome.roles_inserted
                );
                tally.processed += 1;
                tally.persons_inserted += outcome.persons_inserted;
                tally.roles_inserted += outcome.roles_inserted;
            }
            Err(e) => {
                warn!("Failed to merge enrichment for {}: {:#}", title_id, e);
                tally.merge_failures += 1;
            }
        }
    }

    fn fetch_with_retry(&self, title_id: &str) -> Result<TitleDetail, FetchError> {
        let mut retry_count = 0;
        loop {
            match self.fetcher.fetch_detail(title_id) {
                Ok(detail) => return Ok(detail),
                Err(e) if self.retry.should_retry(&e, retry_count) => {
                    let delay = self.retry.backoff(retry_count);
                    debug!(
                        "Retrying {} in {:?} after transient failure: {}",
                        title_id, delay, e
                    );
                    thread::sleep(delay);
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
