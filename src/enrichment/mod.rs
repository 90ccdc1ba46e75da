//! Incremental enrichment of discovered titles.
//!
//! ## One run
//!
//! ```text
//! select pending batch → worker pool (fetch detail → stage → merge) → flush → report
//! ```
//!
//! A title is pending while no role references it and it was never merged.
//! Failed titles stay pending and are picked up again by a later run.

mod pool;
mod retry_policy;
mod runner;

pub use pool::{stage_enrichment, EnrichmentPool, PoolTally};
pub use retry_policy::RetryPolicy;
pub use runner::{EnrichmentRunner, RunReport};
