//! Data models for the movie database.

use serde::{Deserialize, Serialize};

/// A discovered movie. Only `id` is guaranteed; everything else is filled in by enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub id: String,
    pub title: Option<String>,
    /// Comma separated genre list.
    pub genre: Option<String>,
    pub year: Option<i32>,
    /// Comma separated director names.
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    /// Runtime in minutes.
    pub runtime: Option<f64>,
    /// Unix timestamp of the last successful enrichment merge.
    pub enriched_at: Option<i64>,
}

/// A unique cast or crew member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
}

/// One appearance of a person in a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: i64,
    pub person_id: String,
    pub title_id: String,
    pub role_label: String,
    /// 1-based billing order within the title's cast list.
    pub position: u32,
}

/// A title as emitted by bulk discovery, before any enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTitle {
    pub id: String,
    pub title: String,
}

/// Metadata columns written onto an existing title row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleMetadata {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    pub runtime: Option<f64>,
}

/// A role waiting to be inserted for the title being merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRole {
    pub person_id: String,
    pub role_label: String,
    pub position: u32,
}

/// Everything a worker writes for one title, applied as a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleEnrichment {
    pub title_id: String,
    pub metadata: TitleMetadata,
    /// Persons that were absent when the worker checked. Another worker may
    /// have inserted some of them since.
    pub new_persons: Vec<Person>,
    pub roles: Vec<StagedRole>,
}

/// Result of writing a staged person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonWrite {
    Inserted,
    /// The primary key was already taken, usually by a concurrent worker.
    AlreadyPresent,
}

/// Rows actually written by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub persons_inserted: usize,
    pub roles_inserted: usize,
}

/// Summary statistics for the movie database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub titles: usize,
    pub enriched_titles: usize,
    pub pending_titles: usize,
    pub persons: usize,
    pub roles: usize,
}
