//! MovieStore trait definition.

use super::models::{
    DiscoveredTitle, MergeOutcome, Person, Role, StoreStats, Title, TitleEnrichment,
};
use anyhow::Result;

/// Trait for movie storage backends.
///
/// Implementations are shared by every enrichment worker, so all methods take `&self`.
pub trait MovieStore: Send + Sync {
    // =========================================================================
    // Titles
    // =========================================================================

    /// Insert identifier-only title rows. Existing rows are left untouched.
    /// Returns how many rows were actually inserted.
    fn seed_titles(&self, titles: &[DiscoveredTitle]) -> Result<usize>;

    /// Get a title by ID.
    fn get_title(&self, title_id: &str) -> Result<Option<Title>>;

    /// Get up to `limit` title IDs that no role references and that were never
    /// merged. Natural scan order, no ordering guarantee.
    fn get_pending_title_ids(&self, limit: usize) -> Result<Vec<String>>;

    // =========================================================================
    // Persons and roles
    // =========================================================================

    /// Check whether a person row exists. Not synchronized with concurrent merges.
    fn person_exists(&self, person_id: &str) -> Result<bool>;

    /// Get a person by ID.
    fn get_person(&self, person_id: &str) -> Result<Option<Person>>;

    /// Get the roles of a title ordered by position.
    fn get_roles_for_title(&self, title_id: &str) -> Result<Vec<Role>>;

    // =========================================================================
    // Merge
    // =========================================================================

    /// Write a title's metadata, its staged persons and its roles in one transaction.
    ///
    /// A staged person whose ID is already taken is skipped, not an error.
    /// Fails if the title row does not exist.
    fn apply_enrichment(&self, enrichment: &TitleEnrichment) -> Result<MergeOutcome>;

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Get summary statistics for the movie database.
    fn get_stats(&self) -> Result<StoreStats>;

    /// Make every committed write durable in the main database file.
    fn flush(&self) -> Result<()>;
}
