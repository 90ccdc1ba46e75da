//! Shared constants for end-to-end tests

// ============================================================================
// Title IDs
// ============================================================================

pub const TITLE_1_ID: &str = "tt001";
pub const TITLE_2_ID: &str = "tt002";
/// Has no detail record upstream.
pub const TITLE_MISSING_ID: &str = "tt003";

// ============================================================================
// Person IDs
// ============================================================================

pub const PERSON_1_ID: &str = "p1";
pub const PERSON_2_ID: &str = "p2";
