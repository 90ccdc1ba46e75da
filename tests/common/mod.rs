//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.

mod constants;
mod fakes;
mod fixtures;

pub use constants::*;
pub use fakes::{ScriptedFetcher, SlowFetcher};
#[allow(unused_imports)]
pub use fixtures::{cast, create_seeded_store, detail_with_cast, run_settings};
