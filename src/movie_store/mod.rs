mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    DiscoveredTitle, MergeOutcome, Person, PersonWrite, Role, StagedRole, StoreStats, Title,
    TitleEnrichment, TitleMetadata,
};
pub use schema::MOVIE_VERSIONED_SCHEMAS;
pub use store::SqliteMovieStore;
pub use trait_def::MovieStore;
