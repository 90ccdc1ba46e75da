//! SQLite schema definitions for the movie database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const TITLES_TABLE: Table = Table {
    name: "titles",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("director", &SqlType::Text),
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("votes", &SqlType::Integer),
        sqlite_column!("runtime", &SqlType::Real), // minutes
        sqlite_column!("enriched_at", &SqlType::Integer),
    ],
    indices: &[],
    unique_constraints: &[],
};

const PERSONS_TABLE: Table = Table {
    name: "persons",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const PERSON_FK: ForeignKey = ForeignKey {
    foreign_table: "persons",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Restrict,
};

const TITLE_FK: ForeignKey = ForeignKey {
    foreign_table: "titles",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ROLES_TABLE: Table = Table {
    name: "roles",
    columns: &[
        // INTEGER PRIMARY KEY aliases the rowid, so SQLite assigns it.
        sqlite_column!("role_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "person_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&PERSON_FK)
        ),
        sqlite_column!(
            "title_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TITLE_FK)
        ),
        sqlite_column!("role_label", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_roles_title_id", "title_id"),
        ("idx_roles_person_id", "person_id"),
    ],
    unique_constraints: &[&["title_id", "position"]],
};

pub const MOVIE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[TITLES_TABLE, PERSONS_TABLE, ROLES_TABLE],
}];
