//! SQLite-backed movie store implementation.

use super::models::{
    DiscoveredTitle, MergeOutcome, Person, PersonWrite, Role, StoreStats, Title,
    TitleEnrichment,
};
use super::schema::MOVIE_VERSIONED_SCHEMAS;
use super::trait_def::MovieStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, CachedStatement, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const PENDING_TITLES_QUERY: &str = "SELECT titles.id FROM titles
     LEFT JOIN roles ON roles.title_id = titles.id
     WHERE roles.title_id IS NULL AND titles.enriched_at IS NULL
     LIMIT ?1";

/// SQLite-backed movie store.
///
/// Writes are serialized through a single connection; reads go through a
/// separate read-only connection so existence checks never wait on a merge.
#[derive(Clone)]
pub struct SqliteMovieStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

fn create_or_validate_schema(conn: &Connection) -> Result<()> {
    let latest_version = MOVIE_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &MOVIE_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating movie db schema at version {}", latest_version);
        return latest_schema.create(conn);
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let expected_version = (BASE_DB_VERSION + latest_version) as i64;
    if db_version != expected_version {
        bail!(
            "Movie db has schema version {}, expected {}",
            db_version,
            expected_version
        );
    }
    latest_schema
        .validate(conn)
        .context("Movie db schema does not match the expected layout")
}

impl SqliteMovieStore {
    /// Open (or create) the movie database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let write_conn = Connection::open_with_flags(
            db_path_ref,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open movie database")?;

        create_or_validate_schema(&write_conn)?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on movie write connection")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;
        write_conn.busy_timeout(BUSY_TIMEOUT)?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open movie database for reading")?;
        read_conn.busy_timeout(BUSY_TIMEOUT)?;

        let stats = Self::count_rows(&read_conn)?;
        info!(
            "Movie store ready: {} titles ({} enriched, {} pending), {} persons, {} roles",
            stats.titles, stats.enriched_titles, stats.pending_titles, stats.persons, stats.roles
        );

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
            db_path: db_path_ref.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn count_rows(conn: &Connection) -> Result<StoreStats> {
        let titles: usize = conn.query_row("SELECT COUNT(*) FROM titles", [], |r| r.get(0))?;
        let enriched_titles: usize = conn.query_row(
            "SELECT COUNT(*) FROM titles
             WHERE enriched_at IS NOT NULL
                OR EXISTS (SELECT 1 FROM roles WHERE roles.title_id = titles.id)",
            [],
            |r| r.get(0),
        )?;
        let persons: usize = conn.query_row("SELECT COUNT(*) FROM persons", [], |r| r.get(0))?;
        let roles: usize = conn.query_row("SELECT COUNT(*) FROM roles", [], |r| r.get(0))?;
        Ok(StoreStats {
            titles,
            enriched_titles,
            pending_titles: titles - enriched_titles,
            persons,
            roles,
        })
    }
}

/// Insert one staged person, absorbing a primary key collision.
fn insert_person(stmt: &mut CachedStatement<'_>, person: &Person) -> Result<PersonWrite> {
    let changed = stmt.execute(params![person.id, person.name])?;
    Ok(if changed == 0 {
        PersonWrite::AlreadyPresent
    } else {
        PersonWrite::Inserted
    })
}

impl MovieStore for SqliteMovieStore {
    fn seed_titles(&self, titles: &[DiscoveredTitle]) -> Result<usize> {
        let conn = self.write_conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO titles (id, title) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
            )?;
            for title in titles {
                inserted += stmt.execute(params![title.id, title.title])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn get_title(&self, title_id: &str) -> Result<Option<Title>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, genre, year, director, rating, votes, runtime, enriched_at
             FROM titles WHERE id = ?1",
        )?;
        let result = stmt
            .query_row(params![title_id], |row| {
                Ok(Title {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    genre: row.get(2)?,
                    year: row.get(3)?,
                    director: row.get(4)?,
                    rating: row.get(5)?,
                    votes: row.get(6)?,
                    runtime: row.get(7)?,
                    enriched_at: row.get(8)?,
                })
            })
            .optional()?;
        Ok(result)
    }

    fn get_pending_title_ids(&self, limit: usize) -> Result<Vec<String>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(PENDING_TITLES_QUERY)?;
        let ids = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    fn person_exists(&self, person_id: &str) -> Result<bool> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT 1 FROM persons WHERE id = ?1")?;
        let exists = stmt
            .query_row(params![person_id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }

    fn get_person(&self, person_id: &str) -> Result<Option<Person>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id, name FROM persons WHERE id = ?1")?;
        let result = stmt
            .query_row(params![person_id], |row| {
                Ok(Person {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(result)
    }

    fn get_roles_for_title(&self, title_id: &str) -> Result<Vec<Role>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT role_id, person_id, title_id, role_label, position
             FROM roles WHERE title_id = ?1 ORDER BY position",
        )?;
        let roles = stmt
            .query_map(params![title_id], |row| {
                Ok(Role {
                    role_id: row.get(0)?,
                    person_id: row.get(1)?,
                    title_id: row.get(2)?,
                    role_label: row.get(3)?,
                    position: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roles)
    }

    fn apply_enrichment(&self, enrichment: &TitleEnrichment) -> Result<MergeOutcome> {
        let conn = self.write_conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;

        let metadata = &enrichment.metadata;
        let updated = tx.execute(
            "UPDATE titles
             SET title = ?1, year = ?2, genre = ?3, director = ?4, rating = ?5, votes = ?6,
                 runtime = ?7, enriched_at = ?8
             WHERE id = ?9",
            params![
                metadata.title,
                metadata.year,
                metadata.genre,
                metadata.director,
                metadata.rating,
                metadata.votes,
                metadata.runtime,
                chrono::Utc::now().timestamp(),
                enrichment.title_id,
            ],
        )?;
        if updated == 0 {
            bail!("Title {} does not exist", enrichment.title_id);
        }

        let mut outcome = MergeOutcome::default();
        {
            let mut person_stmt = tx.prepare_cached(
                "INSERT INTO persons (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
            )?;
            for person in &enrichment.new_persons {
                match insert_person(&mut person_stmt, person)? {
                    PersonWrite::Inserted => outcome.persons_inserted += 1,
                    PersonWrite::AlreadyPresent => debug!(
                        "Person {} already present while merging {}",
                        person.id, enrichment.title_id
                    ),
                }
            }

            let mut role_stmt = tx.prepare_cached(
                "INSERT INTO roles (person_id, title_id, role_label, position)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for role in &enrichment.roles {
                outcome.roles_inserted += role_stmt.execute(params![
                    role.person_id,
                    enrichment.title_id,
                    role.role_label,
                    role.position,
                ])?;
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.read_conn.lock().unwrap();
        Self::count_rows(&conn)
    }

    fn flush(&self) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .context("Failed to checkpoint movie database")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie_store::{StagedRole, TitleMetadata};
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteMovieStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = SqliteMovieStore::new(tmp.path().join("movies.db")).unwrap();
        (store, tmp)
    }

    fn discovered(id: &str) -> DiscoveredTitle {
        DiscoveredTitle {
            id: id.to_string(),
            title: format!("Title {}", id),
        }
    }

    fn person(id: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn role(person_id: &str, label: &str, position: u32) -> StagedRole {
        StagedRole {
            person_id: person_id.to_string(),
            role_label: label.to_string(),
            position,
        }
    }

    fn enrichment(title_id: &str, persons: Vec<Person>, roles: Vec<StagedRole>) -> TitleEnrichment {
        TitleEnrichment {
            title_id: title_id.to_string(),
            metadata: TitleMetadata {
                title: Some("The Movie".to_string()),
                genre: Some("Crime, Drama".to_string()),
                year: Some(1999),
                director: Some("Jane Doe".to_string()),
                rating: Some(7.8),
                votes: Some(12345),
                runtime: Some(121.0),
            },
            new_persons: persons,
            roles,
        }
    }

    #[test]
    fn test_seed_titles_skips_existing() {
        let (store, _tmp) = create_test_store();

        let inserted = store
            .seed_titles(&[discovered("tt001"), discovered("tt002")])
            .unwrap();
        assert_eq!(inserted, 2);

        store
            .apply_enrichment(&enrichment("tt001", vec![], vec![]))
            .unwrap();

        // Re-discovery must not wipe enriched metadata
        let inserted = store
            .seed_titles(&[discovered("tt001"), discovered("tt003")])
            .unwrap();
        assert_eq!(inserted, 1);

        let title = store.get_title("tt001").unwrap().unwrap();
        assert_eq!(title.title, Some("The Movie".to_string()));
        assert_eq!(title.year, Some(1999));
    }

    #[test]
    fn test_pending_titles_respects_limit() {
        let (store, _tmp) = create_test_store();
        let titles: Vec<DiscoveredTitle> =
            (1..=10).map(|i| discovered(&format!("tt{:03}", i))).collect();
        store.seed_titles(&titles).unwrap();

        assert_eq!(store.get_pending_title_ids(3).unwrap().len(), 3);
        assert_eq!(store.get_pending_title_ids(200).unwrap().len(), 10);
    }

    #[test]
    fn test_pending_titles_excludes_titles_with_roles() {
        let (store, _tmp) = create_test_store();
        store
            .seed_titles(&[discovered("tt001"), discovered("tt002")])
            .unwrap();

        store
            .apply_enrichment(&enrichment(
                "tt001",
                vec![person("p1", "Alice")],
                vec![role("p1", "Detective", 1)],
            ))
            .unwrap();

        assert_eq!(store.get_pending_title_ids(10).unwrap(), vec!["tt002"]);
    }

    #[test]
    fn test_pending_titles_excludes_merged_title_with_empty_cast() {
        let (store, _tmp) = create_test_store();
        store.seed_titles(&[discovered("tt001")]).unwrap();

        store
            .apply_enrichment(&enrichment("tt001", vec![], vec![]))
            .unwrap();

        assert!(store.get_pending_title_ids(10).unwrap().is_empty());
        let title = store.get_title("tt001").unwrap().unwrap();
        assert!(title.enriched_at.is_some());
    }

    #[test]
    fn test_apply_enrichment_absorbs_existing_person() {
        let (store, _tmp) = create_test_store();
        store
            .seed_titles(&[discovered("tt001"), discovered("tt002")])
            .unwrap();

        let first = store
            .apply_enrichment(&enrichment(
                "tt001",
                vec![person("p1", "Alice")],
                vec![role("p1", "Detective", 1)],
            ))
            .unwrap();
        assert_eq!(first.persons_inserted, 1);

        // Staged as new although it now exists, as happens when two workers race
        let second = store
            .apply_enrichment(&enrichment(
                "tt002",
                vec![person("p1", "Alice (dup)")],
                vec![role("p1", "Witness", 1)],
            ))
            .unwrap();
        assert_eq!(
            second,
            MergeOutcome {
                persons_inserted: 0,
                roles_inserted: 1
            }
        );

        // First writer wins
        assert_eq!(store.get_person("p1").unwrap().unwrap().name, "Alice");
        assert_eq!(store.get_stats().unwrap().persons, 1);
    }

    #[test]
    fn test_apply_enrichment_unknown_title_rolls_back() {
        let (store, _tmp) = create_test_store();

        let result = store.apply_enrichment(&enrichment(
            "tt404",
            vec![person("p1", "Alice")],
            vec![],
        ));
        assert!(result.is_err());
        assert!(!store.person_exists("p1").unwrap());
    }

    #[test]
    fn test_roles_returned_in_position_order() {
        let (store, _tmp) = create_test_store();
        store.seed_titles(&[discovered("tt001")]).unwrap();

        store
            .apply_enrichment(&enrichment(
                "tt001",
                vec![person("p1", "Alice"), person("p2", "Bob")],
                vec![role("p2", "Suspect", 2), role("p1", "Detective", 1)],
            ))
            .unwrap();

        let roles = store.get_roles_for_title("tt001").unwrap();
        let positions: Vec<u32> = roles.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(roles[0].person_id, "p1");
        assert_eq!(roles[1].role_label, "Suspect");
    }

    #[test]
    fn test_stats() {
        let (store, _tmp) = create_test_store();
        assert_eq!(store.get_stats().unwrap(), StoreStats::default());

        store
            .seed_titles(&[discovered("tt001"), discovered("tt002"), discovered("tt003")])
            .unwrap();
        store
            .apply_enrichment(&enrichment(
                "tt001",
                vec![person("p1", "Alice"), person("p2", "Bob")],
                vec![role("p1", "Detective", 1), role("p2", "Suspect", 2)],
            ))
            .unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.titles, 3);
        assert_eq!(stats.enriched_titles, 1);
        assert_eq!(stats.pending_titles, 2);
        assert_eq!(stats.persons, 2);
        assert_eq!(stats.roles, 2);
    }

    #[test]
    fn test_reopen_validates_existing_schema() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("movies.db");

        {
            let store = SqliteMovieStore::new(&db_path).unwrap();
            store.seed_titles(&[discovered("tt001")]).unwrap();
            store.flush().unwrap();
        }

        let store = SqliteMovieStore::new(&db_path).unwrap();
        assert!(store.get_title("tt001").unwrap().is_some());
    }

    #[test]
    fn test_foreign_database_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("other.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute("CREATE TABLE movies (id TEXT PRIMARY KEY)", [])
                .unwrap();
        }

        assert!(SqliteMovieStore::new(&db_path).is_err());
    }
}
