//! CSV export of the role/person/title join.

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const ROLES_EXPORT_QUERY: &str = "SELECT
        roles.role_id AS role_id,
        persons.name AS person_name,
        titles.title AS title,
        titles.genre AS genre,
        titles.year AS year,
        titles.director AS director,
        titles.rating AS rating,
        titles.votes AS votes,
        titles.runtime AS runtime,
        roles.role_label AS role_label,
        roles.position AS position
    FROM roles
    JOIN persons ON roles.person_id = persons.id
    JOIN titles ON roles.title_id = titles.id
    ORDER BY roles.title_id, roles.position";

/// Export every role of the database at `db_path` to a CSV file at `out_path`.
///
/// Returns the number of data rows written.
pub fn export_roles_csv(db_path: &Path, out_path: &Path) -> Result<usize> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open database at {:?}", db_path))?;
    let file = File::create(out_path)
        .with_context(|| format!("Failed to create export file at {:?}", out_path))?;

    let mut writer = BufWriter::new(file);
    let rows = write_roles_csv(&conn, &mut writer)?;
    writer.flush()?;

    info!("Exported {} roles to {:?}", rows, out_path);
    Ok(rows)
}

/// Write the header and one line per role to `out`.
pub fn write_roles_csv<W: Write>(conn: &Connection, mut out: W) -> Result<usize> {
    let mut stmt = conn.prepare(ROLES_EXPORT_QUERY)?;
    let header: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(escape_field)
        .collect();
    write_line(&mut out, &header)?;

    let column_count = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut written = 0;
    while let Some(row) = rows.next()? {
        let mut fields = Vec::with_capacity(column_count);
        for index in 0..column_count {
            fields.push(escape_field(&value_to_field(row.get_ref(index)?)));
        }
        write_line(&mut out, &fields)?;
        written += 1;
    }

    Ok(written)
}

fn write_line<W: Write>(out: &mut W, fields: &[String]) -> Result<()> {
    out.write_all(fields.join(",").as_bytes())?;
    out.write_all(b"\r\n")?;
    Ok(())
}

fn value_to_field(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Quote a field if it contains a delimiter, a quote or a line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie_store::{
        DiscoveredTitle, MovieStore, Person, SqliteMovieStore, StagedRole, TitleEnrichment,
        TitleMetadata,
    };
    use tempfile::TempDir;

    fn create_populated_store() -> (SqliteMovieStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteMovieStore::new(temp_dir.path().join("movies.db")).unwrap();
        store
            .seed_titles(&[DiscoveredTitle {
                id: "tt001".to_string(),
                title: "Heat".to_string(),
            }])
            .unwrap();
        store
            .apply_enrichment(&TitleEnrichment {
                title_id: "tt001".to_string(),
                metadata: TitleMetadata {
                    title: Some("Heat".to_string()),
                    genre: Some("Action, Crime".to_string()),
                    year: Some(1995),
                    director: Some("Michael Mann".to_string()),
                    rating: Some(8.3),
                    votes: None,
                    runtime: Some(170.0),
                },
                new_persons: vec![
                    Person {
                        id: "p1".to_string(),
                        name: "Al Pacino".to_string(),
                    },
                    Person {
                        id: "p2".to_string(),
                        name: "Robert De Niro".to_string(),
                    },
                ],
                roles: vec![
                    StagedRole {
                        person_id: "p1".to_string(),
                        role_label: "Vincent \"Vinny\" Hanna".to_string(),
                        position: 1,
                    },
                    StagedRole {
                        person_id: "p2".to_string(),
                        role_label: "Neil McCauley".to_string(),
                        position: 2,
                    },
                ],
            })
            .unwrap();
        store.flush().unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a, b"), "\"a, b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_write_roles_csv() {
        let (store, _dir) = create_populated_store();
        let conn = Connection::open(store.db_path()).unwrap();

        let mut out = Vec::new();
        let rows = write_roles_csv(&conn, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();

        assert_eq!(rows, 2);
        assert_eq!(
            lines[0],
            "role_id,person_name,title,genre,year,director,rating,votes,runtime,role_label,position"
        );
        assert!(lines[1].starts_with("1,Al Pacino,Heat,\"Action, Crime\",1995,Michael Mann,8.3,,170,"));
        assert!(lines[1].ends_with(",\"Vincent \"\"Vinny\"\" Hanna\",1"));
        assert!(lines[2].ends_with(",Neil McCauley,2"));
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_export_roles_csv_to_file() {
        let (store, dir) = create_populated_store();
        let out_path = dir.path().join("roles.csv");

        let rows = export_roles_csv(store.db_path(), &out_path).unwrap();

        assert_eq!(rows, 2);
        let text = std::fs::read_to_string(&out_path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
