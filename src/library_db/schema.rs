//! Description of the library tables this tool depends on.
//!
//! The schema is owned by the DJ software, so nothing here migrates or
//! alters an existing store. The table list is used to reject stores that
//! lack the tables we read from, and `create_library_schema` builds an empty
//! store with the same layout (used to set up scratch libraries).

use rusqlite::{params, Connection};

#[macro_export]
macro_rules! library_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = $crate::library_db::schema::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub default_value: Option<&'static str>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> rusqlite::Result<()> {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut definition = format!(
                    "{} {}",
                    column.name,
                    match column.sql_type {
                        SqlType::Text => "VARCHAR(255)",
                        SqlType::Integer => "INTEGER",
                    }
                );
                if column.is_primary_key {
                    definition.push_str(" PRIMARY KEY");
                }
                if let Some(default_value) = column.default_value {
                    definition.push_str(&format!(" DEFAULT {}", default_value));
                }
                definition
            })
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(&format!("CREATE TABLE {} ({});", self.name, columns), params![])?;
        Ok(())
    }

    pub fn exists(&self, conn: &Connection) -> rusqlite::Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

pub const CONTENT_TABLE: &str = "djmdContent";
pub const ARTIST_TABLE: &str = "djmdArtist";
pub const ALBUM_TABLE: &str = "djmdAlbum";
pub const PLAYLIST_TABLE: &str = "djmdPlaylist";
pub const SONG_PLAYLIST_TABLE: &str = "djmdSongPlaylist";
pub const CUE_TABLE: &str = "djmdCue";
pub const REGISTRY_TABLE: &str = "agentRegistry";

pub const LIBRARY_TABLES: &[Table] = &[
    Table {
        name: CONTENT_TABLE,
        columns: &[
            library_column!("ID", &SqlType::Text, is_primary_key = true),
            library_column!("FolderPath", &SqlType::Text),
            library_column!("FileNameL", &SqlType::Text),
            library_column!("Title", &SqlType::Text),
            library_column!("ArtistID", &SqlType::Text),
            library_column!("AlbumID", &SqlType::Text),
            library_column!("OrgArtistID", &SqlType::Text),
            library_column!("ReleaseDate", &SqlType::Text),
            library_column!("Subtitle", &SqlType::Text),
            library_column!("StockDate", &SqlType::Text),
            library_column!("DateCreated", &SqlType::Text),
            library_column!("ColorID", &SqlType::Text),
            library_column!("DJPlayCount", &SqlType::Integer),
            library_column!("rb_local_usn", &SqlType::Integer),
            library_column!(
                "rb_local_deleted",
                &SqlType::Integer,
                default_value = Some("0")
            ),
            library_column!("created_at", &SqlType::Text),
            library_column!("updated_at", &SqlType::Text),
        ],
    },
    Table {
        name: ARTIST_TABLE,
        columns: &[
            library_column!("ID", &SqlType::Text, is_primary_key = true),
            library_column!("Name", &SqlType::Text),
            library_column!("SearchStr", &SqlType::Text),
            library_column!("UUID", &SqlType::Text),
            library_column!("rb_local_usn", &SqlType::Integer),
            library_column!(
                "rb_local_deleted",
                &SqlType::Integer,
                default_value = Some("0")
            ),
            library_column!("created_at", &SqlType::Text),
            library_column!("updated_at", &SqlType::Text),
        ],
    },
    Table {
        name: ALBUM_TABLE,
        columns: &[
            library_column!("ID", &SqlType::Text, is_primary_key = true),
            library_column!("Name", &SqlType::Text),
            library_column!("AlbumArtistID", &SqlType::Text),
            library_column!("rb_local_usn", &SqlType::Integer),
            library_column!(
                "rb_local_deleted",
                &SqlType::Integer,
                default_value = Some("0")
            ),
            library_column!("created_at", &SqlType::Text),
            library_column!("updated_at", &SqlType::Text),
        ],
    },
    Table {
        name: PLAYLIST_TABLE,
        columns: &[
            library_column!("ID", &SqlType::Text, is_primary_key = true),
            library_column!("Seq", &SqlType::Integer),
            library_column!("Name", &SqlType::Text),
            library_column!("Attribute", &SqlType::Integer),
            library_column!("ParentID", &SqlType::Text),
            library_column!(
                "rb_local_deleted",
                &SqlType::Integer,
                default_value = Some("0")
            ),
        ],
    },
    Table {
        name: SONG_PLAYLIST_TABLE,
        columns: &[
            library_column!("ID", &SqlType::Text, is_primary_key = true),
            library_column!("PlaylistID", &SqlType::Text),
            library_column!("ContentID", &SqlType::Text),
            library_column!("TrackNo", &SqlType::Integer),
            library_column!(
                "rb_local_deleted",
                &SqlType::Integer,
                default_value = Some("0")
            ),
        ],
    },
    Table {
        name: CUE_TABLE,
        columns: &[
            library_column!("ID", &SqlType::Text, is_primary_key = true),
            library_column!("ContentID", &SqlType::Text),
            library_column!("InMsec", &SqlType::Integer),
            library_column!("OutMsec", &SqlType::Integer),
            library_column!("Kind", &SqlType::Integer),
            library_column!("Comment", &SqlType::Text),
            library_column!(
                "rb_local_deleted",
                &SqlType::Integer,
                default_value = Some("0")
            ),
        ],
    },
    Table {
        name: REGISTRY_TABLE,
        columns: &[
            library_column!("registry_id", &SqlType::Text, is_primary_key = true),
            library_column!("int_1", &SqlType::Integer),
            library_column!("created_at", &SqlType::Text),
            library_column!("updated_at", &SqlType::Text),
        ],
    },
];

/// Names of the expected tables that are not present in the store.
pub fn missing_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut missing = Vec::new();
    for table in LIBRARY_TABLES {
        if !table.exists(conn)? {
            missing.push(table.name.to_string());
        }
    }
    Ok(missing)
}

/// Creates every expected table plus the USN registry row (starting at `initial_usn`).
pub fn create_library_schema(conn: &Connection, initial_usn: i64) -> rusqlite::Result<()> {
    for table in LIBRARY_TABLES {
        table.create(conn)?;
    }
    let now = super::db_timestamp_now();
    conn.execute(
        &format!(
            "INSERT INTO {} (registry_id, int_1, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            REGISTRY_TABLE
        ),
        params![super::usn::USN_REGISTRY_ID, initial_usn, now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_nothing_missing() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(missing_tables(&conn).unwrap().len(), LIBRARY_TABLES.len());

        create_library_schema(&conn, 100).unwrap();
        assert!(missing_tables(&conn).unwrap().is_empty());

        let usn: i64 = conn
            .query_row("SELECT int_1 FROM agentRegistry", [], |r| r.get(0))
            .unwrap();
        assert_eq!(usn, 100);
    }

    #[test]
    fn test_missing_tables_reports_names() {
        let conn = Connection::open_in_memory().unwrap();
        LIBRARY_TABLES[0].create(&conn).unwrap();

        let missing = missing_tables(&conn).unwrap();
        assert!(!missing.contains(&CONTENT_TABLE.to_string()));
        assert!(missing.contains(&REGISTRY_TABLE.to_string()));
    }

    #[test]
    fn test_deleted_flag_defaults_to_zero() {
        let conn = Connection::open_in_memory().unwrap();
        create_library_schema(&conn, 0).unwrap();
        conn.execute("INSERT INTO djmdArtist (ID, Name) VALUES ('1', 'x')", [])
            .unwrap();
        let deleted: i64 = conn
            .query_row("SELECT rb_local_deleted FROM djmdArtist", [], |r| r.get(0))
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
