//! End-to-end tests for opening, locking down and backing up the library

mod common;

use common::*;
use crate_sync::library_db::{apply_library_key, ConnectionError, ConnectionManager, ConnectionStatus};
use rusqlite::{params, Connection};
use std::fs;
use std::sync::Arc;
use std::thread;

#[test]
fn test_connect_to_valid_library() {
    let library = TestLibrary::with_tracks();
    let db = library.manager();
    assert_eq!(db.status(), ConnectionStatus::Disconnected);

    db.connect().unwrap();
    assert_eq!(db.status(), ConnectionStatus::Connected);

    let title: String = db
        .query_row(
            "SELECT Title FROM djmdContent WHERE ID = ?1",
            params![TRACK_1_ID],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(title, "one.flac");
}

#[test]
fn test_connect_classifies_bad_files() {
    let library = TestLibrary::new();

    let empty_path = ConnectionManager::new("");
    assert!(matches!(empty_path.connect(), Err(ConnectionError::NoPath)));

    let missing = ConnectionManager::new(library.dir.path().join("nope.db"));
    assert!(matches!(missing.connect(), Err(ConnectionError::FileMissing(_))));

    let zero = library.dir.path().join("zero.db");
    fs::write(&zero, b"").unwrap();
    assert!(matches!(
        ConnectionManager::new(&zero).connect(),
        Err(ConnectionError::ZeroLength(_))
    ));

    let garbage = library.dir.path().join("garbage.db");
    fs::write(&garbage, vec![0x5au8; 8192]).unwrap();
    assert!(matches!(
        ConnectionManager::new(&garbage).connect(),
        Err(ConnectionError::InvalidFormat)
    ));
}

#[test]
fn test_unencrypted_database_is_invalid_format() {
    let library = TestLibrary::new();
    let plain = library.dir.path().join("plain.db");
    let conn = Connection::open(&plain).unwrap();
    conn.execute_batch("CREATE TABLE djmdContent (ID TEXT); INSERT INTO djmdContent VALUES ('1');")
        .unwrap();
    drop(conn);

    let db = ConnectionManager::new(&plain);
    assert!(matches!(db.connect(), Err(ConnectionError::InvalidFormat)));
    assert_eq!(db.status(), ConnectionStatus::Disconnected);
}

#[test]
fn test_missing_tables_are_listed() {
    let library = TestLibrary::new();
    let partial = library.dir.path().join("partial.db");
    let conn = Connection::open(&partial).unwrap();
    apply_library_key(&conn).unwrap();
    conn.execute_batch("CREATE TABLE djmdContent (ID TEXT PRIMARY KEY);")
        .unwrap();
    drop(conn);

    match ConnectionManager::new(&partial).connect() {
        Err(ConnectionError::MissingTables(tables)) => {
            assert!(tables.contains(&"djmdArtist".to_string()));
            assert!(tables.contains(&"agentRegistry".to_string()));
            assert!(!tables.contains(&"djmdContent".to_string()));
        }
        other => panic!("Expected MissingTables, got {:?}", other),
    }
}

#[test]
fn test_operations_connect_lazily() {
    let library = TestLibrary::with_tracks();
    let db = library.manager();

    // Reads open the connection on demand.
    let count: i64 = db
        .query_row("SELECT COUNT(*) FROM djmdContent", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(db.status(), ConnectionStatus::Connected);

    // Commit and rollback require an existing transaction.
    assert!(matches!(db.commit(), Err(ConnectionError::NoTransaction)));
    assert!(matches!(db.rollback(), Err(ConnectionError::NoTransaction)));
}

#[test]
fn test_transactions_commit_and_roll_back() {
    let library = TestLibrary::with_tracks();
    let db = library.manager();

    db.begin_transaction().unwrap();
    assert!(matches!(
        db.begin_transaction(),
        Err(ConnectionError::TransactionActive)
    ));
    db.execute(
        "UPDATE djmdContent SET Subtitle = 'kept' WHERE ID = ?1",
        params![TRACK_1_ID],
    )
    .unwrap();
    db.commit().unwrap();

    db.begin_transaction().unwrap();
    db.execute(
        "UPDATE djmdContent SET Subtitle = 'dropped' WHERE ID = ?1",
        params![TRACK_1_ID],
    )
    .unwrap();
    db.rollback().unwrap();
    db.finalize();

    assert_eq!(
        library.content_value(TRACK_1_ID, "Subtitle").as_deref(),
        Some("kept")
    );
}

#[test]
fn test_backup_rolls_back_open_transaction_and_copies_exact_bytes() {
    let library = TestLibrary::with_tracks();
    let db = library.manager();

    db.begin_transaction().unwrap();
    db.execute(
        "UPDATE djmdContent SET Title = 'half written' WHERE ID = ?1",
        params![TRACK_1_ID],
    )
    .unwrap();

    let backup = db.backup_database().unwrap();
    assert_eq!(db.status(), ConnectionStatus::Finalized);
    assert_eq!(library.backups(), vec![backup.clone()]);

    assert_eq!(fs::read(&backup).unwrap(), fs::read(&library.db_path).unwrap());
    assert_eq!(
        library.content_value(TRACK_1_ID, "Title").as_deref(),
        Some("one.flac")
    );

    // The backup is itself a valid library.
    let restored = ConnectionManager::new(&backup);
    restored.connect().unwrap();
    restored.finalize();
}

#[test]
fn test_second_backup_in_same_second_gets_new_name() {
    let library = TestLibrary::with_tracks();
    let first = library.manager().backup_database().unwrap();
    let second = library.manager().backup_database().unwrap();
    assert_ne!(first, second);
    assert_eq!(library.backups().len(), 2);
}

#[test]
fn test_finalize_is_terminal_and_idempotent() {
    let library = TestLibrary::with_tracks();
    let db = library.manager();
    db.connect().unwrap();

    db.finalize();
    db.finalize();
    assert_eq!(db.status(), ConnectionStatus::Finalized);
    assert!(matches!(db.connect(), Err(ConnectionError::Finalized)));
    assert!(matches!(
        db.execute("DELETE FROM djmdContent", []),
        Err(ConnectionError::Finalized)
    ));
}

#[test]
fn test_next_usn_is_monotonic_and_persisted() {
    let library = TestLibrary::new();
    let db = library.manager();

    let first = db.next_usn().unwrap();
    let second = db.next_usn().unwrap();
    assert_eq!(first, INITIAL_USN + 1);
    assert_eq!(second, INITIAL_USN + 2);
    db.finalize();

    assert_eq!(library.current_usn(), INITIAL_USN + 2);
}

#[test]
fn test_next_usn_without_registry_row() {
    let library = TestLibrary::new();
    library
        .raw_connection()
        .execute("DELETE FROM agentRegistry", [])
        .unwrap();

    let db = library.manager();
    assert!(matches!(
        db.next_usn(),
        Err(ConnectionError::UsnRegistryMissing)
    ));
}

#[test]
fn test_add_or_get_artist_reuses_existing_names() {
    let library = TestLibrary::with_tracks();
    let db = library.manager();
    let before = library.artist_count();

    let existing = db.add_or_get_artist("nova REEL").unwrap();
    assert_eq!(existing.as_deref(), Some(ARTIST_1_ID));
    assert_eq!(library.artist_count(), before);
    assert_eq!(db.add_or_get_artist("   ").unwrap(), None);

    let created = db.add_or_get_artist("Orbit Theory").unwrap().unwrap();
    let again = db.add_or_get_artist("ORBIT THEORY").unwrap().unwrap();
    assert_eq!(created, again);
    db.finalize();

    assert_eq!(library.artist_count(), before + 1);
    assert_eq!(library.artist_name(&created).as_deref(), Some("Orbit Theory"));
    // Creating the artist consumed one USN.
    assert_eq!(library.current_usn(), INITIAL_USN + 1);
}

#[test]
fn test_shared_manager_hands_out_unique_usns() {
    let library = TestLibrary::new();
    let db = Arc::new(library.manager());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || (0..5).map(|_| db.next_usn().unwrap()).collect::<Vec<_>>())
        })
        .collect();

    let mut usns: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    usns.sort();
    usns.dedup();
    assert_eq!(usns.len(), 20);
    assert_eq!(usns.last(), Some(&(INITIAL_USN + 20)));
}
