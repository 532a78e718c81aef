use super::{artists, schema, usn};
use chrono::{DateTime, Local};
use rusqlite::{Connection, ErrorCode, OpenFlags, Params, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Passphrase of the library store. It is the same for every installation
/// of the DJ software and is publicly documented, so it is not a secret.
pub const LIBRARY_DB_KEY: &str = "402fd482c38817c35ffa8ffb8c7d93143b749e7d315df7a81732a1ff43608497";

/// SQLCipher major version whose default cipher parameters the store uses.
const CIPHER_COMPATIBILITY: i64 = 4;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("No library database path configured")]
    NoPath,

    #[error("Library database not found: {0:?}")]
    FileMissing(PathBuf),

    #[error("Library database is empty (0 bytes): {0:?}")]
    ZeroLength(PathBuf),

    #[error("File is not a valid library database (wrong format or corrupt)")]
    InvalidFormat,

    #[error("Library database is missing expected tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),

    #[error("Failed to open library database: {0}")]
    Open(String),

    #[error("Not connected to the library database")]
    NotConnected,

    #[error("Connection was already finalized")]
    Finalized,

    #[error("A transaction is already active")]
    TransactionActive,

    #[error("No active transaction")]
    NoTransaction,

    #[error("USN registry row is missing")]
    UsnRegistryMissing,

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
    Finalized,
}

struct ConnectionState {
    status: ConnectionStatus,
    conn: Option<Connection>,
}

/// Owns the single connection to the library store.
///
/// Every public method takes the same mutex, so the manager can be shared
/// (`Arc<ConnectionManager>`) between a worker running a batch and a caller
/// that only looks at [`ConnectionManager::status`]. Only one batch should
/// write through a manager at a time: the USN and artist id allocation are
/// not safe against concurrent writers.
pub struct ConnectionManager {
    path: PathBuf,
    state: Mutex<ConnectionState>,
}

/// Applies the store passphrase and cipher parameters to a freshly opened connection.
pub fn apply_library_key(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA key = '{}'; PRAGMA cipher_compatibility = {};",
        LIBRARY_DB_KEY, CIPHER_COMPATIBILITY
    ))
}

fn classify_sqlite_error(err: rusqlite::Error) -> ConnectionError {
    match err.sqlite_error_code() {
        Some(ErrorCode::NotADatabase) => ConnectionError::InvalidFormat,
        _ => ConnectionError::Open(err.to_string()),
    }
}

fn open_store(path: &Path) -> Result<Connection, ConnectionError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(classify_sqlite_error)?;
    apply_library_key(&conn).map_err(classify_sqlite_error)?;

    // The key is only checked when the first page is read.
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |r| {
        r.get::<_, i64>(0)
    })
    .map_err(classify_sqlite_error)?;

    let missing = schema::missing_tables(&conn).map_err(classify_sqlite_error)?;
    if !missing.is_empty() {
        return Err(ConnectionError::MissingTables(missing));
    }

    // The library cannot be regenerated, integrity over write speed.
    conn.execute_batch("PRAGMA journal_mode = DELETE; PRAGMA synchronous = FULL;")
        .map_err(classify_sqlite_error)?;
    Ok(conn)
}

/// Sibling path a backup of `source` taken at `at` is written to.
pub fn backup_destination(source: &Path, at: &DateTime<Local>) -> PathBuf {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "library.db".to_string());
    let stamp = at.format("%Y%m%d-%H%M%S");
    let base = source.with_file_name(format!("{}.backup-{}", file_name, stamp));
    if !base.exists() {
        return base;
    }
    let mut counter = 1;
    loop {
        let candidate = source.with_file_name(format!("{}.backup-{}-{}", file_name, stamp, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

impl ConnectionManager {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(ConnectionState {
                status: ConnectionStatus::Disconnected,
                conn: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock_state().status
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn require_path(&self) -> Result<&Path, ConnectionError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConnectionError::NoPath);
        }
        Ok(&self.path)
    }

    fn connect_locked(&self, state: &mut ConnectionState) -> Result<(), ConnectionError> {
        match state.status {
            ConnectionStatus::Connected => return Ok(()),
            ConnectionStatus::Finalized => return Err(ConnectionError::Finalized),
            ConnectionStatus::Disconnected => {}
        }

        let path = self.require_path()?;
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConnectionError::FileMissing(path.to_path_buf()))
            }
            Err(e) => return Err(ConnectionError::Io(e)),
        };
        if !metadata.is_file() {
            return Err(ConnectionError::FileMissing(path.to_path_buf()));
        }
        if metadata.len() == 0 {
            return Err(ConnectionError::ZeroLength(path.to_path_buf()));
        }

        let conn = open_store(path)?;
        info!(
            module = "library_db",
            operation = "connect",
            "Connected to library database at {:?}",
            path
        );
        state.conn = Some(conn);
        state.status = ConnectionStatus::Connected;
        Ok(())
    }

    fn connection_locked<'a>(
        &self,
        state: &'a mut ConnectionState,
        lazy: bool,
    ) -> Result<&'a Connection, ConnectionError> {
        if lazy {
            if state.status != ConnectionStatus::Connected {
                return Err(ConnectionError::NotConnected);
            }
        } else {
            self.connect_locked(state)?;
        }
        state.conn.as_ref().ok_or(ConnectionError::NotConnected)
    }

    /// Opens the store. Does nothing when already connected.
    pub fn connect(&self) -> Result<(), ConnectionError> {
        let mut state = self.lock_state();
        self.connect_locked(&mut state)
    }

    /// Connects unless `lazy` is set, in which case an existing connection is required.
    pub fn ensure_connected(&self, lazy: bool) -> Result<(), ConnectionError> {
        let mut state = self.lock_state();
        self.connection_locked(&mut state, lazy).map(|_| ())
    }

    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, ConnectionError> {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, false)?;
        Ok(conn.execute(sql, params)?)
    }

    pub fn execute_batch(&self, sql: &str) -> Result<(), ConnectionError> {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, false)?;
        Ok(conn.execute_batch(sql)?)
    }

    pub fn query_row<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<T, ConnectionError>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, false)?;
        Ok(conn.query_row(sql, params, f)?)
    }

    pub fn query_map<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>, ConnectionError>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, false)?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, f)?.collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    /// Runs `f` against the connection while holding the manager lock.
    ///
    /// `f` must not call back into the manager.
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<ConnectionError>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, false)?;
        f(conn)
    }

    pub fn begin_transaction(&self) -> Result<(), ConnectionError> {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, false)?;
        if !conn.is_autocommit() {
            return Err(ConnectionError::TransactionActive);
        }
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<(), ConnectionError> {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, true)?;
        if conn.is_autocommit() {
            return Err(ConnectionError::NoTransaction);
        }
        conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<(), ConnectionError> {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, true)?;
        if conn.is_autocommit() {
            return Err(ConnectionError::NoTransaction);
        }
        conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    ///
    /// Like [`ConnectionManager::with_connection`], `f` must not call back
    /// into the manager.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<ConnectionError>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let mut state = self.lock_state();
        let conn = self.connection_locked(&mut state, false)?;
        if !conn.is_autocommit() {
            return Err(ConnectionError::TransactionActive.into());
        }
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(ConnectionError::from)?;

        match f(conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT").map_err(ConnectionError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                    warn!(
                        module = "library_db",
                        operation = "rollback",
                        "Failed to roll back transaction: {}",
                        rollback_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Allocates the next update sequence number. See [`usn::next_usn`].
    pub fn next_usn(&self) -> Result<i64, ConnectionError> {
        self.with_connection(usn::next_usn)
    }

    /// Looks up an artist by name (case-insensitive), creating it when missing.
    ///
    /// A new artist is stamped with a freshly allocated USN. Returns `None`
    /// for a blank name.
    pub fn add_or_get_artist(&self, name: &str) -> Result<Option<String>, ConnectionError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        self.with_transaction(|conn| {
            if let Some(id) = artists::find_artist(conn, name)? {
                return Ok(Some(id));
            }
            let usn = usn::next_usn(conn)?;
            artists::add_or_get_artist(conn, name, usn)
        })
    }

    /// Copies the store file to a timestamped sibling and returns its path.
    ///
    /// An open connection is finalized first (rolling back any pending
    /// transaction), so the copy never contains half-written state. The
    /// manager cannot be reconnected afterwards.
    pub fn backup_database(&self) -> Result<PathBuf, ConnectionError> {
        let source = self.require_path()?.to_path_buf();
        if !source.is_file() {
            return Err(ConnectionError::FileMissing(source));
        }

        let mut state = self.lock_state();
        if state.status == ConnectionStatus::Connected {
            Self::finalize_locked(&mut state);
        }

        let destination = backup_destination(&source, &Local::now());
        let bytes = fs::copy(&source, &destination)?;
        info!(
            module = "library_db",
            operation = "backup",
            "Backed up library database ({} bytes) to {:?}",
            bytes,
            destination
        );
        Ok(destination)
    }

    fn finalize_locked(state: &mut ConnectionState) {
        if state.status == ConnectionStatus::Finalized {
            return;
        }
        if let Some(conn) = state.conn.take() {
            if !conn.is_autocommit() {
                warn!(
                    module = "library_db",
                    operation = "finalize",
                    "Rolling back abandoned transaction"
                );
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    warn!(module = "library_db", operation = "finalize", "Rollback failed: {}", e);
                }
            }
            if let Err(e) = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(())) {
                warn!(module = "library_db", operation = "finalize", "Checkpoint failed: {}", e);
            }
            if let Err(e) = conn.execute_batch("PRAGMA optimize") {
                warn!(module = "library_db", operation = "finalize", "Optimize failed: {}", e);
            }
            if let Err((_, e)) = conn.close() {
                warn!(module = "library_db", operation = "finalize", "Close failed: {}", e);
            }
            debug!(module = "library_db", operation = "finalize", "Connection closed");
        }
        state.status = ConnectionStatus::Finalized;
    }

    /// Closes the connection for good. Safe to call any number of times.
    pub fn finalize(&self) {
        let mut state = self.lock_state();
        Self::finalize_locked(&mut state);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.finalize();
    }
}
