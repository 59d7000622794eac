//! # StreamStore
//!
//! The central handle: one SQLite connection, the shared table lock of its
//! database path, one reusable chunk buffer and the diagnostic sink.
//!
//! ## Ownership
//!
//! ```text
//! StreamStore
//! ├── conn: Connection          one per store, never shared
//! ├── table_lock: TableLock     shared with every store on the same file
//! ├── buffer: ChunkBuffer       reused by every write and scan
//! ├── log: Diagnostics          owns the caller's sink
//! └── config: StoreConfig
//! ```
//!
//! Every public operation takes `&mut self` and runs to completion on the
//! caller's thread. Parallel work uses several stores on the same file.
//!
//! ## Error Boundary
//!
//! Public operations run through [`StreamStore::guarded`]: a failure is
//! reported once to the sink as `ERROR: <operation>: <cause chain>` and the
//! same error is returned. The store stays usable afterwards.
//!
//! ## Example
//!
//! ```rust
//! # use dbstream::{StreamStore, StreamHeader, NullSink};
//! # use tempfile::tempdir;
//! # let dir = tempdir().unwrap();
//! # let path = dir.path().join("streams.db");
//! let mut store = StreamStore::builder()
//!     .path(&path)
//!     .create_if_missing(true)
//!     .sink(NullSink)
//!     .open()
//!     .unwrap();
//!
//! let mut header = StreamHeader::new("greeting", 0, 1_700_000_000_000, 5);
//! let id = store.write_bytes(&mut header, b"hello").unwrap();
//! assert!(store.lookup_by_id(id).unwrap());
//! ```

use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use rusqlite::{Connection, OpenFlags};

use super::builder::{StoreBuilder, StoreConfig};
use super::table_locks::{LockStats, TableLock};
use crate::config::LOG_PREFIX;
use crate::diagnostics::{DiagnosticSink, Diagnostics, TracingSink};
use crate::schema::{ensure_schema, verify_database};
use crate::storage::ChunkBuffer;

pub struct StreamStore {
    pub(crate) conn: Connection,
    pub(crate) path: PathBuf,
    pub(crate) table_lock: TableLock,
    pub(crate) buffer: ChunkBuffer,
    pub(crate) log: Diagnostics,
    pub(crate) config: StoreConfig,
}

impl std::fmt::Debug for StreamStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamStore")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl StreamStore {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Opens an existing database file with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = StoreConfig::default();
        Self::open_with_config(path.as_ref(), config, Box::new(TracingSink))
    }

    pub(crate) fn open_with_config(
        path: &Path,
        config: StoreConfig,
        sink: Box<dyn DiagnosticSink>,
    ) -> Result<Self> {
        let log = Diagnostics::new(sink);

        let conn = match Self::connect(path, &config, &log) {
            Ok(conn) => conn,
            Err(err) => {
                log.error(format!("ERROR: open: {:#}", err));
                return Err(err);
            }
        };

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            table_lock: TableLock::for_path(path),
            buffer: ChunkBuffer::new(config.buffer_capacity()),
            log,
            config,
        })
    }

    fn connect(path: &Path, config: &StoreConfig, log: &Diagnostics) -> Result<Connection> {
        ensure!(
            config.create_if_missing || path.exists(),
            "The database '{}' does not exist",
            path.display()
        );

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(path, flags)
            .wrap_err_with(|| format!("failed to open database '{}'", path.display()))?;
        conn.busy_timeout(config.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let wanted = config.journal_mode.as_str();
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", wanted, |row| row.get(0))?;
        ensure!(
            mode.eq_ignore_ascii_case(wanted),
            "journal_mode '{}' was refused, the database uses '{}'",
            wanted,
            mode
        );
        log.info(format!("{}: journal_mode = {}", LOG_PREFIX, mode));

        verify_database(&conn, log)?;
        ensure_schema(&conn, log)?;
        Ok(conn)
    }

    /// Runs `op`, reporting a failure to the sink before returning it.
    pub(crate) fn guarded<T, F>(&mut self, op: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        f(self).map_err(|err| {
            self.log.error(format!("ERROR: {}: {:#}", op, err));
            err
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Lock counters shared by every store on this database file.
    pub fn lock_stats(&self) -> &LockStats {
        self.table_lock.stats()
    }
}
