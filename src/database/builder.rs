//! # Store Builder
//!
//! `StoreBuilder` configures and opens a [`StreamStore`]. Settings are
//! chained before calling `open()`; anything left unset falls back to the
//! engine defaults in [`crate::config`].
//!
//! ## Configuration Options
//!
//! | Option            | Default        | Description                              |
//! |-------------------|----------------|------------------------------------------|
//! | path              | required       | SQLite database file                     |
//! | create_if_missing | false          | Create the file instead of failing       |
//! | batch_size        | 100            | Streams fetched per scan batch           |
//! | chunk_size        | 65 535         | Payload bytes per chunk row              |
//! | read_buffer_size  | 65 535         | Bytes handed to a visitor per `on_data`  |
//! | busy_timeout      | 5 s            | Backend lock-wait timeout                |
//! | journal_mode      | WAL            | SQLite journal mode                      |
//! | sink              | TracingSink    | Receiver of diagnostic messages          |
//!
//! ## Usage Examples
//!
//! ### Defaults:
//!
//! ```ignore
//! let store = StreamStore::builder()
//!     .path("./streams.db")
//!     .create_if_missing(true)
//!     .open()?;
//! ```
//!
//! ### Small batches and a custom sink:
//!
//! ```ignore
//! let store = StreamStore::builder()
//!     .path("./streams.db")
//!     .batch_size(10)
//!     .read_buffer_size(4096)
//!     .sink(NullSink)
//!     .open()?;
//! ```
//!
//! ## Journal Mode
//!
//! WAL lets the write pipeline commit while scans hold a READ lock. The
//! rollback journal modes serialize writers behind readers at the backend
//! level; they are offered for filesystems where WAL is unavailable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{ensure, eyre, Result};

use super::StreamStore;
use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_CHUNK_SIZE, DEFAULT_READ_BUFFER_SIZE,
    MAX_CELL_SIZE,
};
use crate::diagnostics::{DiagnosticSink, TracingSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Truncate,
}

impl JournalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalMode::Wal => "wal",
            JournalMode::Delete => "delete",
            JournalMode::Truncate => "truncate",
        }
    }
}

/// Resolved options of an open store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub create_if_missing: bool,
    pub batch_size: usize,
    pub chunk_size: usize,
    pub read_buffer_size: usize,
    pub busy_timeout: Duration,
    pub journal_mode: JournalMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: false,
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            journal_mode: JournalMode::Wal,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(
            (1..=MAX_CELL_SIZE).contains(&self.chunk_size),
            "chunk_size {} is outside 1..={}",
            self.chunk_size,
            MAX_CELL_SIZE
        );
        ensure!(
            (1..=MAX_CELL_SIZE).contains(&self.read_buffer_size),
            "read_buffer_size {} is outside 1..={}",
            self.read_buffer_size,
            MAX_CELL_SIZE
        );
        Ok(())
    }

    /// Size of the reusable buffer shared by reads and writes.
    pub fn buffer_capacity(&self) -> usize {
        self.chunk_size.max(self.read_buffer_size)
    }
}

/// Builder for configuring and opening a [`StreamStore`].
#[derive(Default)]
pub struct StoreBuilder {
    path: Option<PathBuf>,
    create_if_missing: Option<bool>,
    batch_size: Option<usize>,
    chunk_size: Option<usize>,
    read_buffer_size: Option<usize>,
    busy_timeout: Option<Duration>,
    journal_mode: Option<JournalMode>,
    sink: Option<Box<dyn DiagnosticSink>>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SQLite database file.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Creates the database file when it does not exist. Off by default:
    /// opening a missing database is an error.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = Some(create);
        self
    }

    /// Sets how many streams a scan fetches and locks per batch.
    pub fn batch_size(mut self, streams: usize) -> Self {
        self.batch_size = Some(streams);
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    pub fn read_buffer_size(mut self, bytes: usize) -> Self {
        self.read_buffer_size = Some(bytes);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    /// Routes diagnostic messages to `sink` instead of `tracing`.
    pub fn sink<S: DiagnosticSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Returns the resolved configuration without opening anything.
    pub fn config(&self) -> StoreConfig {
        let defaults = StoreConfig::default();
        StoreConfig {
            create_if_missing: self.create_if_missing.unwrap_or(defaults.create_if_missing),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            read_buffer_size: self.read_buffer_size.unwrap_or(defaults.read_buffer_size),
            busy_timeout: self.busy_timeout.unwrap_or(defaults.busy_timeout),
            journal_mode: self.journal_mode.unwrap_or(defaults.journal_mode),
        }
    }

    pub fn get_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Opens the store with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No path was specified
    /// - An option is out of range
    /// - The database file is missing and `create_if_missing` is off
    /// - The connection or schema initialization fails
    pub fn open(self) -> Result<StreamStore> {
        let config = self.config();
        let path = self
            .path
            .ok_or_else(|| eyre!("database path not specified: call .path() first"))?;
        config.validate()?;

        let sink = self.sink.unwrap_or_else(|| Box::new(TracingSink));
        StreamStore::open_with_config(&path, config, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use tempfile::tempdir;

    #[test]
    fn builder_defaults_match_constants() {
        let config = StoreBuilder::new().path("/tmp/x.db").config();

        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.chunk_size, 65_535);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.journal_mode, JournalMode::Wal);
        assert!(!config.create_if_missing);
    }

    #[test]
    fn builder_chaining_sets_values() {
        let builder = StoreBuilder::new()
            .path("/tmp/x.db")
            .batch_size(7)
            .chunk_size(1000)
            .read_buffer_size(2000)
            .busy_timeout(Duration::from_millis(50))
            .journal_mode(JournalMode::Delete)
            .create_if_missing(true);

        let config = builder.config();
        assert_eq!(builder.get_path(), Some(Path::new("/tmp/x.db")));
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.read_buffer_size, 2000);
        assert_eq!(config.buffer_capacity(), 2000);
        assert_eq!(config.journal_mode, JournalMode::Delete);
        assert!(config.create_if_missing);
    }

    #[test]
    fn builder_open_without_path_fails() {
        let err = StoreBuilder::new().open().unwrap_err();
        assert!(err.to_string().contains("database path not specified"));
    }

    #[test]
    fn builder_rejects_out_of_range_options() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.db");

        for builder in [
            StoreBuilder::new().path(&path).batch_size(0),
            StoreBuilder::new().path(&path).chunk_size(0),
            StoreBuilder::new().path(&path).chunk_size(MAX_CELL_SIZE + 1),
            StoreBuilder::new().path(&path).read_buffer_size(MAX_CELL_SIZE + 1),
        ] {
            assert!(builder.create_if_missing(true).sink(NullSink).open().is_err());
        }
        assert!(!path.exists());
    }

    #[test]
    fn builder_open_missing_database_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = StoreBuilder::new().path(&path).sink(NullSink).open().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(!path.exists());
    }

    #[test]
    fn builder_open_creates_when_asked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.db");

        let store = StoreBuilder::new()
            .path(&path)
            .create_if_missing(true)
            .sink(NullSink)
            .open()
            .unwrap();

        assert!(path.exists());
        assert_eq!(store.config().batch_size, DEFAULT_BATCH_SIZE);
    }
}
