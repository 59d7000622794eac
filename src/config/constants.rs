//! # dbstream Configuration Constants
//!
//! This module centralizes the engine constants, grouping interdependent
//! values together and documenting their relationships.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAX_CELL_SIZE (65535 bytes)
//!       │
//!       ├─> DEFAULT_CHUNK_SIZE (must be <=)
//!       │     One chunk row never carries more than one cell worth of
//!       │     payload, so the write path fills at most this many bytes
//!       │     before inserting a row.
//!       │
//!       └─> DEFAULT_READ_BUFFER_SIZE (must be <=)
//!             The reusable buffer is sized to the larger of the chunk size
//!             and the read buffer size, never above the cell size.
//!
//! DEFAULT_BATCH_SIZE (100 streams)
//!       │
//!       └─> Bounds how many header rows a single scan batch reads while
//!           holding the READ table lock.
//!
//! MAX_DESCRIPTION_LEN (120 bytes)
//!       │
//!       └─> Matches the VARCHAR(120) declaration of the `descr` column.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `DEFAULT_CHUNK_SIZE <= MAX_CELL_SIZE`
//! 2. `DEFAULT_READ_BUFFER_SIZE <= MAX_CELL_SIZE`
//! 3. `DEFAULT_BATCH_SIZE > 0`
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{MAX_CELL_SIZE, STREAM_TABLE};
//! ```

// ============================================================================
// CHUNK LAYOUT
// ============================================================================

/// Maximum number of payload bytes stored in a single chunk row.
///
/// A `BLOB` column limit of 2^16 - 1. SQLite itself accepts much larger
/// values; the engine enforces this bound on every chunk row.
pub const MAX_CELL_SIZE: usize = 65_535;

/// Default payload bytes per chunk row.
pub const DEFAULT_CHUNK_SIZE: usize = MAX_CELL_SIZE;

/// Default number of bytes handed to a visitor per `on_data` call.
pub const DEFAULT_READ_BUFFER_SIZE: usize = MAX_CELL_SIZE;

const _: () = assert!(
    DEFAULT_CHUNK_SIZE <= MAX_CELL_SIZE,
    "DEFAULT_CHUNK_SIZE must fit into a single cell"
);

const _: () = assert!(
    DEFAULT_READ_BUFFER_SIZE <= MAX_CELL_SIZE,
    "DEFAULT_READ_BUFFER_SIZE must not exceed the reusable buffer capacity"
);

// ============================================================================
// SCAN CONFIGURATION
// ============================================================================

/// Maximum number of streams fetched per scan batch.
///
/// The READ lock is held for one batch at a time, so this also bounds how
/// long a scan can keep deleters waiting.
pub const DEFAULT_BATCH_SIZE: usize = 100;

const _: () = assert!(DEFAULT_BATCH_SIZE > 0, "scan batches must not be empty");

// ============================================================================
// SCHEMA
// ============================================================================

/// Header table, one row per stream.
pub const STREAM_TABLE: &str = "stream";

/// Chunk table, one row per payload fragment.
pub const CHUNK_TABLE: &str = "streamdata";

/// Maximum length in bytes of a stream description.
pub const MAX_DESCRIPTION_LEN: usize = 120;

/// Oldest SQLite release with enforced foreign keys (3.6.19).
pub const MIN_SQLITE_VERSION: i32 = 3_006_019;

// ============================================================================
// BACKEND
// ============================================================================

/// Default time a statement waits on a backend lock before failing.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Prefix of every message sent to the diagnostic sink.
pub const LOG_PREFIX: &str = "StreamStore";
