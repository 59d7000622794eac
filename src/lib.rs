//! # dbstream - Chunked Binary Streams on SQLite
//!
//! dbstream stores arbitrarily large binary payloads ("streams") in two
//! relational tables: one header row per stream and a sequence of bounded
//! chunk rows holding the payload. Streams are append-only; they are
//! written once, scanned in key order and deleted by range.
//!
//! - **Bounded memory**: writes and scans reuse one buffer per store, no
//!   matter how large a stream is
//! - **Atomic writes**: a stream becomes visible with all of its chunks or
//!   not at all
//! - **Cooperative locking**: readers and deleters on the same database file
//!   coordinate through a shared table lock, writers never wait on it
//!
//! ## Quick Start
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use dbstream::{KeyRange, NullSink, ReadEvent, StreamHeader, StreamStore};
//! # let dir = tempfile::tempdir().unwrap();
//!
//! let mut store = StreamStore::builder()
//!     .path(dir.path().join("streams.db"))
//!     .create_if_missing(true)
//!     .sink(NullSink)
//!     .open()?;
//!
//! let mut header = StreamHeader::new("report.pdf", 1, 1_700_000_000_000, 0);
//! let id = store.write(&mut header, &b"%PDF-1.7 ..."[..])?;
//!
//! let mut bytes = 0;
//! store.read_by_id(KeyRange::single(id), &mut |event: ReadEvent<'_>| {
//!     if let ReadEvent::Data(_, data) = event {
//!         bytes += data.len();
//!     }
//!     ControlFlow::Continue(())
//! })?;
//! assert_eq!(bytes as u64, header.size);
//! # Ok::<(), eyre::Report>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Public API (StreamStore)          │
//! ├──────────────┬──────────────┬───────────────┤
//! │ Write        │ Cursor       │ Delete /      │
//! │ Pipeline     │ Scanner      │ Lookup        │
//! ├──────────────┴──────┬───────┴───────────────┤
//! │  Chunk Codec        │  Lock Coordinator     │
//! ├─────────────────────┴───────────────────────┤
//! │  Schema Manager        │  Diagnostics       │
//! ├─────────────────────────────────────────────┤
//! │            SQLite (rusqlite, WAL)            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Table Layout
//!
//! ```text
//! stream                              streamdata
//! ├── id         INTEGER PK  ◄─────── ├── masterid  (ON DELETE CASCADE)
//! ├── descr      VARCHAR(120)         ├── id        INTEGER PK
//! ├── type       TINYINT              └── data      BLOB (<= 65535 bytes)
//! ├── size       BIGINT
//! └── timestamp  BIGINT (indexed)
//! ```
//!
//! ## Module Overview
//!
//! - [`database`]: the store and its operations
//! - [`stream`]: headers, ranges and the visitor interface
//! - [`storage`]: chunk splitting and reassembly
//! - [`schema`]: table creation, verification and description
//! - [`diagnostics`]: the message sink
//! - [`config`]: engine constants
//! - [`cli`]: the `dbstream` command-line driver

pub mod cli;
pub mod config;
pub mod database;
pub mod diagnostics;
pub mod schema;
pub mod storage;
pub mod stream;

pub use database::{JournalMode, LockStats, StoreBuilder, StoreConfig, StreamStore};
pub use diagnostics::{DiagnosticSink, NullSink, TracingSink};
pub use stream::{
    Boundary, KeyRange, RangeColumn, ReadEvent, ScanSummary, StreamHeader, StreamVisitor,
};
