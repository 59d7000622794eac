//! # Database Module
//!
//! The stream-storage engine on top of one SQLite connection.
//!
//! ## Operation Flow
//!
//! ```text
//! write(header, source)
//!     │  no table lock
//!     ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │ BEGIN                                                     │
//! │ INSERT stream (size = 0) ──► master id                    │
//! │ loop: fill_chunk ──► INSERT streamdata (masterid, data)   │
//! │ UPDATE stream SET size                                    │
//! │ COMMIT (any failure: ROLLBACK)                            │
//! └───────────────────────────────────────────────────────────┘
//!
//! scan(column, range, visitor)
//!     │  READ lock per batch
//!     ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │ SELECT headers WHERE range/cursor ORDER BY column LIMIT B │
//! │ per header: on_begin ─► chunks via blob I/O ─► on_end     │
//! │ release lock, advance cursor, repeat while batch was full │
//! └───────────────────────────────────────────────────────────┘
//!
//! delete(column, range, reset)
//!     │  WRITE lock
//!     ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │ DELETE FROM stream WHERE range  (chunks cascade)          │
//! │ optional identity reset when range covers every row       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - `database`: `StreamStore` struct, open, error boundary
//! - `builder`: `StoreBuilder`, `StoreConfig`, `JournalMode`
//! - `table_locks`: READ/WRITE coordination between stores
//! - `query`: range predicates and the scan cursor
//! - `write`, `scan`, `delete`, `lookup`, `lifecycle`: operations

mod builder;
#[allow(clippy::module_inception)]
mod database;
mod delete;
mod lifecycle;
mod lookup;
mod query;
mod scan;
mod table_locks;
mod write;

pub use builder::{JournalMode, StoreBuilder, StoreConfig};
pub use database::StreamStore;
pub use table_locks::LockStats;
