//! # Schema Manager
//!
//! Ensures the two tables backing the store exist before any operation runs.
//!
//! ## Tables
//!
//! ```text
//! stream                                 streamdata
//! ┌──────────────────────────────┐       ┌──────────────────────────────────┐
//! │ id        INTEGER PK AUTOINC │◄──┐   │ id        INTEGER PK AUTOINC     │
//! │ descr     VARCHAR(120)       │   └───│ masterid  REFERENCES stream(id)  │
//! │ type      TINYINT UNSIGNED   │       │           ON DELETE CASCADE      │
//! │ size      BIGINT UNSIGNED    │       │ data      BLOB NOT NULL          │
//! │ timestamp BIGINT UNSIGNED    │       └──────────────────────────────────┘
//! └──────────────────────────────┘
//! ```
//!
//! `AUTOINCREMENT` keeps ids monotonic across deletes. The identity counters
//! live in `sqlite_sequence` and are only reset by a delete of all rows that
//! asks for it.
//!
//! ## Initialization
//!
//! On open the manager checks the backend version and the `main` schema,
//! then checks each table by name and creates it when missing. Existing
//! tables are never dropped or altered, so initialization is idempotent.
//! Every check, the DDL text and every creation are logged through the
//! store's diagnostic sink.

mod describe;

pub use describe::{format_layout, ColumnLayout, LAYOUT_SEPARATOR};
pub(crate) use describe::{describe_tables, table_layout};

use eyre::{ensure, Result, WrapErr};
use rusqlite::Connection;

use crate::config::{CHUNK_TABLE, LOG_PREFIX, MIN_SQLITE_VERSION, STREAM_TABLE};
use crate::diagnostics::Diagnostics;

/// DDL and secondary indexes of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub ddl: &'static str,
    pub indexes: &'static [&'static str],
}

pub const STREAM_TABLE_SPEC: TableSpec = TableSpec {
    name: STREAM_TABLE,
    ddl: "CREATE TABLE IF NOT EXISTS stream (\
          id INTEGER PRIMARY KEY AUTOINCREMENT, \
          descr VARCHAR(120) NOT NULL DEFAULT '', \
          type TINYINT UNSIGNED NOT NULL DEFAULT 0, \
          size BIGINT UNSIGNED NOT NULL DEFAULT 0, \
          timestamp BIGINT UNSIGNED NOT NULL DEFAULT 0)",
    indexes: &["CREATE INDEX IF NOT EXISTS stream_timestamp_idx ON stream(timestamp)"],
};

pub const CHUNK_TABLE_SPEC: TableSpec = TableSpec {
    name: CHUNK_TABLE,
    ddl: "CREATE TABLE IF NOT EXISTS streamdata (\
          id INTEGER PRIMARY KEY AUTOINCREMENT, \
          masterid INTEGER NOT NULL DEFAULT 0 REFERENCES stream(id) ON DELETE CASCADE, \
          data BLOB NOT NULL)",
    indexes: &["CREATE INDEX IF NOT EXISTS streamdata_masterid_idx ON streamdata(masterid)"],
};

/// Both tables, parent first.
pub const TABLES: [TableSpec; 2] = [STREAM_TABLE_SPEC, CHUNK_TABLE_SPEC];

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .wrap_err_with(|| format!("failed to look up table '{}'", name))?;
    Ok(count > 0)
}

/// Creates `spec` when missing. Returns true when the table was created.
pub(crate) fn ensure_table(conn: &Connection, spec: &TableSpec, log: &Diagnostics) -> Result<bool> {
    if table_exists(conn, spec.name)? {
        log.info(format!("{}: The table '{}' exists.", LOG_PREFIX, spec.name));
        return Ok(false);
    }

    log.info(format!(
        "{}: The table '{}' does not exist. Create...",
        LOG_PREFIX, spec.name
    ));
    log.info(spec.ddl);

    conn.execute_batch(spec.ddl)
        .wrap_err_with(|| format!("failed to create table '{}'", spec.name))?;
    for index in spec.indexes {
        conn.execute_batch(index)
            .wrap_err_with(|| format!("failed to create index on '{}'", spec.name))?;
    }

    log.info(format!("{}: The table '{}' created.", LOG_PREFIX, spec.name));
    Ok(true)
}

pub(crate) fn ensure_schema(conn: &Connection, log: &Diagnostics) -> Result<()> {
    for spec in &TABLES {
        ensure_table(conn, spec, log)?;
    }
    Ok(())
}

/// Checks the backend library and that the `main` database is attached.
pub(crate) fn verify_database(conn: &Connection, log: &Diagnostics) -> Result<()> {
    log.info(format!(
        "{}: SQLite library version = {}",
        LOG_PREFIX,
        rusqlite::version()
    ));

    let version = rusqlite::version_number();
    ensure!(
        version >= MIN_SQLITE_VERSION,
        "SQLite {} lacks foreign key support",
        rusqlite::version()
    );

    let mut stmt = conn.prepare("PRAGMA database_list")?;
    let mut rows = stmt.query([])?;
    let mut has_main = false;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == "main" {
            has_main = true;
            break;
        }
    }
    ensure!(has_main, "The database 'main' does not exist");

    Ok(())
}
