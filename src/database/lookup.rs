//! Existence checks, boundary records and schema description.

use eyre::{Result, WrapErr};
use rusqlite::OptionalExtension;

use super::query::{header_from_row, to_sql_int, HEADER_COLUMNS};
use super::StreamStore;
use crate::schema::describe_tables;
use crate::stream::{Boundary, RangeColumn, StreamHeader};

impl StreamStore {
    /// Returns true when a stream with `column = value` exists. Values above
    /// `i64::MAX` are never stored and are reported as missing.
    pub fn lookup(&mut self, column: RangeColumn, value: u64) -> Result<bool> {
        let Ok(key) = i64::try_from(value) else {
            return Ok(false);
        };

        self.guarded("lookup", |store| {
            let Self { conn, table_lock, .. } = store;
            let sql = format!("SELECT 1 FROM stream WHERE {} = ?1 LIMIT 1", column.name());

            let guard = table_lock.read(conn)?;
            let found = guard
                .query_row(&sql, [key], |_| Ok(()))
                .optional()
                .wrap_err_with(|| format!("failed to look up {} = {}", column, value))?
                .is_some();
            guard.release()?;
            Ok(found)
        })
    }

    pub fn lookup_by_id(&mut self, id: u64) -> Result<bool> {
        self.lookup(RangeColumn::Id, id)
    }

    /// Header of the stream at `boundary` of id order, or a default header
    /// (id 0) when the store is empty.
    pub fn get_boundary(&mut self, boundary: Boundary) -> Result<StreamHeader> {
        self.guarded("get_boundary", |store| {
            let Self { conn, table_lock, .. } = store;
            let sql = format!(
                "SELECT {} FROM stream ORDER BY id {} LIMIT 1",
                HEADER_COLUMNS,
                boundary.direction()
            );

            let guard = table_lock.read(conn)?;
            let header = guard
                .query_row(&sql, [], header_from_row)
                .optional()
                .wrap_err("failed to fetch boundary stream")?;
            guard.release()?;
            Ok(header.unwrap_or_default())
        })
    }

    pub fn first(&mut self) -> Result<StreamHeader> {
        self.get_boundary(Boundary::First)
    }

    pub fn last(&mut self) -> Result<StreamHeader> {
        self.get_boundary(Boundary::Last)
    }

    /// Number of chunk rows owned by `stream_id`.
    pub fn count_chunks(&mut self, stream_id: u64) -> Result<u64> {
        self.guarded("count_chunks", |store| {
            let Self { conn, table_lock, .. } = store;

            let guard = table_lock.read(conn)?;
            let count: i64 = guard
                .query_row(
                    "SELECT COUNT(*) FROM streamdata WHERE masterid = ?1",
                    [to_sql_int(stream_id)],
                    |row| row.get(0),
                )
                .wrap_err_with(|| format!("failed to count chunks of stream {}", stream_id))?;
            guard.release()?;
            Ok(count.max(0) as u64)
        })
    }

    /// Logs the column layout of both tables through the sink.
    pub fn describe(&mut self) -> Result<()> {
        self.guarded("describe", |store| describe_tables(&store.conn, &store.log))
    }
}
