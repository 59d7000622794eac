//! Range deleter.
//!
//! Deletes run under the WRITE lock as one statement on the header table;
//! the `ON DELETE CASCADE` foreign key removes the chunks. Identity counters
//! are only reset when the range covers every row.

use eyre::{Result, WrapErr};
use rusqlite::params_from_iter;

use super::query::Predicate;
use super::StreamStore;
use crate::config::{CHUNK_TABLE, LOG_PREFIX, STREAM_TABLE};
use crate::stream::{KeyRange, RangeColumn};

impl StreamStore {
    /// Deletes the streams of `range` and their chunks. Returns the number
    /// of streams removed.
    ///
    /// With `reset_identity` and the all-rows range, the next written stream
    /// gets id 1 again. For any other range the flag has no effect.
    pub fn delete(&mut self, column: RangeColumn, range: KeyRange, reset_identity: bool) -> Result<usize> {
        self.guarded("delete", |store| store.delete_range(column, range, reset_identity))
    }

    pub fn delete_by_id(&mut self, range: KeyRange) -> Result<usize> {
        self.delete(RangeColumn::Id, range, false)
    }

    pub fn delete_all(&mut self, reset_identity: bool) -> Result<usize> {
        self.delete(RangeColumn::Id, KeyRange::all(), reset_identity)
    }

    fn delete_range(&mut self, column: RangeColumn, range: KeyRange, reset_identity: bool) -> Result<usize> {
        let Self {
            conn,
            table_lock,
            log,
            ..
        } = self;

        let predicate = Predicate::for_range(column, &range);
        let sql = format!("DELETE FROM stream{}", predicate.where_clause());
        let reset = reset_identity && range.is_all();

        let guard = table_lock.write(conn)?;
        let deleted = guard
            .execute(&sql, params_from_iter(predicate.params()))
            .wrap_err("failed to delete streams")?;
        if reset {
            guard
                .execute(
                    "DELETE FROM sqlite_sequence WHERE name IN (?1, ?2)",
                    [STREAM_TABLE, CHUNK_TABLE],
                )
                .wrap_err("failed to reset identity counters")?;
        }
        guard.release()?;

        log.info(format!(
            "{}: {} stream(s) deleted by {}{}",
            LOG_PREFIX,
            deleted,
            column,
            if reset { ", identity reset" } else { "" }
        ));
        Ok(deleted)
    }
}
