//! # Range Predicates and Scan Cursor
//!
//! Builds the WHERE clause shared by scans and deletes, and the pagination
//! cursor that moves a scan from one batch to the next.
//!
//! ## Predicate Shape
//!
//! ```text
//! bounds                              WHERE clause
//! ──────────────────────────────────  ─────────────────────────────────────
//! first=0, last=0                     (none)
//! first=5 incl, last=0                col >= ?
//! first=5 excl, last=9 incl           col > ? AND col <= ?
//! cursor(ts=7, id=12), last=9 excl    (timestamp > ? OR (timestamp = ? AND id > ?)) AND timestamp < ?
//! ```
//!
//! The same column is used for both bounds. Once a scan has processed a
//! batch, the cursor replaces the lower bound: it always lies past it.
//!
//! ## Timestamp Tie-Breaking
//!
//! Timestamps are not unique. A plain `timestamp > last` cursor would skip
//! every remaining row that shares the last processed timestamp, so the
//! timestamp cursor also carries the last processed id and scans are
//! ordered by `(timestamp, id)`.
//!
//! Bind values are `i64`; `u64` bounds above `i64::MAX` saturate.

use rusqlite::types::ToSql;
use rusqlite::Row;
use smallvec::SmallVec;

use crate::stream::{KeyRange, RangeColumn, StreamHeader};

pub(crate) const HEADER_COLUMNS: &str = "id, descr, type, size, timestamp";

pub(crate) fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn column_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

/// Maps a row selected with [`HEADER_COLUMNS`].
pub(crate) fn header_from_row(row: &Row<'_>) -> rusqlite::Result<StreamHeader> {
    Ok(StreamHeader {
        id: column_u64(row, 0)?,
        description: row.get(1)?,
        stream_type: row.get(2)?,
        size: column_u64(row, 3)?,
        timestamp: column_u64(row, 4)?,
    })
}

/// WHERE clause plus its positional bind values.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Predicate {
    terms: SmallVec<[String; 3]>,
    params: SmallVec<[i64; 4]>,
}

impl Predicate {
    pub(crate) fn for_range(column: RangeColumn, range: &KeyRange) -> Self {
        let mut predicate = Self::default();
        if let Some((value, inclusive)) = range.lower() {
            predicate.push_bound(column, if inclusive { ">=" } else { ">" }, value);
        }
        if let Some((value, inclusive)) = range.upper() {
            predicate.push_bound(column, if inclusive { "<=" } else { "<" }, value);
        }
        predicate
    }

    fn push_bound(&mut self, column: RangeColumn, op: &str, value: u64) {
        self.terms.push(format!("{} {} ?", column.name(), op));
        self.params.push(to_sql_int(value));
    }

    /// ` WHERE ...` with a leading space, or an empty string.
    pub(crate) fn where_clause(&self) -> String {
        if self.terms.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.terms.join(" AND "))
        }
    }

    pub(crate) fn params(&self) -> impl Iterator<Item = &dyn ToSql> {
        self.params.iter().map(|p| p as &dyn ToSql)
    }

    #[cfg(test)]
    fn param_values(&self) -> &[i64] {
        &self.params
    }
}

/// Position of a scan in `column` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    column: RangeColumn,
    last_value: Option<u64>,
    last_id: Option<u64>,
}

impl Cursor {
    pub(crate) fn new(column: RangeColumn) -> Self {
        Self {
            column,
            last_value: None,
            last_id: None,
        }
    }

    /// Moves the cursor past `header`.
    pub(crate) fn advance(&mut self, header: &StreamHeader) {
        self.last_value = Some(self.column.value_of(header));
        self.last_id = Some(header.id);
    }

    /// Predicate selecting the rows of `range` not yet visited.
    pub(crate) fn predicate(&self, range: &KeyRange) -> Predicate {
        let (Some(value), Some(id)) = (self.last_value, self.last_id) else {
            return Predicate::for_range(self.column, range);
        };

        let mut predicate = Predicate::default();
        match self.column {
            RangeColumn::Id => {
                predicate.terms.push("id > ?".to_string());
                predicate.params.push(to_sql_int(value));
            }
            RangeColumn::Timestamp => {
                predicate
                    .terms
                    .push("(timestamp > ? OR (timestamp = ? AND id > ?))".to_string());
                predicate.params.push(to_sql_int(value));
                predicate.params.push(to_sql_int(value));
                predicate.params.push(to_sql_int(id));
            }
        }
        if let Some((last, inclusive)) = range.upper() {
            predicate.push_bound(self.column, if inclusive { "<=" } else { "<" }, last);
        }
        predicate
    }
}
