//! Table layout reporting.
//!
//! Output format, one sink line per row:
//!
//! ```text
//! Table 'stream':
//! +...........................+......................+
//! | Field                     | Type                 |
//! +...........................+......................+
//! | id                        | INTEGER              |
//! +...........................+......................+
//! ```

use eyre::{Result, WrapErr};
use rusqlite::Connection;

use super::TABLES;
use crate::config::LOG_PREFIX;
use crate::diagnostics::Diagnostics;

pub const LAYOUT_SEPARATOR: &str = "+...........................+......................+";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: String,
    pub decl_type: String,
}

/// Columns of `table` in declaration order. Empty when the table is missing.
pub(crate) fn table_layout(conn: &Connection, table: &str) -> Result<Vec<ColumnLayout>> {
    let mut stmt = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .wrap_err("failed to prepare table layout query")?;
    let rows = stmt.query_map([table], |row| {
        Ok(ColumnLayout {
            name: row.get(0)?,
            decl_type: row.get(1)?,
        })
    })?;

    let mut columns = Vec::new();
    for column in rows {
        columns.push(column?);
    }
    Ok(columns)
}

pub fn format_layout(table: &str, columns: &[ColumnLayout]) -> Vec<String> {
    let mut lines = Vec::with_capacity(columns.len() + 5);
    lines.push(format!("{}: Table '{}':", LOG_PREFIX, table));
    lines.push(LAYOUT_SEPARATOR.to_string());
    lines.push(format!("| {:<25} | {:<20} |", "Field", "Type"));
    lines.push(LAYOUT_SEPARATOR.to_string());
    for column in columns {
        lines.push(format!("| {:<25} | {:<20} |", column.name, column.decl_type));
    }
    lines.push(LAYOUT_SEPARATOR.to_string());
    lines
}

pub(crate) fn describe_tables(conn: &Connection, log: &Diagnostics) -> Result<()> {
    for spec in &TABLES {
        let columns = table_layout(conn, spec.name)?;
        if columns.is_empty() {
            log.info(format!("{}: Table '{}' does not exist.", LOG_PREFIX, spec.name));
            continue;
        }
        for line in format_layout(spec.name, &columns) {
            log.info(line);
        }
    }
    Ok(())
}
