//! # Stream Data Model
//!
//! Types shared by every engine operation:
//!
//! - [`StreamHeader`]: metadata of one stored blob
//! - [`RangeColumn`]: header column a scan, lookup or delete is keyed on
//! - [`KeyRange`]: lower/upper bounds with inclusive flags
//! - [`Boundary`]: which end of the id order `get_boundary` returns
//! - [`StreamVisitor`]: caller-side receiver of scanned streams
//!
//! ## Bounds
//!
//! A bound value of 0 means "unbounded on that side". The range with both
//! bounds at 0 covers every stream and is the only range for which
//! identity counters can be reset on delete.
//!
//! ```text
//! KeyRange { first: 5, first_inclusive: false, last: 9, last_inclusive: true }
//!     ->  column > 5 AND column <= 9
//!
//! KeyRange { first: 0, .., last: 9, last_inclusive: false }
//!     ->  column < 9
//! ```

mod visitor;

pub use visitor::{ReadEvent, ScanSummary, StreamVisitor};

use std::fmt;
use std::str::FromStr;

use eyre::{bail, ensure, Result};

use crate::config::MAX_DESCRIPTION_LEN;

/// Metadata of one stream.
///
/// `id` is assigned by the store when a write commits; a header with id 0
/// describes no stream (the empty result of a boundary query). Written
/// timestamps start at 1, since 0 is the open bound of a [`KeyRange`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHeader {
    pub id: u64,
    pub description: String,
    pub stream_type: u8,
    pub timestamp: u64,
    pub size: u64,
}

impl StreamHeader {
    /// Creates a header for a new stream. `size` is the declared payload
    /// length; it is required for [`write_bytes`](crate::StreamStore::write_bytes)
    /// and informational for streaming writes.
    pub fn new(description: impl Into<String>, stream_type: u8, timestamp: u64, size: u64) -> Self {
        Self {
            id: 0,
            description: description.into(),
            stream_type,
            timestamp,
            size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub(crate) fn validate_for_write(&self) -> Result<()> {
        ensure!(
            self.description.len() <= MAX_DESCRIPTION_LEN,
            "description is {} bytes long, the limit is {}",
            self.description.len(),
            MAX_DESCRIPTION_LEN
        );
        ensure!(
            self.timestamp > 0,
            "timestamp 0 is reserved: a range bound of 0 is open"
        );
        ensure!(
            i64::try_from(self.timestamp).is_ok(),
            "timestamp {} is out of range",
            self.timestamp
        );
        Ok(())
    }
}

/// Header column used for ordering and range predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeColumn {
    Id,
    Timestamp,
}

impl RangeColumn {
    pub fn name(self) -> &'static str {
        match self {
            RangeColumn::Id => "id",
            RangeColumn::Timestamp => "timestamp",
        }
    }

    /// The value of this column in `header`.
    pub fn value_of(self, header: &StreamHeader) -> u64 {
        match self {
            RangeColumn::Id => header.id,
            RangeColumn::Timestamp => header.timestamp,
        }
    }

    /// ORDER BY clause body. Timestamps are not unique, so rows sharing a
    /// timestamp are ordered by id.
    pub(crate) fn order_by(self) -> &'static str {
        match self {
            RangeColumn::Id => "id ASC",
            RangeColumn::Timestamp => "timestamp ASC, id ASC",
        }
    }
}

impl fmt::Display for RangeColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RangeColumn {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(RangeColumn::Id),
            "timestamp" => Ok(RangeColumn::Timestamp),
            _ => bail!("Invalid column='{}': streams can only be ordered by id or timestamp", s),
        }
    }
}

/// Range over a [`RangeColumn`]. A bound of 0 leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub first: u64,
    pub first_inclusive: bool,
    pub last: u64,
    pub last_inclusive: bool,
}

impl KeyRange {
    pub const fn new(first: u64, first_inclusive: bool, last: u64, last_inclusive: bool) -> Self {
        Self {
            first,
            first_inclusive,
            last,
            last_inclusive,
        }
    }

    /// Every stream.
    pub const fn all() -> Self {
        Self::new(0, true, 0, true)
    }

    /// `first..` inclusive, no upper bound.
    pub const fn starting_at(first: u64) -> Self {
        Self::new(first, true, 0, true)
    }

    /// `first..=last`.
    pub const fn between(first: u64, last: u64) -> Self {
        Self::new(first, true, last, true)
    }

    /// Exactly `value`.
    pub const fn single(value: u64) -> Self {
        Self::new(value, true, value, true)
    }

    pub fn is_all(&self) -> bool {
        self.first == 0 && self.last == 0
    }

    pub(crate) fn lower(&self) -> Option<(u64, bool)> {
        (self.first > 0).then_some((self.first, self.first_inclusive))
    }

    pub(crate) fn upper(&self) -> Option<(u64, bool)> {
        (self.last > 0).then_some((self.last, self.last_inclusive))
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::all()
    }
}

/// End of the id order returned by [`get_boundary`](crate::StreamStore::get_boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    First,
    Last,
}

impl Boundary {
    pub(crate) fn direction(self) -> &'static str {
        match self {
            Boundary::First => "ASC",
            Boundary::Last => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_column_parses_known_names() {
        assert_eq!("id".parse::<RangeColumn>().unwrap(), RangeColumn::Id);
        assert_eq!(" Timestamp ".parse::<RangeColumn>().unwrap(), RangeColumn::Timestamp);
    }

    #[test]
    fn range_column_rejects_other_columns() {
        let err = "size".parse::<RangeColumn>().unwrap_err();
        assert!(err.to_string().contains("Invalid column='size'"));
        assert!("descr".parse::<RangeColumn>().is_err());
    }

    #[test]
    fn zero_bounds_are_open() {
        let range = KeyRange::all();
        assert!(range.is_all());
        assert_eq!(range.lower(), None);
        assert_eq!(range.upper(), None);

        let range = KeyRange::new(4, false, 0, true);
        assert_eq!(range.lower(), Some((4, false)));
        assert_eq!(range.upper(), None);
        assert!(!range.is_all());
    }

    #[test]
    fn single_range_is_inclusive_on_both_sides() {
        let range = KeyRange::single(7);
        assert_eq!(range.lower(), Some((7, true)));
        assert_eq!(range.upper(), Some((7, true)));
    }

    #[test]
    fn header_validation_limits_description() {
        let ok = StreamHeader::new("a".repeat(MAX_DESCRIPTION_LEN), 0, 1, 0);
        assert!(ok.validate_for_write().is_ok());

        let too_long = StreamHeader::new("a".repeat(MAX_DESCRIPTION_LEN + 1), 0, 1, 0);
        assert!(too_long.validate_for_write().is_err());

        let bad_ts = StreamHeader::new("x", 0, u64::MAX, 0);
        assert!(bad_ts.validate_for_write().is_err());

        let zero_ts = StreamHeader::new("x", 0, 0, 0);
        assert!(zero_ts.validate_for_write().is_err());
    }

    #[test]
    fn value_of_picks_column() {
        let header = StreamHeader {
            id: 3,
            timestamp: 99,
            ..Default::default()
        };
        assert_eq!(RangeColumn::Id.value_of(&header), 3);
        assert_eq!(RangeColumn::Timestamp.value_of(&header), 99);
    }
}
