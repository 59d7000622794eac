//! # dbstream Configuration Module
//!
//! This module centralizes the engine constants. Runtime options (batch size,
//! chunk size, busy timeout, journal mode, diagnostic sink) are set through
//! [`StoreBuilder`](crate::StoreBuilder) and default to the values defined
//! here.
//!
//! ## Coupled Values
//!
//! The chunk size, the read buffer size and the reusable buffer capacity are
//! coupled: a chunk larger than the buffer cannot be written in one row. The
//! constants module checks these relations at compile time.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
