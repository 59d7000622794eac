//! # Store Lifecycle
//!
//! Dropping a store closes its connection and releases its handle on the
//! shared table lock. `close()` does the same but reports a failing close
//! instead of ignoring it.
//!
//! ```ignore
//! let mut store = StreamStore::open("./streams.db")?;
//! // ... use store ...
//! store.close()?;
//! ```

use eyre::{Result, WrapErr};

use super::StreamStore;
use crate::config::LOG_PREFIX;

impl StreamStore {
    pub fn close(self) -> Result<()> {
        let Self { conn, path, log, .. } = self;
        let result = conn
            .close()
            .map_err(|(_, err)| err)
            .wrap_err_with(|| format!("failed to close '{}'", path.display()));

        match &result {
            Ok(()) => log.info(format!("{}: closed '{}'", LOG_PREFIX, path.display())),
            Err(err) => log.error(format!("ERROR: close: {:#}", err)),
        }
        result
    }
}
