//! # Table Lock Coordinator
//!
//! READ and WRITE locks over the `stream` and `streamdata` tables jointly.
//!
//! ## Why Two Layers?
//!
//! SQLite locks the whole database file and has no notion of table locks.
//! Readers in WAL mode never block a writer, so a delete could run while a
//! scan is halfway through a batch. The coordinator restores the
//! "reads block deletes, deletes block reads" discipline:
//!
//! ```text
//!                     ┌────────────────────────────────────────┐
//!  READ   ──────────► │ 1. process lock (shared)               │
//!                     │ 2. BEGIN DEFERRED  (snapshot per batch)│
//!                     └────────────────────────────────────────┘
//!                     ┌────────────────────────────────────────┐
//!  WRITE  ──────────► │ 1. process lock (exclusive)            │
//!                     │ 2. BEGIN IMMEDIATE (write reservation) │
//!                     └────────────────────────────────────────┘
//! ```
//!
//! The process lock is a `parking_lot::RwLock` shared by every store opened
//! on the same canonical database path. Stores are registered in a global
//! map holding `Weak` references, so the lock state disappears once the
//! last store on a path is dropped.
//!
//! ## Lock Ordering
//!
//! The process lock is always taken before the backend transaction begins,
//! and released after it ends. Guard fields are declared transaction first
//! so the transaction is finished (committed or rolled back) before the
//! process lock is released.
//!
//! ## Scope
//!
//! One guard covers one statement group: a scan batch, a lookup, a boundary
//! query, or a delete. Dropping a guard without [`release`](TableReadGuard::release)
//! rolls the transaction back.
//!
//! The write pipeline does not take a table lock.

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use eyre::{Result, WrapErr};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Statistics for monitoring table lock usage.
#[derive(Debug, Default)]
pub struct LockStats {
    pub read_locks_acquired: AtomicU64,
    pub read_locks_contended: AtomicU64,
    pub write_locks_acquired: AtomicU64,
    pub write_locks_contended: AtomicU64,
}

impl LockStats {
    pub fn record_read_lock(&self, contended: bool) {
        self.read_locks_acquired.fetch_add(1, Ordering::Relaxed);
        if contended {
            self.read_locks_contended.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_write_lock(&self, contended: bool) {
        self.write_locks_acquired.fetch_add(1, Ordering::Relaxed);
        if contended {
            self.write_locks_contended.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn reads(&self) -> u64 {
        self.read_locks_acquired.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.write_locks_acquired.load(Ordering::Relaxed)
    }
}

/// Lock state shared by every store on one database path.
#[derive(Debug, Default)]
struct TableLockState {
    lock: RwLock<()>,
    stats: LockStats,
}

type Registry = Mutex<HashMap<PathBuf, Weak<TableLockState>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Per-store handle on the shared lock state of its database path.
#[derive(Debug, Clone)]
pub(crate) struct TableLock {
    state: Arc<TableLockState>,
}

impl TableLock {
    pub(crate) fn for_path(path: &Path) -> Self {
        let key = lock_key(path);
        let mut map = registry().lock();
        map.retain(|_, state| state.strong_count() > 0);

        if let Some(state) = map.get(&key).and_then(Weak::upgrade) {
            return Self { state };
        }

        let state = Arc::new(TableLockState::default());
        map.insert(key, Arc::downgrade(&state));
        Self { state }
    }

    /// Acquires the READ lock and begins a deferred transaction on `conn`.
    pub(crate) fn read<'a>(&'a self, conn: &'a Connection) -> Result<TableReadGuard<'a>> {
        let (lock, contended) = match self.state.lock.try_read() {
            Some(guard) => (guard, false),
            None => (self.state.lock.read(), true),
        };
        self.state.stats.record_read_lock(contended);

        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)
            .wrap_err("failed to acquire READ lock")?;
        Ok(TableReadGuard { tx, _lock: lock })
    }

    /// Acquires the WRITE lock and begins an immediate transaction on `conn`.
    pub(crate) fn write<'a>(&'a self, conn: &'a Connection) -> Result<TableWriteGuard<'a>> {
        let (lock, contended) = match self.state.lock.try_write() {
            Some(guard) => (guard, false),
            None => (self.state.lock.write(), true),
        };
        self.state.stats.record_write_lock(contended);

        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .wrap_err("failed to acquire WRITE lock")?;
        Ok(TableWriteGuard { tx, _lock: lock })
    }

    pub(crate) fn stats(&self) -> &LockStats {
        &self.state.stats
    }

    #[cfg(test)]
    fn shares_state_with(&self, other: &TableLock) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// READ lock over both tables. Derefs to the locked connection.
pub(crate) struct TableReadGuard<'a> {
    tx: Transaction<'a>,
    _lock: RwLockReadGuard<'a, ()>,
}

impl TableReadGuard<'_> {
    pub(crate) fn release(self) -> Result<()> {
        let Self { tx, _lock } = self;
        tx.commit().wrap_err("failed to release READ lock")
    }
}

impl Deref for TableReadGuard<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.tx
    }
}

/// WRITE lock over both tables. Derefs to the locked connection.
pub(crate) struct TableWriteGuard<'a> {
    tx: Transaction<'a>,
    _lock: RwLockWriteGuard<'a, ()>,
}

impl TableWriteGuard<'_> {
    /// Commits the guarded statements and releases the lock.
    pub(crate) fn release(self) -> Result<()> {
        let Self { tx, _lock } = self;
        tx.commit().wrap_err("failed to release WRITE lock")
    }
}

impl Deref for TableWriteGuard<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.tx
    }
}
