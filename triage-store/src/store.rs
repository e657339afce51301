use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{
    db::{open_db, open_db_in_memory},
    errors::{StoreError, StoreResult},
};

/// Shared handle over one SQLite connection.
///
/// `Connection` is `Send` but not `Sync`, so it sits behind a `Mutex`; every
/// operation takes the lock synchronously and never holds it across `.await`.
/// Share it as `Arc<Store>`.
pub struct Store {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already bootstrapped connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub(crate) fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Liveness check used by `/health`.
    pub fn health_check(&self) -> bool {
        let Ok(conn) = self.conn() else {
            return false;
        };
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
            .is_ok_and(|v| v == 1)
    }
}
