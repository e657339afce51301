use rusqlite::params;
use tracing::info;

use crate::{
    Store,
    codec::{now, ts},
    errors::StoreResult,
};

impl Store {
    /// Creates the user row on first sight; no-op afterwards.
    pub fn ensure_user(&self, user_id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            params![user_id, ts(&now())],
        )?;
        if inserted > 0 {
            info!(user_id, "user created");
        }
        Ok(())
    }

    /// Deletes the user and, by cascade, everything it owns.
    ///
    /// Returns `false` when no such user existed.
    pub fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if deleted > 0 {
            info!(user_id, "user deleted");
        }
        Ok(deleted > 0)
    }
}
