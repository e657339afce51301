use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::{error, info};

use super::migrations::apply_migrations;
use crate::errors::StoreResult;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a database file and applies pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> StoreResult<Connection> {
    let path = path.as_ref();
    let started = Instant::now();
    finish(Connection::open(path).map_err(Into::into), "file", started, Some(path))
}

/// Opens a private in-memory database with the full schema.
pub fn open_db_in_memory() -> StoreResult<Connection> {
    let started = Instant::now();
    finish(Connection::open_in_memory().map_err(Into::into), "memory", started, None)
}

fn finish(
    conn: StoreResult<Connection>,
    mode: &'static str,
    started: Instant,
    path: Option<&Path>,
) -> StoreResult<Connection> {
    let result = conn.and_then(|mut c| bootstrap(&mut c).map(|()| c));
    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => info!(mode, ?path, duration_ms, "database opened"),
        Err(e) => error!(mode, ?path, duration_ms, error = %e, "database open failed"),
    }
    result
}

fn bootstrap(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}
