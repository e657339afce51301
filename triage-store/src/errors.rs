//! Error type of the store.

use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("[Triage Store] sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("[Triage Store] json encode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "[Triage Store] database schema version {db_version} is newer than supported {latest_supported}"
    )]
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },

    /// A run for this `(dump, prompt_version)` already exists.
    #[error("[Triage Store] dump {dump_id} already has a {prompt_version} triage run")]
    DuplicateRun { dump_id: Uuid, prompt_version: String },

    #[error("[Triage Store] {entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    #[error("[Triage Store] invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("[Triage Store] connection lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// True for `UNIQUE` constraint violations.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
