//! Runs rusqlite work on tokio's blocking pool so handlers never hold the
//! connection mutex on a runtime worker.

use std::sync::Arc;

use tokio::task;
use triage_store::Store;

use crate::error_handler::{AppError, AppResult};

/// Runs `op` against the store on a blocking thread.
///
/// `op` may return any error convertible into [`AppError`], usually
/// [`triage_store::StoreError`] or [`AppError`] itself.
pub async fn run_blocking<T, E, F>(store: &Arc<Store>, op: F) -> AppResult<T>
where
    F: FnOnce(&Store) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    let store = Arc::clone(store);
    task::spawn_blocking(move || op(&store))
        .await
        .map_err(AppError::StoreTask)?
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use triage_store::StoreError;

    use super::*;

    #[tokio::test]
    async fn store_errors_come_back_as_app_errors() {
        let store = Arc::new(Store::open_in_memory().unwrap());

        let profile = run_blocking(&store, |s| {
            s.ensure_user("u1")?;
            s.get_or_create_profile("u1")
        })
        .await
        .unwrap();
        assert_eq!(profile.user_id, "u1");

        let err = run_blocking(&store, |_| Err::<(), _>(StoreError::LockPoisoned))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::LockPoisoned)));
    }
}
