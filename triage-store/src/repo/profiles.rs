use rusqlite::{Connection, Row, params};
use tracing::info;

use crate::{
    Store,
    codec::{col_parse, col_ts, now, ts},
    errors::{StoreError, StoreResult},
    models::{Profile, ProfileUpdate},
};

pub const DEFAULT_TIMEZONE: &str = "America/New_York";

const PROFILE_COLUMNS: &str = "user_id, default_energy_level, timezone, email_opt_in, \
     neurodivergent_focus, created_at, updated_at";

fn map_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: row.get(0)?,
        default_energy_level: col_parse(row, 1)?,
        timezone: row.get(2)?,
        email_opt_in: row.get(3)?,
        neurodivergent_focus: col_parse(row, 4)?,
        created_at: col_ts(row, 5)?,
        updated_at: col_ts(row, 6)?,
    })
}

/// Inserts the default row if missing and returns the stored profile.
fn ensure_profile(conn: &Connection, user_id: &str) -> StoreResult<Profile> {
    let stamp = ts(&now());
    let created = conn.execute(
        "INSERT OR IGNORE INTO profiles (user_id, timezone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![user_id, DEFAULT_TIMEZONE, stamp],
    )?;
    if created > 0 {
        info!(user_id, "profile created with defaults");
    }
    Ok(conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
        params![user_id],
        map_profile,
    )?)
}

impl Store {
    /// Profile of the user, created with defaults on first access.
    pub fn get_or_create_profile(&self, user_id: &str) -> StoreResult<Profile> {
        let conn = self.conn()?;
        ensure_profile(&conn, user_id)
    }

    /// Applies the set fields of `update`; a blank timezone is rejected.
    pub fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> StoreResult<Profile> {
        let timezone = match update.timezone.as_deref().map(str::trim) {
            Some("") => {
                return Err(StoreError::Invalid {
                    field: "timezone",
                    reason: "must not be blank".into(),
                });
            }
            other => other,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_profile(&tx, user_id)?;
        tx.execute(
            "UPDATE profiles SET
                 default_energy_level = COALESCE(?2, default_energy_level),
                 timezone = COALESCE(?3, timezone),
                 email_opt_in = COALESCE(?4, email_opt_in),
                 neurodivergent_focus = COALESCE(?5, neurodivergent_focus),
                 updated_at = ?6
             WHERE user_id = ?1",
            params![
                user_id,
                update.default_energy_level.map(|e| e.as_str()),
                timezone,
                update.email_opt_in,
                update.neurodivergent_focus.map(|f| f.as_str()),
                ts(&now()),
            ],
        )?;
        let profile = ensure_profile(&tx, user_id)?;
        tx.commit()?;
        Ok(profile)
    }
}
