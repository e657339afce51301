use rusqlite::{OptionalExtension, Row, params};
use tracing::info;
use uuid::Uuid;

use crate::{
    Store,
    codec::{col_parse, col_ts, col_uuid, now, ts},
    errors::StoreResult,
    models::{BrainDump, NewDump, word_count},
};

/// History page size when the caller gives none.
pub const DEFAULT_LIST_LIMIT: usize = 50;

const DUMP_COLUMNS: &str =
    "id, user_id, created_at, energy_level, input_text, source, word_count";

fn map_dump(row: &Row<'_>) -> rusqlite::Result<BrainDump> {
    Ok(BrainDump {
        id: col_uuid(row, 0)?,
        user_id: row.get(1)?,
        created_at: col_ts(row, 2)?,
        energy_level: col_parse(row, 3)?,
        input_text: row.get(4)?,
        source: col_parse(row, 5)?,
        word_count: row.get(6)?,
    })
}

impl Store {
    /// Stores a new dump; `word_count` is derived here and never updated.
    pub fn insert_dump(&self, new: NewDump<'_>) -> StoreResult<BrainDump> {
        let dump = BrainDump {
            id: Uuid::new_v4(),
            user_id: new.user_id.to_string(),
            created_at: now(),
            energy_level: new.energy_level,
            input_text: new.input_text.to_string(),
            source: new.source,
            word_count: word_count(new.input_text),
        };

        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO brain_dumps ({DUMP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                dump.id.to_string(),
                dump.user_id,
                ts(&dump.created_at),
                dump.energy_level.as_str(),
                dump.input_text,
                dump.source.as_str(),
                dump.word_count,
            ],
        )?;
        info!(
            dump_id = %dump.id,
            user_id = %dump.user_id,
            energy = %dump.energy_level,
            words = dump.word_count,
            "brain dump stored"
        );
        Ok(dump)
    }

    /// The dump, only if `user_id` owns it.
    pub fn get_dump_for_user(&self, user_id: &str, dump_id: Uuid) -> StoreResult<Option<BrainDump>> {
        let conn = self.conn()?;
        let dump = conn
            .query_row(
                &format!("SELECT {DUMP_COLUMNS} FROM brain_dumps WHERE id = ?1 AND user_id = ?2"),
                params![dump_id.to_string(), user_id],
                map_dump,
            )
            .optional()?;
        Ok(dump)
    }

    /// Newest first, at most `limit` rows.
    pub fn list_dumps_for_user(&self, user_id: &str, limit: usize) -> StoreResult<Vec<BrainDump>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DUMP_COLUMNS} FROM brain_dumps
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user_id, limit], map_dump)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
