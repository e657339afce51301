use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use crate::{
    Store,
    codec::{col_json, col_parse_opt, col_ts, col_unsigned, col_uuid},
    errors::StoreResult,
    models::{TriageRun, TriageTask},
};

const TASK_COLUMNS: &str = "id, triage_run_id, user_id, created_at, position, title, micro_steps, \
     estimated_minutes, rank_score, rank_order, is_top3, best_energy, friction_score, category, \
     evidence_spans";

fn map_task(row: &Row<'_>) -> rusqlite::Result<TriageTask> {
    Ok(TriageTask {
        id: col_uuid(row, 0)?,
        triage_run_id: col_uuid(row, 1)?,
        user_id: row.get(2)?,
        created_at: col_ts(row, 3)?,
        position: col_unsigned(row, 4)?.unwrap_or_default(),
        title: row.get(5)?,
        micro_steps: col_json(row, 6)?,
        estimated_minutes: col_unsigned(row, 7)?,
        rank_score: row.get(8)?,
        rank_order: col_unsigned(row, 9)?,
        is_top3: row.get(10)?,
        best_energy: col_parse_opt(row, 11)?,
        friction_score: row.get(12)?,
        category: row.get(13)?,
        evidence_spans: col_json(row, 14)?,
    })
}

impl Store {
    /// All tasks of a run: top 3 by rank first, then the rest in model order.
    pub fn tasks_for_run(&self, run_id: Uuid) -> StoreResult<Vec<TriageTask>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM triage_tasks
             WHERE triage_run_id = ?1
             ORDER BY rank_order IS NULL, rank_order, position"
        ))?;
        let rows = stmt.query_map(params![run_id.to_string()], map_task)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Resolves the run's top-3 id list in stored order.
    ///
    /// Ids that are missing or owned by another user are skipped.
    pub fn top3_tasks_for_run(&self, user_id: &str, run: &TriageRun) -> StoreResult<Vec<TriageTask>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM triage_tasks WHERE id = ?1 AND user_id = ?2"
        ))?;
        let mut tasks = Vec::with_capacity(run.top_3_task_ids.len());
        for id in &run.top_3_task_ids {
            if let Some(task) = stmt
                .query_row(params![id.to_string(), user_id], map_task)
                .optional()?
            {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }
}
