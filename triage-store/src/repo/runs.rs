//! Triage runs and the atomic run + tasks write.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tracing::{info, warn};
use triage::{ExtractedTask, PROMPT_VERSION, TriageResult};
use uuid::Uuid;

use crate::{
    Store,
    codec::{col_json, col_ts, col_unsigned, col_uuid, now, ts},
    errors::{StoreError, StoreResult, is_unique_violation},
    models::{BrainDump, TriageRun},
};

/// Action plan shown while a deferred run is still waiting for the model.
pub const PLACEHOLDER_ACTION_PLAN: &str = "Processing your brain dump…";

const RUN_COLUMNS: &str = "id, dump_id, user_id, created_at, model_name, prompt_version, \
     temperature, top_3_task_ids, blockers, action_plan_md, summary, detected_crisis, \
     latency_ms, tokens_in, tokens_out, error_detail";

fn map_run(row: &Row<'_>) -> rusqlite::Result<TriageRun> {
    let top_ids: Vec<String> = col_json(row, 7)?;
    let top_3_task_ids = top_ids
        .iter()
        .map(|s| Uuid::parse_str(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(TriageRun {
        id: col_uuid(row, 0)?,
        dump_id: col_uuid(row, 1)?,
        user_id: row.get(2)?,
        created_at: col_ts(row, 3)?,
        model_name: row.get(4)?,
        prompt_version: row.get(5)?,
        temperature: row.get::<_, f64>(6)? as f32,
        top_3_task_ids,
        blockers: col_json(row, 8)?,
        action_plan_md: row.get(9)?,
        summary: row.get(10)?,
        detected_crisis: row.get(11)?,
        latency_ms: col_unsigned(row, 12)?,
        tokens_in: col_unsigned(row, 13)?,
        tokens_out: col_unsigned(row, 14)?,
        error_detail: row.get(15)?,
    })
}

/// Tasks with their pre-generated ids plus the resolved top-3 id list.
struct TaskPlan<'a> {
    tasks: Vec<(Uuid, &'a ExtractedTask)>,
    top_3_task_ids: Vec<Uuid>,
}

impl<'a> TaskPlan<'a> {
    fn new(result: &'a TriageResult) -> Self {
        let tasks: Vec<(Uuid, &ExtractedTask)> = result
            .outcome
            .tasks
            .iter()
            .map(|t| (Uuid::new_v4(), t))
            .collect();
        // Indices without a created task are skipped; order follows the model.
        let top_3_task_ids = result
            .outcome
            .top_3_indices
            .iter()
            .filter_map(|&idx| {
                let idx = usize::try_from(idx).ok()?;
                tasks
                    .iter()
                    .find(|(_, t)| t.position == idx)
                    .map(|(id, _)| *id)
            })
            .collect();
        Self {
            tasks,
            top_3_task_ids,
        }
    }
}

fn run_from_result(
    id: Uuid,
    dump: &BrainDump,
    created_at: DateTime<Utc>,
    result: &TriageResult,
    top_3_task_ids: Vec<Uuid>,
) -> TriageRun {
    TriageRun {
        id,
        dump_id: dump.id,
        user_id: dump.user_id.clone(),
        created_at,
        model_name: result.model_name.clone(),
        prompt_version: result.prompt_version.to_string(),
        temperature: result.temperature,
        top_3_task_ids,
        blockers: result.outcome.blockers.clone(),
        action_plan_md: result.outcome.action_plan.clone(),
        summary: result.outcome.summary.clone(),
        detected_crisis: result.outcome.detected_crisis,
        latency_ms: result.latency_ms,
        tokens_in: result.usage.prompt_tokens,
        tokens_out: result.usage.completion_tokens,
        error_detail: result.failure.as_ref().map(|f| f.marker().to_string()),
    }
}

fn id_list(ids: &[Uuid]) -> StoreResult<String> {
    let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    Ok(serde_json::to_string(&ids)?)
}

fn opt_i64<T: Into<u64>>(v: Option<T>) -> Option<i64> {
    v.map(|v| i64::try_from(v.into()).unwrap_or(i64::MAX))
}

fn insert_run(tx: &Transaction<'_>, run: &TriageRun) -> StoreResult<()> {
    let inserted = tx.execute(
        &format!(
            "INSERT INTO triage_runs ({RUN_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            run.id.to_string(),
            run.dump_id.to_string(),
            run.user_id,
            ts(&run.created_at),
            run.model_name,
            run.prompt_version,
            f64::from(run.temperature),
            id_list(&run.top_3_task_ids)?,
            serde_json::to_string(&run.blockers)?,
            run.action_plan_md,
            run.summary,
            run.detected_crisis,
            opt_i64(run.latency_ms),
            opt_i64(run.tokens_in),
            opt_i64(run.tokens_out),
            run.error_detail,
        ],
    );
    match inserted {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateRun {
            dump_id: run.dump_id,
            prompt_version: run.prompt_version.clone(),
        }),
        Err(e) => Err(e.into()),
    }
}

fn insert_tasks(
    tx: &Transaction<'_>,
    run: &TriageRun,
    result: &TriageResult,
    plan: &TaskPlan<'_>,
) -> StoreResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO triage_tasks (
             id, triage_run_id, user_id, created_at, position, title, micro_steps,
             estimated_minutes, rank_score, rank_order, is_top3, best_energy,
             friction_score, category, evidence_spans
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )?;
    let created_at = ts(&run.created_at);
    for (id, task) in &plan.tasks {
        let rank_order = result.outcome.rank_order_for(task.position);
        stmt.execute(params![
            id.to_string(),
            run.id.to_string(),
            run.user_id,
            created_at,
            i64::try_from(task.position).unwrap_or(i64::MAX),
            task.title,
            serde_json::to_string(&task.micro_steps)?,
            opt_i64(task.estimated_minutes),
            task.rank_score,
            rank_order.map(i64::from),
            rank_order.is_some(),
            task.best_energy.map(|e| e.as_str()),
            task.friction_score,
            task.category,
            serde_json::to_string(&task.evidence_spans)?,
        ])?;
    }
    Ok(())
}

pub(crate) fn load_run(conn: &Connection, run_id: Uuid) -> StoreResult<Option<TriageRun>> {
    Ok(conn
        .query_row(
            &format!("SELECT {RUN_COLUMNS} FROM triage_runs WHERE id = ?1"),
            params![run_id.to_string()],
            map_run,
        )
        .optional()?)
}

impl Store {
    /// Persists one pipeline result as a run plus its tasks, atomically.
    ///
    /// Task ids are generated before anything is written, so the run row
    /// carries its final top-3 list from the start.
    ///
    /// # Errors
    /// [`StoreError::DuplicateRun`] when the dump already has a run for this
    /// prompt version; the existing run is left untouched.
    pub fn save_triage_result(&self, dump: &BrainDump, result: &TriageResult) -> StoreResult<TriageRun> {
        let plan = TaskPlan::new(result);
        let run = run_from_result(
            Uuid::new_v4(),
            dump,
            now(),
            result,
            plan.top_3_task_ids.clone(),
        );

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_run(&tx, &run)?;
        insert_tasks(&tx, &run, result, &plan)?;
        tx.commit()?;

        info!(
            dump_id = %run.dump_id,
            run_id = %run.id,
            tasks = plan.tasks.len(),
            top3 = run.top_3_task_ids.len(),
            latency_ms = ?run.latency_ms,
            failed = run.error_detail.is_some(),
            "triage run saved"
        );
        Ok(run)
    }

    /// Reserves the dump's run slot before the model has answered.
    pub fn insert_placeholder_run(&self, dump: &BrainDump, model_name: &str) -> StoreResult<TriageRun> {
        let run = TriageRun {
            id: Uuid::new_v4(),
            dump_id: dump.id,
            user_id: dump.user_id.clone(),
            created_at: now(),
            model_name: model_name.to_string(),
            prompt_version: PROMPT_VERSION.to_string(),
            temperature: triage::TRIAGE_TEMPERATURE,
            top_3_task_ids: Vec::new(),
            blockers: Vec::new(),
            action_plan_md: PLACEHOLDER_ACTION_PLAN.to_string(),
            summary: None,
            detected_crisis: false,
            latency_ms: None,
            tokens_in: None,
            tokens_out: None,
            error_detail: None,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_run(&tx, &run)?;
        tx.commit()?;
        info!(dump_id = %run.dump_id, run_id = %run.id, "placeholder run reserved");
        Ok(run)
    }

    /// Fills a placeholder run with a pipeline result, replacing any tasks.
    pub fn complete_placeholder_run(&self, run_id: Uuid, result: &TriageResult) -> StoreResult<TriageRun> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let Some(existing) = load_run(&tx, run_id)? else {
            return Err(StoreError::not_found("triage run", run_id));
        };
        let plan = TaskPlan::new(result);
        let run = TriageRun {
            model_name: result.model_name.clone(),
            temperature: result.temperature,
            top_3_task_ids: plan.top_3_task_ids.clone(),
            blockers: result.outcome.blockers.clone(),
            action_plan_md: result.outcome.action_plan.clone(),
            summary: result.outcome.summary.clone(),
            detected_crisis: result.outcome.detected_crisis,
            latency_ms: result.latency_ms,
            tokens_in: result.usage.prompt_tokens,
            tokens_out: result.usage.completion_tokens,
            error_detail: result.failure.as_ref().map(|f| f.marker().to_string()),
            ..existing
        };

        let removed = tx.execute(
            "DELETE FROM triage_tasks WHERE triage_run_id = ?1",
            params![run_id.to_string()],
        )?;
        if removed > 0 {
            warn!(run_id = %run_id, removed, "placeholder run already had tasks; replacing them");
        }
        tx.execute(
            "UPDATE triage_runs SET
                 model_name = ?2, temperature = ?3, top_3_task_ids = ?4, blockers = ?5,
                 action_plan_md = ?6, summary = ?7, detected_crisis = ?8, latency_ms = ?9,
                 tokens_in = ?10, tokens_out = ?11, error_detail = ?12
             WHERE id = ?1",
            params![
                run_id.to_string(),
                run.model_name,
                f64::from(run.temperature),
                id_list(&run.top_3_task_ids)?,
                serde_json::to_string(&run.blockers)?,
                run.action_plan_md,
                run.summary,
                run.detected_crisis,
                opt_i64(run.latency_ms),
                opt_i64(run.tokens_in),
                opt_i64(run.tokens_out),
                run.error_detail,
            ],
        )?;
        insert_tasks(&tx, &run, result, &plan)?;
        tx.commit()?;

        info!(
            dump_id = %run.dump_id,
            run_id = %run.id,
            tasks = plan.tasks.len(),
            latency_ms = ?run.latency_ms,
            "placeholder run completed"
        );
        Ok(run)
    }

    /// Most recent run of the dump, if any.
    pub fn latest_run_for_dump(&self, dump_id: Uuid) -> StoreResult<Option<TriageRun>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM triage_runs
                     WHERE dump_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![dump_id.to_string()],
                map_run,
            )
            .optional()?)
    }

    /// The run for `(dump, prompt_version)`, if one exists.
    pub fn find_run(&self, dump_id: Uuid, prompt_version: &str) -> StoreResult<Option<TriageRun>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM triage_runs WHERE dump_id = ?1 AND prompt_version = ?2"
                ),
                params![dump_id.to_string(), prompt_version],
                map_run,
            )
            .optional()?)
    }

    /// The run, only if `user_id` owns it.
    pub fn get_run_for_user(&self, user_id: &str, run_id: Uuid) -> StoreResult<Option<TriageRun>> {
        let conn = self.conn()?;
        Ok(load_run(&conn, run_id)?.filter(|r| r.user_id == user_id))
    }

    pub fn count_runs_for_dump(&self, dump_id: Uuid) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM triage_runs WHERE dump_id = ?1",
            params![dump_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
