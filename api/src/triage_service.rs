//! Ties the triage pipeline to the store.
//!
//! Every dump gets at most one run per prompt version: a submit creates it,
//! a retriage reuses it.

use std::sync::Arc;

use ai_llm_service::ChatProvider;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, instrument};
use triage::{EnergyLevel, PROMPT_VERSION, run_triage, validate_dump_text};
use triage_store::{
    BrainDump, Email, NewDump, NewEmail, Source, Store, StoreError, TriageRun, TriageTask,
};
use uuid::Uuid;

use crate::{
    core::{app_state::TriageMode, store_task::run_blocking},
    error_handler::{AppError, AppResult},
};

pub const DEFAULT_EMAIL_SUBJECT: &str = "Your Quick Catch action plan";

/// A dump with its latest run and that run's tasks.
#[derive(Debug, Clone, Serialize)]
pub struct DumpView {
    pub dump: BrainDump,
    pub run: Option<TriageRun>,
    /// Resolved from the run's top-3 id list, in priority order.
    pub top_3_tasks: Vec<TriageTask>,
    pub tasks: Vec<TriageTask>,
}

/// Input of [`TriageService::submit_dump`].
#[derive(Debug, Clone)]
pub struct Submission<'a> {
    pub input_text: &'a str,
    /// Falls back to the profile's default energy level.
    pub energy_level: Option<EnergyLevel>,
    pub source: Source,
}

#[derive(Clone)]
pub struct TriageService {
    store: Arc<Store>,
    provider: Arc<dyn ChatProvider>,
    mode: TriageMode,
}

impl TriageService {
    pub fn new(store: Arc<Store>, provider: Arc<dyn ChatProvider>, mode: TriageMode) -> Self {
        Self {
            store,
            provider,
            mode,
        }
    }

    pub fn mode(&self) -> TriageMode {
        self.mode
    }

    /// Stores the dump and triages it according to [`TriageMode`].
    #[instrument(name = "triage.submit", skip(self, submission), fields(mode = %self.mode))]
    pub async fn submit_dump(&self, user_id: &str, submission: Submission<'_>) -> AppResult<DumpView> {
        let text = validate_dump_text(submission.input_text)?.to_string();
        let user = user_id.to_string();
        let (energy_level, source) = (submission.energy_level, submission.source);
        let dump = run_blocking(&self.store, move |store| {
            store.ensure_user(&user)?;
            let energy_level = match energy_level {
                Some(level) => level,
                None => store.get_or_create_profile(&user)?.default_energy_level,
            };
            store.insert_dump(NewDump {
                user_id: &user,
                input_text: &text,
                energy_level,
                source,
            })
        })
        .await?;

        let run = match self.mode {
            TriageMode::Sync => self.triage_now(&dump).await?,
            TriageMode::Deferred => {
                let model = self.provider.model().to_string();
                let reserved = dump.clone();
                let run = run_blocking(&self.store, move |store| {
                    store.insert_placeholder_run(&reserved, &model)
                })
                .await?;
                self.spawn_completion(run.id, dump.clone());
                run
            }
        };
        self.view(user_id, dump, Some(run)).await
    }

    /// Runs the pipeline only when the dump has no finished run for the
    /// current prompt version. A pending placeholder is completed in place.
    /// Returns the view and whether an existing run was reused.
    #[instrument(name = "triage.retriage", skip(self, dump_id), fields(dump_id = %dump_id))]
    pub async fn retriage(&self, user_id: &str, dump_id: Uuid) -> AppResult<(DumpView, bool)> {
        let user = user_id.to_string();
        let (dump, existing) = run_blocking(&self.store, move |store| -> AppResult<_> {
            let dump = store
                .get_dump_for_user(&user, dump_id)?
                .ok_or(AppError::NotFound("brain dump"))?;
            let existing = store.find_run(dump.id, PROMPT_VERSION)?;
            Ok((dump, existing))
        })
        .await?;

        let Some(run) = existing else {
            let run = self.triage_now(&dump).await?;
            return Ok((self.view(user_id, dump, Some(run)).await?, false));
        };
        if !run.is_pending() {
            info!(run_id = %run.id, "reusing existing triage run");
            return Ok((self.view(user_id, dump, Some(run)).await?, true));
        }

        info!(run_id = %run.id, "completing pending placeholder run");
        let result = run_triage(
            self.provider.as_ref(),
            &dump.input_text,
            dump.energy_level.as_str(),
        )
        .await;
        let run_id = run.id;
        let run = run_blocking(&self.store, move |store| {
            store.complete_placeholder_run(run_id, &result)
        })
        .await?;
        Ok((self.view(user_id, dump, Some(run)).await?, false))
    }

    /// Dump with its most recent run.
    pub async fn dump_view(&self, user_id: &str, dump_id: Uuid) -> AppResult<DumpView> {
        let user = user_id.to_string();
        let (dump, run) = run_blocking(&self.store, move |store| -> AppResult<_> {
            let dump = store
                .get_dump_for_user(&user, dump_id)?
                .ok_or(AppError::NotFound("brain dump"))?;
            let run = store.latest_run_for_dump(dump.id)?;
            Ok((dump, run))
        })
        .await?;
        self.view(user_id, dump, run).await
    }

    /// Queues the run's action plan for delivery to `to_email`.
    pub async fn email_run(
        &self,
        user_id: &str,
        run_id: Uuid,
        to_email: &str,
        subject: Option<&str>,
    ) -> AppResult<Email> {
        let user = user_id.to_string();
        let to_email = to_email.to_string();
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EMAIL_SUBJECT)
            .to_string();

        run_blocking(&self.store, move |store| -> AppResult<Email> {
            let run = store
                .get_run_for_user(&user, run_id)?
                .ok_or(AppError::NotFound("triage run"))?;
            if !store.get_or_create_profile(&user)?.email_opt_in {
                return Err(AppError::Http {
                    status: axum::http::StatusCode::CONFLICT,
                    code: "EMAIL_OPT_OUT",
                    message: "email delivery is disabled in the profile".into(),
                });
            }
            Ok(store.queue_email(NewEmail {
                user_id: &user,
                triage_run_id: run.id,
                to_email: &to_email,
                subject: &subject,
                body_md: &run.action_plan_md,
                send_after: None,
            })?)
        })
        .await
    }

    async fn triage_now(&self, dump: &BrainDump) -> AppResult<TriageRun> {
        let result = run_triage(
            self.provider.as_ref(),
            &dump.input_text,
            dump.energy_level.as_str(),
        )
        .await;

        let dump = dump.clone();
        run_blocking(&self.store, move |store| -> AppResult<TriageRun> {
            match store.save_triage_result(&dump, &result) {
                Ok(run) => Ok(run),
                // A concurrent request saved first; the stored run wins.
                Err(StoreError::DuplicateRun { .. }) => store
                    .find_run(dump.id, PROMPT_VERSION)?
                    .ok_or(AppError::NotFound("triage run")),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Completes a placeholder run off the request path.
    fn spawn_completion(&self, run_id: Uuid, dump: BrainDump) {
        let store = self.store.clone();
        let provider = self.provider.clone();
        let span = info_span!("triage.deferred", run_id = %run_id, dump_id = %dump.id);
        let _detached: JoinHandle<()> = tokio::spawn(
            async move {
                let result = run_triage(
                    provider.as_ref(),
                    &dump.input_text,
                    dump.energy_level.as_str(),
                )
                .await;
                let completed = run_blocking(&store, move |s| {
                    s.complete_placeholder_run(run_id, &result)
                })
                .await;
                if let Err(e) = completed {
                    error!(error = %e, "failed to complete deferred triage run");
                }
            }
            .instrument(span),
        );
    }

    async fn view(&self, user_id: &str, dump: BrainDump, run: Option<TriageRun>) -> AppResult<DumpView> {
        let Some(run) = run else {
            return Ok(DumpView {
                dump,
                run: None,
                top_3_tasks: Vec::new(),
                tasks: Vec::new(),
            });
        };
        let user = user_id.to_string();
        run_blocking(&self.store, move |store| -> AppResult<DumpView> {
            let top_3_tasks = store.top3_tasks_for_run(&user, &run)?;
            let tasks = store.tasks_for_run(run.id)?;
            Ok(DumpView {
                dump,
                run: Some(run),
                top_3_tasks,
                tasks,
            })
        })
        .await
    }
}
