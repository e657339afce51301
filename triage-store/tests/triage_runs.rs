mod common;

use common::{USER, dump, result_from, store_with_user, tasks_payload};
use serde_json::json;
use triage::{PROMPT_VERSION, TriageFailure, TriageOutcome};
use triage_store::{PLACEHOLDER_ACTION_PLAN, StoreError};

#[test]
fn dump_word_count_is_derived_on_insert() {
    let store = store_with_user();
    assert_eq!(dump(&store, USER, "pay rent\n call  mom ").word_count, 4);
    assert_eq!(dump(&store, USER, "   \n").word_count, 0);
}

#[test]
fn top3_rank_orders_follow_model_order() {
    let store = store_with_user();
    let d = dump(&store, USER, "five things");
    let run = store
        .save_triage_result(&d, &result_from(tasks_payload(5, json!([2, 0, 4]))))
        .unwrap();

    let tasks = store.tasks_for_run(run.id).unwrap();
    assert_eq!(tasks.len(), 5);

    let by_position = |p: u32| tasks.iter().find(|t| t.position == p).unwrap();
    assert_eq!(by_position(2).rank_order, Some(1));
    assert_eq!(by_position(0).rank_order, Some(2));
    assert_eq!(by_position(4).rank_order, Some(3));
    for p in [1, 3] {
        assert_eq!(by_position(p).rank_order, None);
        assert!(!by_position(p).is_top3);
    }

    let top: Vec<String> = store
        .top3_tasks_for_run(USER, &run)
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(top, ["t2", "t0", "t4"]);

    // tasks_for_run lists ranked tasks first
    assert_eq!(tasks[0].title, "t2");
    assert_eq!(tasks[3].title, "t1");
}

#[test]
fn stored_top3_skips_indices_without_tasks() {
    let store = store_with_user();
    let d = dump(&store, USER, "two things");
    let run = store
        .save_triage_result(&d, &result_from(tasks_payload(2, json!([7, 1, 0]))))
        .unwrap();

    let tasks = store.tasks_for_run(run.id).unwrap();
    let id_of = |p: u32| tasks.iter().find(|t| t.position == p).unwrap().id;
    assert_eq!(run.top_3_task_ids, vec![id_of(1), id_of(0)]);

    let reloaded = store.latest_run_for_dump(d.id).unwrap().unwrap();
    assert_eq!(reloaded.top_3_task_ids, run.top_3_task_ids);
    assert_eq!(reloaded.blockers, vec!["inbox dread"]);
}

#[test]
fn stored_top3_skips_tasks_dropped_during_mapping() {
    let store = store_with_user();
    let d = dump(&store, USER, "three things, one garbled");
    let payload = json!({
        "extracted_tasks": [{"title": "t0"}, "not a task", {"title": "t2"}],
        "top_3_indices": [1, 2, 0],
        "action_plan": "Start with t2."
    });
    let run = store.save_triage_result(&d, &result_from(payload)).unwrap();

    let tasks = store.tasks_for_run(run.id).unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.position != 1));
    let by_position = |p: u32| tasks.iter().find(|t| t.position == p).unwrap();

    assert_eq!(run.top_3_task_ids, vec![by_position(2).id, by_position(0).id]);
    assert_eq!(by_position(2).rank_order, Some(2));
    assert_eq!(by_position(0).rank_order, Some(3));

    let top: Vec<String> = store
        .top3_tasks_for_run(USER, &run)
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(top, ["t2", "t0"]);
}

#[test]
fn second_save_for_same_prompt_version_is_rejected() {
    let store = store_with_user();
    let d = dump(&store, USER, "rent");
    let first = store
        .save_triage_result(&d, &result_from(tasks_payload(1, json!([0]))))
        .unwrap();

    let err = store
        .save_triage_result(&d, &result_from(tasks_payload(3, json!([0, 1, 2]))))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateRun { .. }));

    assert_eq!(store.count_runs_for_dump(d.id).unwrap(), 1);
    let kept = store.find_run(d.id, PROMPT_VERSION).unwrap().unwrap();
    assert_eq!(kept.id, first.id);
    assert_eq!(store.tasks_for_run(kept.id).unwrap().len(), 1);
}

#[test]
fn micro_steps_are_persisted_truncated() {
    let store = store_with_user();
    let d = dump(&store, USER, "big task");
    let steps: Vec<String> = (0..30).map(|i| format!("s{i}")).collect();
    let run = store
        .save_triage_result(
            &d,
            &result_from(json!({"extracted_tasks": [{"title": "big", "micro_steps": steps}]})),
        )
        .unwrap();

    let task = &store.tasks_for_run(run.id).unwrap()[0];
    assert_eq!(task.micro_steps.len(), 20);
    assert_eq!(task.micro_steps.last().map(String::as_str), Some("s19"));
}

#[test]
fn failed_pass_is_stored_with_its_marker() {
    let store = store_with_user();
    let d = dump(&store, USER, "anything");
    let mut result = result_from(json!({"action_plan": "unused"}));
    result.outcome = TriageOutcome::parse_failure("not json at all");
    result.failure = Some(TriageFailure::Parse("expected value".into()));

    let run = store.save_triage_result(&d, &result).unwrap();
    let stored = store.latest_run_for_dump(d.id).unwrap().unwrap();
    assert_eq!(stored, run);
    assert_eq!(stored.action_plan_md, "not json at all");
    assert_eq!(stored.error_detail.as_deref(), Some("JSON parse failed"));
    assert!(stored.top_3_task_ids.is_empty());
    assert!(store.tasks_for_run(run.id).unwrap().is_empty());
}

#[test]
fn placeholder_run_is_completed_in_place() {
    let store = store_with_user();
    let d = dump(&store, USER, "deferred");
    let placeholder = store.insert_placeholder_run(&d, "qwen3").unwrap();
    assert_eq!(placeholder.action_plan_md, PLACEHOLDER_ACTION_PLAN);

    assert!(matches!(
        store.save_triage_result(&d, &result_from(tasks_payload(1, json!([0])))),
        Err(StoreError::DuplicateRun { .. })
    ));

    let done = store
        .complete_placeholder_run(placeholder.id, &result_from(tasks_payload(3, json!([1]))))
        .unwrap();
    assert_eq!(done.id, placeholder.id);
    assert_eq!(done.action_plan_md, "Start with t2.");
    assert_eq!(done.latency_ms, Some(840));

    assert_eq!(store.count_runs_for_dump(d.id).unwrap(), 1);
    let stored = store.latest_run_for_dump(d.id).unwrap().unwrap();
    assert_eq!(stored.top_3_task_ids.len(), 1);
    assert_eq!(store.tasks_for_run(stored.id).unwrap().len(), 3);
}

#[test]
fn runs_and_dumps_are_scoped_to_their_owner() {
    let store = store_with_user();
    store.ensure_user("intruder").unwrap();
    let d = dump(&store, USER, "mine");
    let run = store
        .save_triage_result(&d, &result_from(tasks_payload(2, json!([0, 1]))))
        .unwrap();

    assert!(store.get_dump_for_user("intruder", d.id).unwrap().is_none());
    assert!(store.get_run_for_user("intruder", run.id).unwrap().is_none());
    assert!(store.top3_tasks_for_run("intruder", &run).unwrap().is_empty());
    assert!(store.get_dump_for_user(USER, d.id).unwrap().is_some());
}

#[test]
fn history_is_newest_first_and_limited() {
    let store = store_with_user();
    for i in 0..4 {
        dump(&store, USER, &format!("dump {i}"));
    }
    let listed = store.list_dumps_for_user(USER, 3).unwrap();
    let texts: Vec<&str> = listed.iter().map(|d| d.input_text.as_str()).collect();
    assert_eq!(texts, ["dump 3", "dump 2", "dump 1"]);
}
