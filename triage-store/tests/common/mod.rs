#![allow(dead_code)]

use serde_json::Value;
use triage::{EnergyLevel, PROMPT_VERSION, TRIAGE_TEMPERATURE, TriageOutcome, TriageResult};
use triage_store::{BrainDump, NewDump, Source, Store};

pub const USER: &str = "user-1";

pub fn store_with_user() -> Store {
    let store = Store::open_in_memory().unwrap();
    store.ensure_user(USER).unwrap();
    store
}

pub fn dump(store: &Store, user: &str, text: &str) -> BrainDump {
    store
        .insert_dump(NewDump {
            user_id: user,
            input_text: text,
            energy_level: EnergyLevel::Low,
            source: Source::Web,
        })
        .unwrap()
}

pub fn result_from(payload: Value) -> TriageResult {
    TriageResult {
        outcome: TriageOutcome::from_value(payload.as_object().unwrap()),
        model_name: "qwen3".into(),
        prompt_version: PROMPT_VERSION,
        temperature: TRIAGE_TEMPERATURE,
        latency_ms: Some(840),
        raw_content: payload.to_string(),
        usage: Default::default(),
        failure: None,
    }
}

/// `n` tasks titled `t0..tn` with the given top-3 indices.
pub fn tasks_payload(n: usize, top3: Value) -> Value {
    let tasks: Vec<Value> = (0..n)
        .map(|i| serde_json::json!({"title": format!("t{i}"), "micro_steps": [format!("step for t{i}")]}))
        .collect();
    serde_json::json!({
        "extracted_tasks": tasks,
        "top_3_indices": top3,
        "blockers": ["inbox dread"],
        "action_plan": "Start with t2."
    })
}
