//! Normalizes an untrusted model payload into a [`TriageOutcome`].
//!
//! Nothing here fails: invalid elements are coerced or dropped so a partially
//! well-formed reply still yields every usable task.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::energy::EnergyLevel;

pub const MAX_MICRO_STEPS: usize = 20;
pub const MAX_TOP3: usize = 3;
pub const MAX_TITLE_CHARS: usize = 512;
pub const MAX_SUMMARY_CHARS: usize = 512;
pub const MAX_FRICTION: f64 = 10.0;

pub const NO_ACTION_PLAN: &str = "No action plan generated.";
pub const NO_RESPONSE: &str = "No response from model.";

/// Quoted slice of the dump that motivated a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub start: u64,
    pub end: u64,
    pub text: String,
}

/// One mapped task; `position` is its index in the model's `extracted_tasks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedTask {
    pub position: usize,
    pub title: String,
    pub micro_steps: Vec<String>,
    pub estimated_minutes: Option<u32>,
    pub rank_score: Option<f64>,
    pub best_energy: Option<EnergyLevel>,
    pub friction_score: Option<f64>,
    pub category: Option<String>,
    pub evidence_spans: Vec<EvidenceSpan>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TriageOutcome {
    pub tasks: Vec<ExtractedTask>,
    /// Zero-based positions into the model's task list, in priority order.
    pub top_3_indices: Vec<i64>,
    pub blockers: Vec<String>,
    pub action_plan: String,
    pub summary: Option<String>,
    pub detected_crisis: bool,
}

impl TriageOutcome {
    /// Maps a decoded model object.
    pub fn from_value(data: &Map<String, Value>) -> Self {
        let tasks = match data.get("extracted_tasks") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| item.as_object().map(|obj| map_task(i, obj)))
                .collect(),
            _ => Vec::new(),
        };

        let action_plan = data
            .get("action_plan")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_ACTION_PLAN)
            .to_string();

        Self {
            tasks,
            top_3_indices: top3_indices(data.get("top_3_indices")),
            blockers: blockers(data.get("blockers")),
            action_plan,
            summary: non_blank(data.get("summary")).map(|s| truncate_chars(&s, MAX_SUMMARY_CHARS)),
            detected_crisis: data
                .get("detected_crisis")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    /// Outcome of a reply that could not be decoded: the raw text becomes the plan.
    pub fn parse_failure(raw: &str) -> Self {
        let raw = raw.trim();
        Self {
            action_plan: if raw.is_empty() { NO_RESPONSE } else { raw }.to_string(),
            ..Self::default()
        }
    }

    /// Outcome of a request that never produced a reply.
    pub fn transport_failure(err: &impl std::fmt::Display) -> Self {
        Self {
            action_plan: format!("AI request failed: {err}"),
            ..Self::default()
        }
    }

    /// 1-based priority of the task at `position`, if it is in the top 3.
    pub fn rank_order_for(&self, position: usize) -> Option<u8> {
        self.top_3_indices
            .iter()
            .position(|&i| usize::try_from(i).is_ok_and(|i| i == position))
            .and_then(|idx| u8::try_from(idx + 1).ok())
    }

    pub fn is_top3(&self, position: usize) -> bool {
        self.rank_order_for(position).is_some()
    }
}

fn map_task(position: usize, obj: &Map<String, Value>) -> ExtractedTask {
    let title = match obj.get("title") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let title = if title.is_empty() {
        format!("Task {}", position + 1)
    } else {
        truncate_chars(&title, MAX_TITLE_CHARS)
    };

    let micro_steps = match obj.get("micro_steps") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_to_string)
            .take(MAX_MICRO_STEPS)
            .collect(),
        _ => Vec::new(),
    };

    ExtractedTask {
        position,
        title,
        micro_steps,
        estimated_minutes: obj
            .get("estimated_minutes")
            .and_then(Value::as_u64)
            .and_then(|m| u32::try_from(m).ok()),
        rank_score: obj.get("rank_score").and_then(Value::as_f64),
        best_energy: obj
            .get("best_energy")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
        friction_score: obj
            .get("friction_score")
            .and_then(Value::as_f64)
            .filter(|f| (0.0..=MAX_FRICTION).contains(f)),
        category: non_blank(obj.get("category")),
        evidence_spans: evidence_spans(obj.get("evidence_spans")),
    }
}

/// First three integer-typed or all-digit entries in model order; negative and
/// repeated indices among those three are then dropped.
fn top3_indices(v: Option<&Value>) -> Vec<i64> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    let mut out: Vec<i64> = Vec::with_capacity(MAX_TOP3);
    for idx in items.iter().filter_map(coerce_index).take(MAX_TOP3) {
        if idx >= 0 && !out.contains(&idx) {
            out.push(idx);
        }
    }
    out
}

fn coerce_index(item: &Value) -> Option<i64> {
    match item {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    }
}

fn blockers(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) if is_truthy(other) => scalar_to_string(other).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn evidence_spans(v: Option<&Value>) -> Vec<EvidenceSpan> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let start = obj.get("start")?.as_u64()?;
            let end = obj.get("end")?.as_u64()?;
            if end < start {
                return None;
            }
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(EvidenceSpan { start, end, text })
        })
        .collect()
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn non_blank(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn outcome(v: Value) -> TriageOutcome {
        TriageOutcome::from_value(v.as_object().unwrap())
    }

    #[test]
    fn rank_orders_follow_top3_order() {
        let tasks: Vec<Value> = (0..5).map(|i| json!({"title": format!("t{i}")})).collect();
        let out = outcome(json!({"extracted_tasks": tasks, "top_3_indices": [2, 0, 4]}));

        assert_eq!(out.tasks.len(), 5);
        assert_eq!(out.rank_order_for(2), Some(1));
        assert_eq!(out.rank_order_for(0), Some(2));
        assert_eq!(out.rank_order_for(4), Some(3));
        assert_eq!(out.rank_order_for(1), None);
        assert!(!out.is_top3(3));
    }

    #[test]
    fn micro_steps_truncated_to_twenty() {
        let steps: Vec<String> = (0..25).map(|i| format!("step {i}")).collect();
        let out = outcome(json!({"extracted_tasks": [{"title": "big", "micro_steps": steps}]}));
        let task = &out.tasks[0];
        assert_eq!(task.micro_steps.len(), MAX_MICRO_STEPS);
        assert_eq!(task.micro_steps[19], "step 19");
    }

    #[test]
    fn invalid_elements_are_skipped_not_fatal() {
        let out = outcome(json!({
            "extracted_tasks": ["loose string", {"title": "  "}, {"title": "Email Sam", "micro_steps": "nope"}],
            "top_3_indices": [1, "2", 1.5, true, -1, "x", 1, 0, 7],
            "blockers": "fear of the inbox",
            "action_plan": "   "
        }));

        let positions: Vec<usize> = out.tasks.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(out.tasks[0].title, "Task 2");
        assert!(out.tasks[1].micro_steps.is_empty());
        // 1, "2" and -1 are the first three coercible entries; -1 is then dropped.
        assert_eq!(out.top_3_indices, vec![1, 2]);
        assert_eq!(out.blockers, vec!["fear of the inbox"]);
        assert_eq!(out.action_plan, NO_ACTION_PLAN);
    }

    #[test]
    fn top3_is_cut_to_three_before_repeats_are_dropped() {
        let tasks: Vec<Value> = (0..4).map(|i| json!({"title": format!("t{i}")})).collect();

        let out = outcome(json!({"extracted_tasks": tasks, "top_3_indices": [1, 1, 0, 2]}));
        assert_eq!(out.top_3_indices, vec![1, 0]);
        assert_eq!(out.rank_order_for(1), Some(1));
        assert_eq!(out.rank_order_for(0), Some(2));
        assert!(!out.is_top3(2));

        let out = outcome(json!({"extracted_tasks": tasks, "top_3_indices": [-1, 0, 1, 3]}));
        assert_eq!(out.top_3_indices, vec![0, 1]);
        assert!(!out.is_top3(3));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let out = outcome(json!({"extracted_tasks": {"not": "a list"}, "blockers": false}));
        assert!(out.tasks.is_empty());
        assert!(out.top_3_indices.is_empty());
        assert!(out.blockers.is_empty());
        assert!(!out.detected_crisis);
        assert_eq!(out.summary, None);
    }

    #[test]
    fn optional_task_fields_are_validated() {
        let out = outcome(json!({
            "extracted_tasks": [{
                "title": "Taxes",
                "estimated_minutes": 25,
                "rank_score": 0.8,
                "best_energy": "LOW",
                "friction_score": 12,
                "category": " admin ",
                "evidence_spans": [{"start": 0, "end": 5, "text": "taxes"}, {"start": 9, "end": 2}]
            }],
            "summary": "  One big admin week. ",
            "detected_crisis": true
        }));
        let t = &out.tasks[0];
        assert_eq!(t.estimated_minutes, Some(25));
        assert_eq!(t.rank_score, Some(0.8));
        assert_eq!(t.best_energy, Some(EnergyLevel::Low));
        assert_eq!(t.friction_score, None);
        assert_eq!(t.category.as_deref(), Some("admin"));
        assert_eq!(t.evidence_spans.len(), 1);
        assert_eq!(out.summary.as_deref(), Some("One big admin week."));
        assert!(out.detected_crisis);
    }

    #[test]
    fn failure_outcomes_have_empty_lists() {
        let parse = TriageOutcome::parse_failure("  not json at all ");
        assert_eq!(parse.action_plan, "not json at all");
        assert!(parse.tasks.is_empty() && parse.blockers.is_empty());
        assert_eq!(TriageOutcome::parse_failure("").action_plan, NO_RESPONSE);

        let transport = TriageOutcome::transport_failure(&"connection refused");
        assert_eq!(transport.action_plan, "AI request failed: connection refused");
        assert!(transport.top_3_indices.is_empty());
    }

    #[test]
    fn long_titles_are_truncated_on_char_boundaries() {
        let title = "é".repeat(MAX_TITLE_CHARS + 10);
        let out = outcome(json!({"extracted_tasks": [{"title": title}]}));
        assert_eq!(out.tasks[0].title.chars().count(), MAX_TITLE_CHARS);
    }
}
