//! Prompt builder: fixed triage instructions + one user turn with the dump.

use ai_llm_service::ChatMessage;

/// System instructions for the cognitive triage engine.
///
/// The schema block is what [`crate::mapper`] expects back.
pub const SYSTEM_PROMPT: &str = r#"You are a cognitive triage engine for neurodivergent founders.
Input is an unfiltered brain dump.
Your job:
1. Extract all actionable tasks.
2. Identify the 3 most important tasks (based on urgency, consequences, and cognitive load).
3. Detect hidden blockers, emotional friction, or avoidance triggers.
4. Reshape tasks into "micro-missions" based on user energy:
   - LOW energy → tiny, non-intimidating wins
   - MEDIUM energy → steady progress tasks
   - HIGH energy → leverage high-focus tasks
5. Produce a "10-Minute Action Plan" that removes overwhelm.

Tone: calm, non-judgmental, shame-free, concise.

You MUST respond with exactly one JSON object and no other text before or after. Use this schema:
{
  "extracted_tasks": [{"title": "string", "micro_steps": ["string"]}],
  "top_3_indices": [0, 1, 2],
  "blockers": ["string"],
  "action_plan": "markdown string for the 10-Minute Action Plan"
}
- extracted_tasks: all actionable tasks from the dump; each has "title" and "micro_steps" (array of short steps).
- top_3_indices: zero-based indices into extracted_tasks for the 3 most important.
- blockers: list of detected blockers/emotional friction/avoidance.
- action_plan: single markdown string, calm and concise."#;

/// Energy tag used when the caller passes a blank label.
pub const DEFAULT_ENERGY_TAG: &str = "MEDIUM";

/// Trims and upper-cases the label; blank becomes [`DEFAULT_ENERGY_TAG`].
pub fn normalize_energy(label: &str) -> String {
    let tag = label.trim().to_uppercase();
    if tag.is_empty() {
        DEFAULT_ENERGY_TAG.to_string()
    } else {
        tag
    }
}

/// Builds the user turn embedding the dump and its energy tag.
///
/// # Example
/// ```
/// use triage::prompt::build_user_message;
///
/// let msg = build_user_message("call the bank", " low ");
/// assert!(msg.starts_with("Brain dump (energy level: LOW):"));
/// ```
pub fn build_user_message(dump_text: &str, energy_label: &str) -> String {
    let energy = normalize_energy(energy_label);
    format!(
        "Brain dump (energy level: {energy}):\n\n{dump_text}\n\nReturn only the JSON object as specified. No markdown code fence, no explanation."
    )
}

/// `[system, user]` message pair for one triage request.
pub fn build_messages(dump_text: &str, energy_label: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_message(dump_text, energy_label)),
    ]
}
