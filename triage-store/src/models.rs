//! Row types returned by the store.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage::{EnergyLevel, EvidenceSpan};
use uuid::Uuid;

/// Text column held a value outside its enum.
#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

text_enum!(
    /// Where a dump was captured.
    Source, "source" {
        Web => "web",
        Mobile => "mobile",
        Api => "api",
    }
);

text_enum!(
    /// Delivery state of a queued email; changed only by an external consumer.
    EmailStatus, "email status" {
        Queued => "queued",
        Sent => "sent",
        Failed => "failed",
        Canceled => "canceled",
    }
);

text_enum!(
    NeurodivergentFocus, "neurodivergent focus" {
        Adhd => "adhd",
        Autistic => "autistic",
        Audhd => "audhd",
        Unspecified => "unspecified",
    }
);

impl Default for Source {
    fn default() -> Self {
        Source::Web
    }
}

impl Default for NeurodivergentFocus {
    fn default() -> Self {
        NeurodivergentFocus::Unspecified
    }
}

/// Number of whitespace-separated tokens; 0 for blank text.
pub fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrainDump {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub energy_level: EnergyLevel,
    pub input_text: String,
    pub source: Source,
    pub word_count: u32,
}

/// Input of [`crate::Store::insert_dump`].
#[derive(Debug, Clone)]
pub struct NewDump<'a> {
    pub user_id: &'a str,
    pub input_text: &'a str,
    pub energy_level: EnergyLevel,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageRun {
    pub id: Uuid,
    pub dump_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub model_name: String,
    pub prompt_version: String,
    pub temperature: f32,
    /// Task ids in priority order.
    pub top_3_task_ids: Vec<Uuid>,
    pub blockers: Vec<String>,
    pub action_plan_md: String,
    pub summary: Option<String>,
    pub detected_crisis: bool,
    pub latency_ms: Option<u64>,
    pub tokens_in: Option<u32>,
    pub tokens_out: Option<u32>,
    pub error_detail: Option<String>,
}

impl TriageRun {
    /// A placeholder the model has not answered yet, or whose completion was lost.
    pub fn is_pending(&self) -> bool {
        self.action_plan_md == crate::PLACEHOLDER_ACTION_PLAN
            && self.latency_ms.is_none()
            && self.error_detail.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageTask {
    pub id: Uuid,
    pub triage_run_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Index in the model's task list.
    pub position: u32,
    pub title: String,
    pub micro_steps: Vec<String>,
    pub estimated_minutes: Option<u32>,
    pub rank_score: Option<f64>,
    /// 1-based, set only for top-3 members.
    pub rank_order: Option<u8>,
    pub is_top3: bool,
    pub best_energy: Option<EnergyLevel>,
    pub friction_score: Option<f64>,
    pub category: Option<String>,
    pub evidence_spans: Vec<EvidenceSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub user_id: String,
    pub default_energy_level: EnergyLevel,
    pub timezone: String,
    pub email_opt_in: bool,
    pub neurodivergent_focus: NeurodivergentFocus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile change; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub default_energy_level: Option<EnergyLevel>,
    pub timezone: Option<String>,
    pub email_opt_in: Option<bool>,
    pub neurodivergent_focus: Option<NeurodivergentFocus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub id: Uuid,
    pub user_id: String,
    pub triage_run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub send_after: DateTime<Utc>,
    pub to_email: String,
    pub subject: String,
    pub body_md: String,
    pub status: EmailStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

/// Input of [`crate::Store::queue_email`].
#[derive(Debug, Clone)]
pub struct NewEmail<'a> {
    pub user_id: &'a str,
    pub triage_run_id: Uuid,
    pub to_email: &'a str,
    pub subject: &'a str,
    pub body_md: &'a str,
    /// Defaults to the creation time.
    pub send_after: Option<DateTime<Utc>>,
}
