//! SQLite persistence for Quick Catch.
//!
//! - [`db`] opens connections and applies migrations.
//! - [`Store`] wraps one connection; its operations live in per-entity
//!   `impl` blocks (users, dumps, runs, tasks, profiles, emails).
//! - Every row is owned by a user; deleting the user cascades.

mod codec;
pub mod db;
pub mod errors;
pub mod models;
mod repo;
mod store;

pub use errors::{StoreError, StoreResult};
pub use models::{
    BrainDump, Email, EmailStatus, NeurodivergentFocus, NewDump, NewEmail, Profile,
    ProfileUpdate, Source, TriageRun, TriageTask, UnknownVariant, word_count,
};
pub use repo::{DEFAULT_LIST_LIMIT, DEFAULT_TIMEZONE, PLACEHOLDER_ACTION_PLAN};
pub use store::Store;
