//! `impl Store` blocks, one file per entity.

mod dumps;
mod emails;
mod profiles;
mod runs;
mod tasks;
mod users;

pub use dumps::DEFAULT_LIST_LIMIT;
pub use profiles::DEFAULT_TIMEZONE;
pub use runs::PLACEHOLDER_ACTION_PLAN;
