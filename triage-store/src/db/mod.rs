//! Connection bootstrap and schema migrations.
//!
//! Schema version is tracked via `PRAGMA user_version`; nothing reads or
//! writes application rows before migrations succeed.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
