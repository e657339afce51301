//! Input validation errors of the triage crate.
//!
//! Pipeline failures (transport, unparseable reply) are not errors here: they
//! travel as values inside [`crate::pipeline::TriageResult`].

use thiserror::Error;

use crate::energy::InvalidEnergyLevel;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("brain dump text is empty")]
    EmptyDump,

    #[error(transparent)]
    InvalidEnergy(#[from] InvalidEnergyLevel),
}

/// Trimmed dump text, or [`TriageError::EmptyDump`] when nothing is left.
pub fn validate_dump_text(text: &str) -> Result<&str, TriageError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TriageError::EmptyDump);
    }
    Ok(text)
}
