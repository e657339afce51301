//! Concrete chat backends.

pub mod ollama_service;
pub mod open_ai_service;
