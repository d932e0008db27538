//! Error types for calls that reject their input outright.
//!
//! Recoverable per-item problems (a malformed contour, an exhausted slot)
//! are reported as data in the result types instead.

use thiserror::Error;

/// Reasons a variant batch is rejected before any sampling happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The requested variant count is outside `1..=max`.
    #[error("variant count must be between 1 and {max}, got {requested}")]
    CountOutOfRange { requested: usize, max: usize },

    /// The test structure has no slots.
    #[error("test structure is empty")]
    EmptyStructure,

    /// A slot is missing its topic or question type.
    #[error("malformed structure: slot {slot} has an empty {field}")]
    EmptySlot { slot: usize, field: &'static str },

    /// A slot names a question type that does not exist.
    #[error("malformed structure: slot {slot} has unknown question type '{value}'")]
    UnknownSlotType { slot: usize, value: String },

    /// The stored structure could not be decoded.
    #[error("malformed structure: {0}")]
    InvalidStructure(String),
}

/// Reasons a submission payload could not be read as contour data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The payload is not valid JSON.
    #[error("invalid submission JSON: {0}")]
    InvalidJson(String),

    /// The payload is JSON but not a list of contours.
    #[error("submission must be a JSON array of contours")]
    NotAList,
}
