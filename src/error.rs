use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MasteryError {
    /// Malformed outcome counts. Caller bug, never retried.
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
    /// A state that would break the `alpha, beta >= 1` floor.
    #[error("invalid mastery state: {0}")]
    InvalidState(String),
    #[error("no topics available for selection")]
    NoTopicsAvailable,
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, MasteryError>;
