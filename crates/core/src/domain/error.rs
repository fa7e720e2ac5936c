// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid process name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Duplicate process name: {0}")]
    DuplicateName(String),

    #[error("Invalid script reference '{script}': {reason}")]
    InvalidScript { script: String, reason: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidEnv { key: String, reason: String },

    #[error("Agent {agent}: field '{field}' is required but is not set")]
    MissingField { agent: usize, field: String },

    #[error("Unknown {kind}: {value}")]
    Unknown { kind: String, value: String },

    #[error("Invalid process state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
