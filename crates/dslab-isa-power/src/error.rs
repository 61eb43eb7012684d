//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Unrecoverable problem with a power table. A table that fails to load is never partially used.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("power table {} can't be read: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("power table line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("power table declares no operating points")]
    NoOperatingPoints,

    #[error("power table line {line}: expected at least {expected} fields, found {found}")]
    MissingField { line: u64, expected: usize, found: usize },

    #[error("power table line {line}: can't parse {value:?} as a number")]
    InvalidNumber { line: u64, value: String },

    #[error("power table line {line}: operating point frequency must be positive")]
    InvalidFrequency { line: u64 },

    #[error("power table ends before the stall power row ({found} of {expected} header rows read)")]
    Truncated { expected: usize, found: usize },

    #[error("power table line {line}: blank line before the end of the table")]
    BlankLine { line: u64 },

    #[error("power table has no \"nop\" instruction")]
    MissingNop,
}

/// Problem with the power accounting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse YAML from config file {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("can't create window report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Rejected request of a validating accounting call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChargeError {
    #[error("instruction slot {0} is out of range")]
    InvalidInstruction(usize),

    #[error("power state {state} is out of range (number of states: {num_states})")]
    InvalidState { state: usize, num_states: usize },
}
