use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid GUID string: {0}")]
    InvalidGuid(String),

    #[error("counter exceeds 48 bits: {0:#x}")]
    CounterOverflow(u64),
}
