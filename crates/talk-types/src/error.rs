use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid account name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("user-specified id is too big: {id}")]
    ReservedId { id: u64 },
}
