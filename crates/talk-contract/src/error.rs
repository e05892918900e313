use talk_store::TableError;
use talk_types::{AccountName, MessageId, TypeError};

/// Errors that reject an action or a partition operation.
///
/// Every variant aborts the whole action; nothing it touched persists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// The invocation is not authorized by the named account.
    #[error("missing required authority {account}")]
    Unauthorized { account: AccountName },

    /// A referenced parent or target message does not exist.
    #[error("{table}: unable to find key {id}")]
    NotFound { table: &'static str, id: u64 },

    /// A supplied argument is outside what the action accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The voter already has a vote on this message.
    #[error("{voter} already liked message {message}")]
    DuplicateVote {
        voter: AccountName,
        message: MessageId,
    },

    /// A caller-supplied id already occupies a slot.
    #[error("{table}: id {id} already exists")]
    AlreadyExists { table: &'static str, id: u64 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TableError> for ContractError {
    fn from(error: TableError) -> Self {
        match error {
            TableError::NotFound { table, key } => Self::NotFound { table, id: key },
            TableError::DuplicatePrimaryKey { table, key } => {
                Self::AlreadyExists { table, id: key }
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TypeError> for ContractError {
    fn from(error: TypeError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}

/// Result alias for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_errors_map_to_action_errors() {
        assert_eq!(
            ContractError::from(TableError::NotFound {
                table: "message",
                key: 4
            }),
            ContractError::NotFound {
                table: "message",
                id: 4
            }
        );
        assert_eq!(
            ContractError::from(TableError::DuplicatePrimaryKey {
                table: "likes",
                key: 8
            }),
            ContractError::AlreadyExists {
                table: "likes",
                id: 8
            }
        );
        assert!(matches!(
            ContractError::from(TableError::KeySpaceExhausted { table: "likes" }),
            ContractError::Internal(_)
        ));
    }

    #[test]
    fn reserved_id_is_invalid_argument() {
        let error = ContractError::from(TypeError::ReservedId { id: 1_000_000_000 });
        assert_eq!(
            error.to_string(),
            "invalid argument: user-specified id is too big: 1000000000"
        );
    }
}
