/// Errors from table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No record with this primary key.
    #[error("{table}: unable to find key {key}")]
    NotFound { table: &'static str, key: u64 },

    /// A record with this primary key is already present.
    #[error(
        "{table}: could not insert object, most likely a uniqueness constraint \
         was violated (key {key})"
    )]
    DuplicatePrimaryKey { table: &'static str, key: u64 },

    /// A modify callback tried to change the primary key.
    #[error("{table}: updater cannot change primary key when modifying an object (key {key})")]
    PrimaryKeyChanged { table: &'static str, key: u64 },

    /// The largest key is `u64::MAX`; no next key exists.
    #[error("{table}: next primary key in table is at autoincrement limit")]
    KeySpaceExhausted { table: &'static str },
}

/// Result alias for table operations.
pub type TableResult<T> = Result<T, TableError>;
