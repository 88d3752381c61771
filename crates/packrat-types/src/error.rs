use thiserror::Error;

/// Errors produced by type conversions and the record codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("item is not valid, must be object or array")]
    InvalidItem,

    /// Ids must be strings or integers within `i64`; larger integral
    /// numbers such as `1e20` are rejected.
    #[error("id is not valid, must be string or integer")]
    InvalidId,

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
