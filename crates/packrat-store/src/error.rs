use packrat_log::LogError;
use packrat_types::{Id, TypeError};

/// Errors from store operations.
///
/// The strict facade returns these as-is; the tolerant facade folds every
/// one of them into `None`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The item is not a structured container.
    #[error("item is not valid, must be object or array")]
    InvalidItem,

    /// The id is present but is neither a string nor an integer in the `i64`
    /// range (`-2^63 ..= 2^63 - 1`), or an update did not name an id at all.
    /// Integral numbers outside that range, such as `1e20`, are rejected.
    #[error("id is not valid, must be string or integer")]
    InvalidId,

    /// No item with this id is stored.
    #[error("item with this id cannot be found: {0}")]
    ItemNotFound(Id),

    /// `add` was given an id that is already stored.
    #[error("item with this id already exists: {0}")]
    DuplicateId(Id),

    /// Every integer id up to `i64::MAX` has been seen, so an id-less item
    /// cannot be given a fresh one.
    #[error("no integer ids left to allocate")]
    IdSpaceExhausted,

    /// `save` was called before any backing file was set.
    #[error("store has no backing file; use save_as to name one")]
    NoBackingFile,

    /// `load` or `save_as` was called with an empty path.
    #[error("no file path given")]
    MissingPath,

    /// Reading or writing the backing file failed, or it holds a malformed
    /// record.
    #[error("log error: {0}")]
    Log(#[from] LogError),
}

/// Coarse classification of a [`StoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidItem,
    InvalidId,
    ItemNotFound,
    DuplicateId,
    IdSpaceExhausted,
    File,
    Log,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidItem => ErrorKind::InvalidItem,
            Self::InvalidId => ErrorKind::InvalidId,
            Self::ItemNotFound(_) => ErrorKind::ItemNotFound,
            Self::DuplicateId(_) => ErrorKind::DuplicateId,
            Self::IdSpaceExhausted => ErrorKind::IdSpaceExhausted,
            Self::NoBackingFile | Self::MissingPath => ErrorKind::File,
            Self::Log(_) => ErrorKind::Log,
        }
    }

    /// `true` for the two file-selection errors (no backing file, no path).
    pub fn is_file_error(&self) -> bool {
        self.kind() == ErrorKind::File
    }
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::InvalidItem => Self::InvalidItem,
            TypeError::InvalidId => Self::InvalidId,
            other => Self::Log(LogError::Serialization(other)),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
