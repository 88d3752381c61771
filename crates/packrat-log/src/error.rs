use std::io;
use std::path::PathBuf;

use packrat_types::TypeError;

/// Errors produced by the transaction log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// I/O error while reading or writing a log file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] TypeError),

    /// A line of the log could not be decoded. Replay stops here.
    #[error("corrupt record at {}:{line}: {reason}", path.display())]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The background writer for this log has stopped.
    #[error("log writer for {} is closed", .0.display())]
    WriterClosed(PathBuf),

    /// Opening a log needs a running tokio runtime for its writer task.
    #[error("no tokio runtime available to run the log writer")]
    NoRuntime,
}

/// Convenience alias used throughout the log crate.
pub type Result<T> = std::result::Result<T, LogError>;
