//! Transaction log for Packrat.
//!
//! Every mutation of a store is appended here as one JSON line. Appends are
//! queued synchronously by the mutating call and written, in order, by a
//! single background task per log file. [`PendingWrites`] counts appends
//! that have been queued but not yet written so a snapshot can wait for
//! them. [`replay`] reads a log (or snapshot) back front-to-back.

pub mod error;
pub mod log;
pub mod pending;
pub mod replay;

pub use error::{LogError, Result};
pub use log::{LogConfig, SnapshotTicket, SyncMode, TransactionLog};
pub use pending::PendingWrites;
pub use replay::{replay, ReplayStats};
