use packrat_log::{LogConfig, SyncMode};

/// Configuration for a [`Store`](crate::Store).
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    /// Settings for every transaction log the store opens.
    pub log: LogConfig,
}

impl StoreConfig {
    /// Fsync every log append.
    pub fn durable() -> Self {
        Self {
            log: LogConfig {
                sync_mode: SyncMode::EveryWrite,
            },
        }
    }
}
