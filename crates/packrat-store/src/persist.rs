//! Load, save and save-as for [`Store`].

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use packrat_log::{replay, ReplayStats, TransactionLog};
use packrat_types::Record;

use crate::error::{StoreError, StoreResult};
use crate::store::{State, Store};

impl Store {
    /// Replace the store contents by replaying the file at `path`, then make
    /// `path` the backing file.
    ///
    /// Queued appends are awaited first so an earlier backing file is
    /// complete before it is read. A missing file loads as empty. A malformed
    /// record aborts the load and leaves the store untouched.
    pub async fn load(&self, path: impl AsRef<Path>) -> StoreResult<ReplayStats> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StoreError::MissingPath);
        }

        self.pending().wait_idle().await;

        let mut fresh = State::new();
        let stats = replay(path, |record| fresh.apply(record)).await?;
        fresh.log = Some(TransactionLog::open(
            path,
            self.config().log.clone(),
            Arc::clone(self.pending()),
        )?);

        let items = fresh.items.len();
        let next_id = fresh.ids.peek();
        *self.write() = fresh;

        info!(
            path = %path.display(),
            items,
            ?next_id,
            tombstones = stats.tombstones,
            existed = stats.file_existed,
            "store loaded"
        );
        Ok(stats)
    }

    /// Rewrite the backing file with exactly the live items.
    ///
    /// Waits for every queued append first. The snapshot is queued on the
    /// same writer as the appends, so mutations made while it is written
    /// land after it in the file.
    pub async fn save(&self) -> StoreResult<()> {
        if self.read().log.is_none() {
            return Err(StoreError::NoBackingFile);
        }

        self.pending().wait_idle().await;

        let (ticket, records) = {
            let state = self.read();
            let log = state.log.as_ref().ok_or(StoreError::NoBackingFile)?;
            let lines = state
                .items
                .iter()
                .map(|item| Record::Set(item.clone()).to_line())
                .collect::<Result<Vec<_>, _>>()?;
            let records = lines.len();
            (log.begin_snapshot(lines)?, records)
        };
        ticket.wait().await?;

        info!(records, "store saved");
        Ok(())
    }

    /// Make `path` the backing file, then [`save`](Self::save).
    pub async fn save_as(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StoreError::MissingPath);
        }

        let log = TransactionLog::open(path, self.config().log.clone(), Arc::clone(self.pending()))?;
        self.write().log = Some(log);
        self.save().await
    }

    /// Wait until every queued log append has been written.
    pub async fn flush(&self) {
        self.pending().wait_idle().await;
    }
}
