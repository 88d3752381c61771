use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counter of queued-but-unwritten log appends with an idle signal.
///
/// Shared by a store and every log writer it has opened, so waiting for
/// idle also covers appends still draining to a previous backing file.
#[derive(Debug, Default)]
pub struct PendingWrites {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one newly queued append.
    pub fn register(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Record one finished append, successful or not.
    pub fn complete(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "completed more appends than registered");
        if previous == 1 {
            self.idle.notify_waiters();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Resolve once every append registered so far has completed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register interest before checking so a completion between the
            // check and the await is not lost.
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}
