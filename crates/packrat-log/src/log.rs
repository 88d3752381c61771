use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use packrat_types::Record;

use crate::error::{LogError, Result};
use crate::pending::PendingWrites;

/// Flush/sync strategy for log appends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    OsDefault,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::OsDefault
    }
}

/// Configuration for a [`TransactionLog`].
#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    /// Sync strategy for appends. Snapshots are always synced.
    pub sync_mode: SyncMode,
}

enum Command {
    Append(String),
    Snapshot {
        lines: Vec<String>,
        done: oneshot::Sender<Result<()>>,
    },
}

/// Append-only transaction log bound to one backing file.
///
/// Commands are queued on an unbounded channel and executed in order by a
/// single writer task, so records land in the file in the order
/// [`append`](Self::append) was called. Dropping the log closes the queue;
/// the writer drains what is already queued and exits.
pub struct TransactionLog {
    path: PathBuf,
    sender: mpsc::UnboundedSender<Command>,
    pending: Arc<PendingWrites>,
}

impl TransactionLog {
    /// Bind a log to `path` and start its writer task.
    ///
    /// The file is created lazily by the first write. Must be called from
    /// inside a tokio runtime.
    pub fn open(path: &Path, config: LogConfig, pending: Arc<PendingWrites>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| LogError::NoRuntime)?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let writer = LogWriter {
            path: path.to_path_buf(),
            config,
            file: None,
            pending: Arc::clone(&pending),
        };
        runtime.spawn(writer.run(receiver));

        debug!(path = %path.display(), "transaction log opened");
        Ok(Self {
            path: path.to_path_buf(),
            sender,
            pending,
        })
    }

    /// Queue one record for appending.
    ///
    /// Never fails the caller: encoding or write failures are reported
    /// through `tracing` and the in-memory mutation stands.
    pub fn append(&self, record: &Record) {
        let line = match record.to_line() {
            Ok(line) => line,
            Err(e) => {
                error!(path = %self.path.display(), id = %record.id(), error = %e, "cannot encode log record");
                return;
            }
        };

        self.pending.register();
        if self.sender.send(Command::Append(line)).is_err() {
            self.pending.complete();
            error!(path = %self.path.display(), id = %record.id(), "log writer closed; record dropped");
        }
    }

    /// Queue a full rewrite of the backing file with `lines`.
    ///
    /// The snapshot runs after every append queued before it and before
    /// every append queued after it.
    pub fn begin_snapshot(&self, lines: Vec<String>) -> Result<SnapshotTicket> {
        let (done, receiver) = oneshot::channel();
        self.sender
            .send(Command::Snapshot { lines, done })
            .map_err(|_| LogError::WriterClosed(self.path.clone()))?;
        Ok(SnapshotTicket {
            path: self.path.clone(),
            receiver,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for TransactionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLog")
            .field("path", &self.path)
            .field("pending", &self.pending.outstanding())
            .finish()
    }
}

/// Completion handle for a queued snapshot.
#[must_use = "a snapshot is only known to be durable once the ticket resolves"]
pub struct SnapshotTicket {
    path: PathBuf,
    receiver: oneshot::Receiver<Result<()>>,
}

impl SnapshotTicket {
    pub async fn wait(self) -> Result<()> {
        self.receiver
            .await
            .map_err(|_| LogError::WriterClosed(self.path))?
    }
}

/// Writer task state. Owns the append handle for the backing file.
struct LogWriter {
    path: PathBuf,
    config: LogConfig,
    file: Option<File>,
    pending: Arc<PendingWrites>,
}

impl LogWriter {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = receiver.recv().await {
            match command {
                Command::Append(line) => {
                    if let Err(e) = self.append(&line).await {
                        error!(path = %self.path.display(), error = %e, "transaction log append failed");
                        self.file = None;
                    }
                    self.pending.complete();
                }
                Command::Snapshot { lines, done } => {
                    let result = self.snapshot(&lines).await;
                    if let Err(e) = &result {
                        warn!(path = %self.path.display(), error = %e, "snapshot failed");
                    }
                    // The saver may have given up waiting; nothing to report to.
                    let _ = done.send(result);
                }
            }
        }
        debug!(path = %self.path.display(), "transaction log writer stopped");
    }

    async fn handle(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                ensure_parent(&self.path).await?;
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .await?
            }
        };
        Ok(self.file.insert(file))
    }

    async fn append(&mut self, line: &str) -> io::Result<()> {
        let sync = matches!(self.config.sync_mode, SyncMode::EveryWrite);
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let file = self.handle().await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        if sync {
            file.sync_data().await?;
        }

        debug!(path = %self.path.display(), len = buf.len(), "log append");
        Ok(())
    }

    async fn snapshot(&mut self, lines: &[String]) -> Result<()> {
        let tmp_path = temp_path(&self.path);
        let mut contents = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }

        ensure_parent(&self.path).await?;
        let mut tmp = File::create(&tmp_path).await?;
        tmp.write_all(contents.as_bytes()).await?;
        tmp.flush().await?;
        tmp.sync_all().await?;
        drop(tmp);

        // Close the append handle so the next append opens the new file.
        self.file = None;
        fs::rename(&tmp_path, &self.path).await?;

        info!(path = %self.path.display(), records = lines.len(), "snapshot written");
        Ok(())
    }
}

async fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

/// `<file>.tmp` next to the backing file, so the rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("packrat"));
    name.push(".tmp");
    path.with_file_name(name)
}
