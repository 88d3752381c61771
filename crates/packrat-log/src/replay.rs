use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use packrat_types::Record;

use crate::error::{LogError, Result};

/// Counters from one replay pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// `false` when the file did not exist; nothing was replayed.
    pub file_existed: bool,
    /// Item records applied.
    pub items: usize,
    /// Tombstones applied.
    pub tombstones: usize,
}

impl ReplayStats {
    pub fn records(&self) -> usize {
        self.items + self.tombstones
    }
}

/// Read `path` front-to-back and hand every record to `apply`, in file order.
///
/// A missing file replays nothing and is not an error. Blank lines are
/// skipped. The first undecodable line stops the replay with
/// [`LogError::CorruptRecord`]; records before it have already been applied,
/// so callers should replay into scratch state and discard it on error.
pub async fn replay<F>(path: &Path, mut apply: F) -> Result<ReplayStats>
where
    F: FnMut(Record),
{
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no log file; nothing to replay");
            return Ok(ReplayStats::default());
        }
        Err(e) => return Err(e.into()),
    };

    let mut stats = ReplayStats {
        file_existed: true,
        ..ReplayStats::default()
    };
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let record = Record::from_line(&line).map_err(|e| LogError::CorruptRecord {
            path: path.to_path_buf(),
            line: line_no,
            reason: e.to_string(),
        })?;
        if record.is_tombstone() {
            stats.tombstones += 1;
        } else {
            stats.items += 1;
        }
        apply(record);
    }

    debug!(
        path = %path.display(),
        items = stats.items,
        tombstones = stats.tombstones,
        "replay complete"
    );
    Ok(stats)
}
