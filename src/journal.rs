//! Append-only echo journal.
//!
//! Every successful request appends one pretty-printed JSON record followed
//! by a newline. The file is a concatenation of JSON objects, not a JSON
//! array. The file is opened and closed per append; a mutex keeps records
//! from concurrent connections whole. A failed write is truncated away so a
//! partial record never precedes later ones.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{trace, warn};

/// Shared handle to the echo log file
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Journal {
    /// Create a journal writing to `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Journal {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one serialized record and a trailing newline.
    pub async fn append(&self, json: &str) -> io::Result<()> {
        let mut line = String::with_capacity(json.len() + 1);
        line.push_str(json);
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let start = file.metadata().await?.len();

        let written = write_line(&mut file, line.as_bytes()).await;
        truncate_on_error(&file, start, written).await?;

        trace!(path = %self.path.display(), bytes = line.len(), "Appended record");
        Ok(())
    }
}

async fn write_line(file: &mut File, line: &[u8]) -> io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

/// Cut the file back to `len` when the write failed, returning the write error.
async fn truncate_on_error(file: &File, len: u64, result: io::Result<()>) -> io::Result<()> {
    if let Err(e) = result {
        if let Err(truncate_err) = file.set_len(len).await {
            warn!(error = %truncate_err, len, "Failed to roll back partial record");
        }
        return Err(e);
    }
    Ok(())
}
