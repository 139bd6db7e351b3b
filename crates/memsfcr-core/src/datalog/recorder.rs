//! Data logger / recorder
//!
//! Writes readings to a CSV log from a background task so the poll loop never waits
//! on the disk.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{format_row, log_header, DatalogError};
use crate::ecu::Reading;

/// Rows buffered between the poll loop and the writer task
const LOG_CHANNEL_CAPACITY: usize = 256;

/// Log file path for a session started now: `<folder>/<prefix>-YYYY-MM-DD-HHMM00.csv`
pub fn log_filename(folder: &Path, prefix: &str) -> PathBuf {
    filename_at(folder, prefix, Local::now().naive_local())
}

fn filename_at(folder: &Path, prefix: &str, time: NaiveDateTime) -> PathBuf {
    folder.join(format!("{}-{}.csv", prefix, time.format("%Y-%m-%d-%H%M00")))
}

/// Fire-and-forget CSV writer
pub struct DataLogger {
    path: PathBuf,
    sender: Option<mpsc::Sender<String>>,
    task: Option<JoinHandle<Result<usize, DatalogError>>>,
    dropped: usize,
}

impl DataLogger {
    /// Start a new log in `folder`, creating the folder if needed
    pub async fn create(folder: &Path, prefix: &str) -> Result<Self, DatalogError> {
        fs::create_dir_all(folder).await?;
        Self::open(log_filename(folder, prefix)).await
    }

    /// Start a log at an explicit path, replacing any existing file
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DatalogError> {
        let path = path.into();
        let file = File::create(&path).await.map_err(|e| {
            error!(path = %path.display(), "unable to create log file: {}", e);
            e
        })?;

        let mut writer = BufWriter::new(file);
        writer.write_all(log_header().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let (sender, receiver) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let task = tokio::spawn(write_rows(writer, receiver));

        info!(path = %path.display(), "logging started");
        Ok(Self {
            path,
            sender: Some(sender),
            task: Some(task),
            dropped: 0,
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows discarded because the writer fell behind
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Queue a reading. Never waits; returns false if the row was not queued.
    pub fn log(&mut self, reading: &Reading) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(format_row(reading)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                warn!(dropped = self.dropped, "log writer behind, row dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(path = %self.path.display(), "log writer has stopped");
                self.sender = None;
                false
            }
        }
    }

    /// Write out every queued row and close the file. Returns the number of rows written.
    pub async fn close(mut self) -> Result<usize, DatalogError> {
        self.sender = None;
        let Some(task) = self.task.take() else {
            return Err(DatalogError::Closed);
        };

        let rows = task
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))??;
        info!(path = %self.path.display(), rows, "logging stopped");
        Ok(rows)
    }
}

async fn write_rows(
    mut writer: BufWriter<File>,
    mut receiver: mpsc::Receiver<String>,
) -> Result<usize, DatalogError> {
    let mut rows = 0;
    while let Some(row) = receiver.recv().await {
        writer.write_all(row.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        rows += 1;
    }
    writer.flush().await?;
    debug!(rows, "log writer finished");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_filename() {
        let time = NaiveDate::from_ymd_opt(2021, 4, 5)
            .and_then(|d| d.and_hms_opt(10, 11, 42))
            .unwrap();
        let path = filename_at(Path::new("/tmp/logs"), "memsfcr", time);
        assert_eq!(path, PathBuf::from("/tmp/logs/memsfcr-2021-04-05-101100.csv"));
    }
}
