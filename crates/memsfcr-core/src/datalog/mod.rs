//! Data Logging
//!
//! Records readings to CSV logs and loads logs and scenario files back for playback.

mod format;
mod playback;
mod recorder;
mod scenario;

pub use format::{
    format_row, log_header, read_log_records, RAW_7D_COLUMN, RAW_80_COLUMN, TIME_COLUMN,
};
pub use playback::{parse_timestamp, PlaybackRecord, Playbook};
pub use recorder::{log_filename, DataLogger};
pub use scenario::{ScenarioFile, SCENARIO_EXTENSION};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from reading or writing logs and scenarios
#[derive(Error, Debug)]
pub enum DatalogError {
    /// File access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed scenario
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required CSV column is absent
    #[error("Log has no '{0}' column")]
    MissingColumn(String),

    /// A recorded frame is not valid hex
    #[error("Invalid dataframe hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// No records to play
    #[error("Playbook is empty")]
    Empty,

    /// The writer task has stopped
    #[error("Logger has been closed")]
    Closed,
}

/// One logged poll: time and both raw dataframes as hex
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Time of the poll as logged
    #[serde(rename = "Time")]
    pub time: String,
    /// 0x7D frame
    #[serde(rename = "Dataframe7d")]
    pub dataframe_7d: String,
    /// 0x80 frame
    #[serde(rename = "Dataframe80")]
    pub dataframe_80: String,
}

impl RawRecord {
    /// Create a record
    pub fn new(
        time: impl Into<String>,
        dataframe_7d: impl Into<String>,
        dataframe_80: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            dataframe_7d: dataframe_7d.into(),
            dataframe_80: dataframe_80.into(),
        }
    }
}
