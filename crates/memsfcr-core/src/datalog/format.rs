//! Log file format
//!
//! One header line followed by one row per reading. Readers locate the time and raw
//! dataframe columns by name, so logs with extra or reordered columns still load.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use super::{DatalogError, RawRecord};
use crate::diagnostics::Metric;
use crate::ecu::Reading;

/// Time of day column
pub const TIME_COLUMN: &str = "#time";
/// Raw 0x7D dataframe column
pub const RAW_7D_COLUMN: &str = "0x7d_raw";
/// Raw 0x80 dataframe column
pub const RAW_80_COLUMN: &str = "0x80_raw";

const SWITCH_COLUMNS: [&str; 5] = [
    "idle_switch",
    "aircon_switch",
    "park_neutral_switch",
    "ignition_switch",
    "closed_loop",
];

const DTC_COLUMNS: [&str; 6] = ["dtc0", "dtc1", "dtc2", "dtc3", "dtc4", "dtc5"];

/// Header line of a log file, without the line terminator
pub fn log_header() -> String {
    let report = crate::diagnostics::AnalysisReport::default();

    let mut columns: Vec<&str> = vec![TIME_COLUMN];
    columns.extend(Metric::ALL.iter().map(Metric::name));
    columns.extend(SWITCH_COLUMNS);
    columns.extend(DTC_COLUMNS);
    columns.push(RAW_7D_COLUMN);
    columns.push(RAW_80_COLUMN);
    columns.extend(report.status_flags().iter().map(|(name, _)| *name));
    columns.extend(report.fault_flags().iter().map(|(name, _)| *name));

    columns.join(",")
}

/// One log row for a reading, without the line terminator
pub fn format_row(reading: &Reading) -> String {
    let sample = &reading.sample;
    let report = &reading.report;

    let mut fields = vec![sample.time_of_day()];

    for metric in Metric::ALL {
        let value = metric.value(sample);
        if metric.is_fractional() {
            fields.push(format!("{:.2}", value));
        } else {
            fields.push(format!("{}", value as i64));
        }
    }

    for switch in [
        sample.idle_switch,
        sample.aircon_switch,
        sample.park_neutral_switch,
        sample.ignition_switch,
        sample.closed_loop,
    ] {
        fields.push(switch.to_string());
    }

    for dtc in [
        sample.dtc0,
        sample.dtc1,
        sample.dtc2,
        sample.dtc3,
        sample.dtc4,
        sample.dtc5,
    ] {
        fields.push(dtc.to_string());
    }

    fields.push(sample.dataframe_7d.to_uppercase());
    fields.push(sample.dataframe_80.to_uppercase());

    for (_, flag) in report.status_flags().iter().chain(report.fault_flags().iter()) {
        fields.push(flag.to_string());
    }

    fields.join(",")
}

fn column_index(header: &[&str], name: &str) -> Result<usize, DatalogError> {
    header
        .iter()
        .position(|column| column.trim() == name)
        .ok_or_else(|| DatalogError::MissingColumn(name.to_string()))
}

/// Read the time and raw dataframes of every row in a CSV log
pub fn read_log_records<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>, DatalogError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header_line = match lines.next() {
        Some(line) => line?,
        None => return Ok(Vec::new()),
    };
    let header: Vec<&str> = header_line.split(',').collect();
    let time_idx = column_index(&header, TIME_COLUMN)?;
    let raw_7d_idx = column_index(&header, RAW_7D_COLUMN)?;
    let raw_80_idx = column_index(&header, RAW_80_COLUMN)?;

    let mut records = Vec::new();
    for (row, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        match (
            fields.get(time_idx),
            fields.get(raw_7d_idx),
            fields.get(raw_80_idx),
        ) {
            (Some(time), Some(raw_7d), Some(raw_80)) => {
                records.push(RawRecord::new(time.trim(), raw_7d.trim(), raw_80.trim()));
            }
            _ => warn!(row = row + 2, "skipping short log row"),
        }
    }

    info!(path = %path.display(), count = records.len(), "log loaded");
    Ok(records)
}
