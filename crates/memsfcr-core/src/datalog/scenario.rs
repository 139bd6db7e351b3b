//! Scenario files
//!
//! A scenario (`.fcr`) is a JSON document holding a run of recorded dataframes along
//! with a description of where they came from.

use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{format::read_log_records, parse_timestamp, DatalogError, Playbook, RawRecord};

/// Scenario file extension
pub const SCENARIO_EXTENSION: &str = "fcr";

/// Recorded dataframes with a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// File name
    #[serde(rename = "Name")]
    pub name: String,
    /// Number of records
    #[serde(rename = "Count")]
    pub count: usize,
    /// When the recording started
    #[serde(rename = "Date", with = "scenario_date")]
    pub date: DateTime<FixedOffset>,
    /// Free text description
    #[serde(rename = "Summary")]
    pub summary: String,
    /// ECU the recording came from
    #[serde(rename = "ECUID", default)]
    pub ecu_id: String,
    /// Serial of that ECU
    #[serde(rename = "ECUSerial", default)]
    pub ecu_serial: String,
    /// Recorded dataframes, oldest first
    #[serde(rename = "MemsData", default)]
    pub records: Vec<RawRecord>,
}

impl ScenarioFile {
    /// Create an empty scenario dated now
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            date: Local::now().fixed_offset(),
            summary: String::new(),
            ecu_id: String::new(),
            ecu_serial: String::new(),
            records: Vec::new(),
        }
    }

    /// Load a scenario file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, DatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let scenario: ScenarioFile = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            name = %scenario.name,
            count = scenario.records.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    /// Save as pretty JSON
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), DatalogError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!(path = %path.display(), count = self.count, "scenario saved");
        Ok(())
    }

    /// Build a scenario from a CSV log
    pub fn from_log<P: AsRef<Path>>(path: P) -> Result<Self, DatalogError> {
        let path = path.as_ref();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let records = read_log_records(path)?;
        // rejects logs whose frames are not valid hex
        Playbook::from_records(&records)?;

        let mut scenario = Self::new(id.to_lowercase().replacen(".csv", ".fcr", 1));
        scenario.summary = format!("Scenario file created from {}", id);
        if let Some(date) = records
            .first()
            .and_then(|r| parse_timestamp(&r.time))
            .and_then(local_date)
        {
            scenario.date = date;
        }
        scenario.count = records.len();
        scenario.records = records;

        info!(from = %path.display(), name = %scenario.name, "converted log to scenario");
        Ok(scenario)
    }

    /// Playbook over the scenario's records
    pub fn playbook(&self) -> Result<Playbook, DatalogError> {
        Playbook::from_records(&self.records)
    }
}

/// Log times carry no offset and are taken as local
fn local_date(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|date| date.fixed_offset())
}

/// Parse a scenario date: RFC 3339, or a bare local date and time
pub(crate) fn parse_scenario_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .and_then(local_date)
}

mod scenario_date {
    use chrono::{DateTime, FixedOffset};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Write as RFC 3339
    pub fn serialize<S: Serializer>(
        date: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339())
    }

    /// Read RFC 3339, or a bare date and time taken as local
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_scenario_date(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid scenario date: {}", text)))
    }
}
