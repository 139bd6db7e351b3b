//! Log playback
//!
//! A [`Playbook`] replays recorded dataframes in order. Each record is served once for
//! 0x7D and once for 0x80; after both the position moves on, wrapping at the end.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};

use super::{DatalogError, RawRecord};

const DATAFRAME_7D: u8 = 0x7d;
const DATAFRAME_80: u8 = 0x80;

/// One recorded pair of dataframes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRecord {
    /// Recorded time, 1970-01-01 when only a time of day was logged
    pub timestamp: NaiveDateTime,
    /// 0x7D frame bytes
    pub dataframe_7d: Vec<u8>,
    /// 0x80 frame bytes
    pub dataframe_80: Vec<u8>,
}

impl PlaybackRecord {
    fn from_raw(raw: &RawRecord) -> Result<Self, DatalogError> {
        let timestamp = parse_timestamp(&raw.time).unwrap_or_else(|| {
            warn!(time = %raw.time, "unable to parse timestamp, defaulting to current time");
            Local::now().naive_local()
        });

        Ok(Self {
            timestamp,
            dataframe_7d: hex::decode(raw.dataframe_7d.trim())?,
            dataframe_80: hex::decode(raw.dataframe_80.trim())?,
        })
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Parse a logged timestamp.
///
/// Accepts a full date and time, a time of day with or without milliseconds, or
/// minutes and seconds (`MM:SS.f`). Times without a date fall on 1970-01-01.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(ts) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.3f") {
        return Some(ts);
    }

    for format in ["%H:%M:%S%.3f", "%H:%M:%S"] {
        if let Ok(time) = NaiveTime::parse_from_str(text, format) {
            return Some(epoch_date().and_time(time));
        }
    }

    let (minutes, seconds) = text.split_once(':')?;
    if minutes.contains(':') {
        return None;
    }
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    let whole = seconds.trunc() as u32;
    let millis = ((seconds - seconds.trunc()) * 1000.0).round() as u32;
    let time = NaiveTime::from_hms_milli_opt(0, minutes, whole, millis.min(999))?;
    Some(epoch_date().and_time(time))
}

/// Ordered dataframes replayed from a log or scenario
#[derive(Debug, Clone, Default)]
pub struct Playbook {
    records: Vec<PlaybackRecord>,
    position: usize,
    served_7d: bool,
    served_80: bool,
}

impl Playbook {
    /// Create a playbook from parsed records
    pub fn new(records: Vec<PlaybackRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Parse raw log records into a playbook
    pub fn from_records(raw: &[RawRecord]) -> Result<Self, DatalogError> {
        let records = raw
            .iter()
            .map(PlaybackRecord::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = records.len(), "playbook loaded");
        Ok(Self::new(records))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there is nothing to play
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the record the next dataframe is served from
    pub fn position(&self) -> usize {
        self.position
    }

    /// All records in play order
    pub fn records(&self) -> &[PlaybackRecord] {
        &self.records
    }

    /// Serve the next 0x7D or 0x80 dataframe. Returns `None` for other commands or
    /// when there is nothing to play.
    pub fn next_frame(&mut self, command: u8) -> Option<Vec<u8>> {
        let record = self.records.get(self.position)?;

        let frame = match command {
            DATAFRAME_7D => {
                self.served_7d = true;
                record.dataframe_7d.clone()
            }
            DATAFRAME_80 => {
                self.served_80 = true;
                record.dataframe_80.clone()
            }
            _ => return None,
        };

        if self.served_7d && self.served_80 {
            self.served_7d = false;
            self.served_80 = false;
            self.position += 1;
            debug!(position = self.position, count = self.len(), "both dataframes served");

            if self.position >= self.len() {
                self.position = 0;
                info!("reached end of playback, restarting from beginning");
            }
        }

        Some(frame)
    }

    /// Move to a record index. Negative positions clamp to 0 and positions past the
    /// end are ignored.
    pub fn move_to_position(&mut self, position: i64) {
        let position = usize::try_from(position.max(0)).unwrap_or(0);
        if position < self.len() {
            debug!(from = self.position, to = position, "moving playback position");
            self.position = position;
        }
    }

    /// Move to the record before the first one recorded after `time`. The position is
    /// unchanged when no record is later.
    pub fn move_to_time(&mut self, time: NaiveDateTime) {
        if let Some(index) = self.records.iter().position(|r| time < r.timestamp) {
            let position = index.saturating_sub(1);
            debug!(from = self.position, to = position, "moving playback to time");
            self.position = position;
        }
    }

    /// First record
    pub fn first(&self) -> Result<&PlaybackRecord, DatalogError> {
        self.records.first().ok_or(DatalogError::Empty)
    }

    /// Last record
    pub fn last(&self) -> Result<&PlaybackRecord, DatalogError> {
        self.records.last().ok_or(DatalogError::Empty)
    }

    /// Record the next dataframe comes from
    pub fn current(&self) -> Result<&PlaybackRecord, DatalogError> {
        self.records.get(self.position).ok_or(DatalogError::Empty)
    }
}
