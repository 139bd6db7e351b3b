//! Scenario replay
//!
//! Serves dataframes recorded in a CSV log or `.fcr` scenario as if they came from a
//! live ECU. Every other command is answered from the response table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::{ProtocolError, ResponseTable, Transport};
use crate::datalog::{read_log_records, Playbook, ScenarioFile, SCENARIO_EXTENSION};
use crate::decoder::{DATAFRAME_7D_SIZE, DATAFRAME_80_SIZE};

const DATAFRAME_7D: u8 = 0x7d;
const DATAFRAME_80: u8 = 0x80;

/// Transport that replays a recorded scenario
pub struct PlaybackTransport {
    path: PathBuf,
    responses: Arc<ResponseTable>,
    playbook: Option<Playbook>,
}

impl PlaybackTransport {
    /// Replay `path` once connected
    pub fn new(path: PathBuf, responses: Arc<ResponseTable>) -> Self {
        Self {
            path,
            responses,
            playbook: None,
        }
    }

    /// File being replayed
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loaded playbook, once connected
    pub fn playbook(&self) -> Option<&Playbook> {
        self.playbook.as_ref()
    }

    /// Loaded playbook for seeking
    pub fn playbook_mut(&mut self) -> Option<&mut Playbook> {
        self.playbook.as_mut()
    }

    fn load(&self) -> Result<Playbook, ProtocolError> {
        let is_scenario = self
            .path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(SCENARIO_EXTENSION))
            .unwrap_or(false);

        let loaded = if is_scenario {
            ScenarioFile::read(&self.path).and_then(|scenario| scenario.playbook())
        } else {
            read_log_records(&self.path).and_then(|records| Playbook::from_records(&records))
        };

        loaded.map_err(|e| {
            ProtocolError::ScenarioError(format!("{}: {}", self.path.display(), e))
        })
    }
}

fn truncate(mut frame: Vec<u8>, size: usize) -> Vec<u8> {
    frame.truncate(size);
    frame
}

impl Transport for PlaybackTransport {
    fn connect(&mut self) -> Result<bool, ProtocolError> {
        self.playbook = None;
        let playbook = self.load()?;
        if playbook.is_empty() {
            return Err(ProtocolError::ScenarioError(format!(
                "{}: no records",
                self.path.display()
            )));
        }

        info!(
            path = %self.path.display(),
            count = playbook.len(),
            "scenario loaded for playback"
        );
        self.playbook = Some(playbook);
        Ok(true)
    }

    fn send_and_receive(&mut self, command: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let playbook = self.playbook.as_mut().ok_or(ProtocolError::NotConnected)?;
        let code = command.first().copied().ok_or(ProtocolError::EmptyCommand)?;

        let response = match code {
            DATAFRAME_7D => playbook
                .next_frame(code)
                .map(|frame| truncate(frame, DATAFRAME_7D_SIZE)),
            DATAFRAME_80 => playbook
                .next_frame(code)
                .map(|frame| truncate(frame, DATAFRAME_80_SIZE)),
            _ => None,
        }
        .unwrap_or_else(|| self.responses.respond(code));

        debug!(
            command = %format!("{:02X}", code),
            position = playbook.position(),
            "playback response"
        );
        Ok(response)
    }

    fn disconnect(&mut self) -> Result<(), ProtocolError> {
        if self.playbook.take().is_some() {
            info!(path = %self.path.display(), "playback stopped");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.playbook.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SAMPLE_DATAFRAME_7D, SAMPLE_DATAFRAME_80};

    fn write_log(dir: &Path, rows: usize) -> PathBuf {
        let path = dir.join("drive.csv");
        let mut content = String::from("#time,0x7d_raw,0x80_raw\n");
        for i in 0..rows {
            // padded frames are longer than the wire size
            content.push_str(&format!(
                "12:00:{:02}.000,{}00,{}00\n",
                i,
                hex::encode_upper(SAMPLE_DATAFRAME_7D),
                hex::encode_upper(SAMPLE_DATAFRAME_80)
            ));
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_serves_truncated_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), 2);
        let mut transport = PlaybackTransport::new(path, ResponseTable::shared());

        assert!(matches!(
            transport.send_and_receive(&[0x80]),
            Err(ProtocolError::NotConnected)
        ));
        assert!(transport.connect().unwrap());

        assert_eq!(transport.send_and_receive(&[0x80]).unwrap(), SAMPLE_DATAFRAME_80);
        assert_eq!(transport.send_and_receive(&[0x7d]).unwrap(), SAMPLE_DATAFRAME_7D);
        assert_eq!(transport.playbook().map(|p| p.position()), Some(1));

        assert_eq!(
            transport.send_and_receive(&[0xd0]).unwrap(),
            vec![0xd0, 0x99, 0x00, 0x03, 0x03]
        );
    }

    #[test]
    fn test_empty_log_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), 0);
        let mut transport = PlaybackTransport::new(path, ResponseTable::shared());
        assert!(matches!(
            transport.connect(),
            Err(ProtocolError::ScenarioError(_))
        ));
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_missing_file_fails() {
        let mut transport =
            PlaybackTransport::new(PathBuf::from("/nonexistent/run.fcr"), ResponseTable::shared());
        assert!(matches!(
            transport.connect(),
            Err(ProtocolError::ScenarioError(_))
        ));
    }
}
