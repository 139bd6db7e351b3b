use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use memsfcr_core::datalog::{log_header, read_log_records, DataLogger, RawRecord, ScenarioFile};
use memsfcr_core::ecu::{EcuError, EcuReader};
use memsfcr_core::poll::PollLoop;
use memsfcr_core::protocol::{
    EcuTransport, ProtocolError, SAMPLE_DATAFRAME_7D, SAMPLE_DATAFRAME_80,
};
use pretty_assertions::assert_eq;
use tokio::sync::Mutex;

/// Recorded frames with the RPM bytes of the 0x80 frame set to `rpm`
fn record(time: &str, rpm: u16) -> RawRecord {
    let mut d80 = SAMPLE_DATAFRAME_80;
    d80[2..4].copy_from_slice(&rpm.to_be_bytes());
    RawRecord::new(
        time,
        hex::encode_upper(SAMPLE_DATAFRAME_7D),
        hex::encode_upper(d80),
    )
}

fn write_scenario(dir: &Path, records: Vec<RawRecord>) -> std::path::PathBuf {
    let mut scenario = ScenarioFile::new("test.fcr");
    scenario.count = records.len();
    scenario.records = records;
    let path = dir.join("test.fcr");
    scenario.write(&path).unwrap();
    path
}

#[test]
fn test_reader_replays_scenario_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scenario(
        dir.path(),
        vec![
            record("09:00:00.000", 900),
            record("09:00:01.000", 1000),
            record("09:00:02.000", 1100),
        ],
    );

    let mut reader = EcuReader::new(EcuTransport::playback(&path));
    assert!(reader.connect().unwrap());
    assert_eq!(reader.status().ecu_id, "99000303");

    let rpm: Vec<i32> = (0..4)
        .map(|_| reader.read_dataframes().unwrap().sample.engine_rpm)
        .collect();
    assert_eq!(rpm, vec![900, 1000, 1100, 900]);
}

#[test]
fn test_playback_seek() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scenario(
        dir.path(),
        vec![
            record("09:00:00.000", 900),
            record("09:00:01.000", 1000),
            record("09:00:02.000", 1100),
        ],
    );

    let mut reader = EcuReader::new(EcuTransport::playback(&path));
    reader.connect().unwrap();

    let playbook = reader
        .transport_mut()
        .as_playback_mut()
        .and_then(|p| p.playbook_mut())
        .unwrap();
    playbook.move_to_position(2);

    assert_eq!(reader.read_dataframes().unwrap().sample.engine_rpm, 1100);
}

#[test]
fn test_failed_reconnect_clears_status() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scenario(dir.path(), vec![record("09:00:00.000", 900)]);

    let mut reader = EcuReader::new(EcuTransport::playback(&path));
    assert!(reader.connect().unwrap());
    assert_eq!(reader.status().ecu_id, "99000303");

    std::fs::remove_file(&path).unwrap();
    assert!(reader.connect().is_err());

    let status = reader.status();
    assert!(!status.connected);
    assert_eq!(status.ecu_id, "");
    assert_eq!(status.ecu_serial, "");
    assert_eq!(status.iac_position, 0);
    assert!(!reader.is_connected());
    assert!(matches!(
        reader.read_dataframes(),
        Err(EcuError::Protocol(ProtocolError::NotConnected))
    ));
}

#[test]
fn test_short_recorded_frame_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scenario(
        dir.path(),
        vec![RawRecord::new(
            "09:00:00.000",
            "7D20",
            hex::encode_upper(SAMPLE_DATAFRAME_80),
        )],
    );

    let mut reader = EcuReader::new(EcuTransport::playback(&path));
    reader.connect().unwrap();
    let err = reader.read_dataframes().unwrap_err();
    assert!(matches!(err, EcuError::Decode(_)));
    assert!(err.is_recoverable());
    assert!(reader.diagnostics().window().is_empty());
}

#[tokio::test]
async fn test_logged_session_converts_to_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let logger = DataLogger::create(&dir.path().join("logs"), "memsfcr")
        .await
        .unwrap();
    let log_path = logger.path().to_path_buf();
    assert!(log_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("memsfcr-"));

    let mut reader = EcuReader::new(EcuTransport::loopback());
    reader.connect().unwrap();
    let summary = PollLoop::new(Arc::new(Mutex::new(reader)), Duration::from_millis(5))
        .with_cycle_limit(3)
        .with_logger(logger)
        .run(|_| {})
        .await;
    assert_eq!(summary.logged, 3);

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.lines().next().unwrap(), log_header());

    let records = read_log_records(&log_path).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].dataframe_80, hex::encode_upper(SAMPLE_DATAFRAME_80));

    let scenario = ScenarioFile::from_log(&log_path).unwrap();
    assert_eq!(scenario.count, 3);
    assert!(scenario.name.ends_with(".fcr"));

    let fcr = dir.path().join(&scenario.name);
    scenario.write(&fcr).unwrap();
    let mut replay = EcuReader::new(EcuTransport::playback(&fcr));
    assert!(replay.connect().unwrap());
    assert_eq!(replay.read_dataframes().unwrap().sample.engine_rpm, 1189);
}

#[tokio::test]
async fn test_poll_skips_decode_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scenario(
        dir.path(),
        vec![
            record("09:00:00.000", 900),
            RawRecord::new("09:00:01.000", "7D", "80"),
        ],
    );

    let mut reader = EcuReader::new(EcuTransport::playback(&path));
    reader.connect().unwrap();

    let summary = PollLoop::new(Arc::new(Mutex::new(reader)), Duration::from_millis(5))
        .with_cycle_limit(4)
        .run(|_| {})
        .await;
    assert_eq!(summary.cycles, 4);
    assert_eq!(summary.readings, 2);
    assert_eq!(summary.decode_errors, 2);
    assert!(summary.terminal_error.is_none());
}
