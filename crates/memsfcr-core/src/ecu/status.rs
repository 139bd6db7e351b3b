//! Reader status and readings

use serde::{Deserialize, Serialize};

use crate::decoder::Sample;
use crate::diagnostics::AnalysisReport;

/// What the reader knows about the connected ECU
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcuStatus {
    /// Initialised and identified
    pub connected: bool,
    /// Upper-case hex of the 0xD0 response payload
    pub ecu_id: String,
    /// ASCII part number followed by the hex of the remaining bytes
    pub ecu_serial: String,
    /// IAC stepper position read at connect or after an adjustment
    pub iac_position: i32,
}

/// One decoded and analysed poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Decoded frames
    pub sample: Sample,
    /// Diagnosis of the sample
    pub report: AnalysisReport,
}

/// ECU ID from a 0xD0 response
pub(crate) fn parse_ecu_id(response: &[u8]) -> String {
    response.get(1..).map(hex::encode_upper).unwrap_or_default()
}

/// ECU serial from a 0xD1 response: 8 ASCII characters followed by a hex suffix
pub(crate) fn parse_ecu_serial(response: &[u8]) -> String {
    let text_end = response.len().min(9);
    let text = response
        .get(1..text_end)
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default();
    let suffix = response.get(9..).map(hex::encode_upper).unwrap_or_default();
    format!("{}{}", text, suffix)
}
