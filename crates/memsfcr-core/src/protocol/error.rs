//! Protocol errors

use thiserror::Error;

/// Errors that can occur while exchanging commands with the ECU
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Command sent before connecting
    #[error("Not connected to ECU")]
    NotConnected,

    /// ECU did not complete initialisation
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// No command byte to send
    #[error("Empty command")]
    EmptyCommand,

    /// Fewer bytes than expected arrived before the read timeout
    #[error("Read timeout: received {} of {expected} bytes", .received.len())]
    Timeout {
        /// Number of bytes the command should have produced
        expected: usize,
        /// Whatever arrived before the read gave up
        received: Vec<u8>,
    },

    /// More bytes than expected arrived
    #[error("Response size mismatch: received {received} bytes, expected {expected}")]
    SizeMismatch {
        /// Size the command should produce
        expected: usize,
        /// Bytes read
        received: usize,
        /// All bytes read, nothing is discarded
        response: Vec<u8>,
    },

    /// Response does not start with the command byte
    #[error("Expecting command echo {expected:#04x}, received {actual:#04x}")]
    EchoMismatch {
        /// Command sent
        expected: u8,
        /// First byte of the response
        actual: u8,
        /// Complete response
        response: Vec<u8>,
    },

    /// Scenario file could not be loaded for playback
    #[error("Scenario error: {0}")]
    ScenarioError(String),

    /// Channel read or write failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the poll loop may carry on and retry on its next cycle
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProtocolError::Timeout { .. }
                | ProtocolError::SizeMismatch { .. }
                | ProtocolError::EchoMismatch { .. }
        )
    }

    /// Best-effort response bytes attached to a recoverable read error
    pub fn partial_response(&self) -> Option<&[u8]> {
        match self {
            ProtocolError::Timeout { received, .. } => Some(received),
            ProtocolError::SizeMismatch { response, .. }
            | ProtocolError::EchoMismatch { response, .. } => Some(response),
            _ => None,
        }
    }
}
